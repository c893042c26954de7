use serde::{Deserialize, Serialize};
use std::fmt;

/// A reference to one grid cell.
///
/// Locks are keyed by the full reference, so the same row/col on two sheets
/// are two different cells. An absent sheet name addresses the default sheet.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet_name: Option<String>,
}

impl CellRef {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col, sheet_name: None }
    }

    pub fn on_sheet(sheet_name: &str, row: u32, col: u32) -> Self {
        Self {
            row,
            col,
            sheet_name: Some(sheet_name.to_string()),
        }
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sheet_name {
            Some(sheet) => write!(f, "{}!{}_{}", sheet, self.row, self.col),
            None => write!(f, "{}_{}", self.row, self.col),
        }
    }
}
