use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Buffered grid content of a document: sheet -> row -> col -> value.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct GridContent {
    sheets: BTreeMap<String, BTreeMap<u32, BTreeMap<u32, Value>>>,
}

impl GridContent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last writer wins, no version check.
    pub fn set_cell(&mut self, sheet_name: &str, row: u32, col: u32, value: Value) {
        self.sheets
            .entry(sheet_name.to_string())
            .or_default()
            .entry(row)
            .or_default()
            .insert(col, value);
    }

    pub fn get_cell(&self, sheet_name: &str, row: u32, col: u32) -> Option<&Value> {
        self.sheets.get(sheet_name)?.get(&row)?.get(&col)
    }

    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.keys().map(String::as_str)
    }

    pub fn cell_count(&self) -> usize {
        self.sheets
            .values()
            .flat_map(|rows| rows.values())
            .map(|cols| cols.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cell_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn later_write_overwrites_earlier_one() {
        let mut grid = GridContent::new();
        grid.set_cell("Sheet1", 2, 3, json!("41"));
        grid.set_cell("Sheet1", 2, 3, json!("42"));

        assert_eq!(grid.get_cell("Sheet1", 2, 3), Some(&json!("42")));
        assert_eq!(grid.cell_count(), 1);
    }

    #[test]
    fn sheets_are_independent() {
        let mut grid = GridContent::new();
        grid.set_cell("Sheet1", 0, 0, json!(1));
        grid.set_cell("Sheet2", 0, 0, json!(2));

        assert_eq!(grid.get_cell("Sheet1", 0, 0), Some(&json!(1)));
        assert_eq!(grid.get_cell("Sheet2", 0, 0), Some(&json!(2)));
        assert_eq!(grid.sheet_names().collect::<Vec<_>>(), vec!["Sheet1", "Sheet2"]);
    }

    #[test]
    fn parses_snapshot_with_string_keys() {
        let grid: GridContent =
            serde_json::from_value(json!({ "Sheet1": { "0": { "1": "a", "2": 3 } } })).unwrap();

        assert_eq!(grid.get_cell("Sheet1", 0, 1), Some(&json!("a")));
        assert_eq!(grid.get_cell("Sheet1", 0, 2), Some(&json!(3)));
        assert!(grid.get_cell("Sheet1", 1, 1).is_none());
    }
}
