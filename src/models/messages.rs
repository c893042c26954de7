use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use crate::models::{CellRef, GridContent};

/// Editor id -> display name, as broadcast to the room.
pub type EditorsMap = BTreeMap<String, String>;

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct JoinMessage {
    pub document_id: String,
    pub editor_id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub share_token: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LeaveMessage {
    pub document_id: String,
    pub editor_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LockCellMessage {
    pub document_id: String,
    pub editor_id: String,
    pub cell: CellRef,
    #[serde(default)]
    pub share_token: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UnlockCellMessage {
    pub document_id: String,
    pub editor_id: String,
    pub cell: CellRef,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CellUpdateMessage {
    pub document_id: String,
    pub editor_id: String,
    pub sheet_name: String,
    pub row: u32,
    pub col: u32,
    pub value: Value,
    #[serde(default)]
    pub share_token: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SwitchSheetMessage {
    pub document_id: String,
    pub editor_id: String,
    pub sheet_name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequestMessage {
    pub document_id: String,
    pub editor_id: String,
    #[serde(default)]
    pub share_token: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct PingMessage {
    #[serde(default)]
    pub editor_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReceivedMessage {
    Join(JoinMessage),
    Leave(LeaveMessage),
    LockCell(LockCellMessage),
    UnlockCell(UnlockCellMessage),
    CellUpdate(CellUpdateMessage),
    SwitchSheet(SwitchSheetMessage),
    SaveRequest(SaveRequestMessage),
    Ping(PingMessage),
}

impl ReceivedMessage {
    /// The document a message targets, if any.
    pub fn document_id(&self) -> Option<&str> {
        match self {
            ReceivedMessage::Join(m) => Some(&m.document_id),
            ReceivedMessage::Leave(m) => Some(&m.document_id),
            ReceivedMessage::LockCell(m) => Some(&m.document_id),
            ReceivedMessage::UnlockCell(m) => Some(&m.document_id),
            ReceivedMessage::CellUpdate(m) => Some(&m.document_id),
            ReceivedMessage::SwitchSheet(m) => Some(&m.document_id),
            ReceivedMessage::SaveRequest(m) => Some(&m.document_id),
            ReceivedMessage::Ping(_) => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EditorInfo {
    pub editor_id: String,
    pub username: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserJoinedMessage {
    pub document_id: String,
    pub editor_id: String,
    pub username: String,
    pub editors: EditorsMap,
    pub can_write: bool,
    pub current_user: EditorInfo,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserLeftMessage {
    pub document_id: String,
    pub editor_id: String,
    pub username: String,
    pub editors: EditorsMap,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CellLockedMessage {
    pub document_id: String,
    pub cell: CellRef,
    pub editor_id: String,
    pub username: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LockRejectedMessage {
    pub document_id: String,
    pub cell: CellRef,
    pub holder_username: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CellUnlockedMessage {
    pub document_id: String,
    pub cell: CellRef,
    pub editor_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CellUpdatedMessage {
    pub document_id: String,
    pub sheet_name: String,
    pub row: u32,
    pub col: u32,
    pub value: Value,
    pub editor_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SheetSwitchedMessage {
    pub document_id: String,
    pub sheet_name: String,
    pub editor_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SaveNotificationMessage {
    pub document_id: String,
    pub editor_id: String,
    pub username: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SaveSuccessMessage {
    pub document_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncDataMessage {
    pub document_id: String,
    pub content: GridContent,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PongMessage {
    pub date: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SendMessage {
    UserJoined(UserJoinedMessage),
    UserLeft(UserLeftMessage),
    CellLocked(CellLockedMessage),
    LockRejected(LockRejectedMessage),
    CellUnlocked(CellUnlockedMessage),
    CellUpdated(CellUpdatedMessage),
    SheetSwitched(SheetSwitchedMessage),
    SaveNotification(SaveNotificationMessage),
    SaveSuccess(SaveSuccessMessage),
    SyncData(SyncDataMessage),
    Pong(PongMessage),
    Error(ErrorMessage),
}

impl SendMessage {
    pub fn error(document_id: Option<&str>, message: impl Into<String>) -> Self {
        SendMessage::Error(ErrorMessage {
            document_id: document_id.map(str::to_string),
            message: message.into(),
        })
    }
}
