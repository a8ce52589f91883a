// realtime/events.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::chatmodels::MessageView;

/// Frames a socket client may send: `{"event": "joinRoom", "data": "<room id>"}`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    JoinRoom(String),
    LeaveRoom(String),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    #[serde(rename_all = "camelCase")]
    ConnectionConfirmed {
        message: String,
        socket_id: Uuid,
        room_id: String,
    },
    Error {
        message: String,
    },
    NewMessage(MessageView),
}
