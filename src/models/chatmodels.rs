// models/chatmodels.rs
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::usermodel::ParticipantSummary;

const ROOM_DELIMITER: &str = "--";

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    #[serde(rename = "timestamp")]
    pub sent_at: DateTime<Utc>,
}

impl Message {
    pub fn room(&self) -> RoomId {
        RoomId::for_pair(self.sender_id, self.receiver_id)
    }
}

/// A message together with both participants, as returned over REST and
/// pushed to the conversation room.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    #[serde(flatten)]
    pub message: Message,
    pub sender: ParticipantSummary,
    pub receiver: ParticipantSummary,
}

/// Realtime room key: both participant ids, sorted, joined by `--`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomId(String);

impl RoomId {
    pub fn for_pair(a: Uuid, b: Uuid) -> Self {
        let (a, b) = (a.to_string(), b.to_string());
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        RoomId(format!("{low}{ROOM_DELIMITER}{high}"))
    }

    /// Accepts any non-empty key. Keys that do not encode a participant pair
    /// are still valid rooms, they just never match a conversation.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        Some(RoomId(raw.to_string()))
    }

    /// The two participant ids encoded in the key, if it is a pair key.
    pub fn participants(&self) -> Option<(Uuid, Uuid)> {
        let (a, b) = self.0.split_once(ROOM_DELIMITER)?;
        let a = Uuid::parse_str(a).ok()?;
        let b = Uuid::parse_str(b).ok()?;
        Some((a, b))
    }

    pub fn includes(&self, user_id: Uuid) -> bool {
        self.participants()
            .map_or(false, |(a, b)| a == user_id || b == user_id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
