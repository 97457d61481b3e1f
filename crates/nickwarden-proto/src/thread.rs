//! Thread-info query results.

use crate::{ProtoError, Result, UserId, id};
use serde::Deserialize;
use serde_json::Value;

/// Snapshot of a thread's title and roster.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadInfo {
    /// Current title; `None` for untitled threads.
    pub thread_name: Option<String>,
    /// Member IDs in roster order.
    pub participants: Vec<UserId>,
}

#[derive(Deserialize)]
struct RawThreadInfo {
    #[serde(rename = "threadName", default)]
    thread_name: Option<String>,
    #[serde(rename = "userInfo", default)]
    user_info: Option<Vec<Value>>,
    #[serde(rename = "participantIDs", default)]
    participant_ids: Option<Vec<Value>>,
}

impl ThreadInfo {
    /// Build a thread-info snapshot from its parts.
    pub fn new(thread_name: Option<&str>, participants: &[&str]) -> Self {
        Self {
            thread_name: thread_name.map(str::to_string),
            participants: participants.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Decode the client's thread-info payload.
    ///
    /// The roster is read from `userInfo[].id`, falling back to
    /// `participantIDs` when the client omits user details. A payload with
    /// neither is malformed. Roster entries without a usable ID are skipped.
    pub fn from_value(value: Value) -> Result<Self> {
        let raw: RawThreadInfo = serde_json::from_value(value)?;

        let participants: Vec<UserId> = match (raw.user_info, raw.participant_ids) {
            (Some(users), _) => users
                .iter()
                .filter_map(|u| u.get("id").and_then(id::from_value))
                .collect(),
            (None, Some(ids)) => ids.iter().filter_map(id::from_value).collect(),
            (None, None) => return Err(ProtoError::missing("thread info", "userInfo")),
        };

        Ok(Self {
            thread_name: raw.thread_name.filter(|name| !name.is_empty()),
            participants,
        })
    }
}
