//! Inbound platform events.
//!
//! The client delivers every notification on a single real-time feed. Only
//! three shapes matter to lock enforcement; everything else is surfaced as
//! [`Event::Other`] so callers can log and skip it.

use crate::{ProtoError, Result, ThreadId, UserId, id};
use serde::Deserialize;
use serde_json::Value;

/// Log type for a member nickname change.
pub const LOG_USER_NICKNAME: &str = "log:user-nickname";

/// Log type for a thread title change.
pub const LOG_THREAD_NAME: &str = "log:thread-name";

/// A typed notification from the event feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A chat message posted in a thread.
    Message {
        /// Thread the message was posted in.
        thread_id: ThreadId,
        /// Author of the message.
        sender_id: UserId,
        /// Message text; empty for attachments and stickers.
        body: String,
    },

    /// A member's nickname changed (`log:user-nickname`).
    NicknameChanged {
        /// Thread whose roster changed.
        thread_id: ThreadId,
        /// Member whose nickname changed.
        participant_id: UserId,
        /// New nickname; empty when the nickname was cleared.
        nickname: String,
    },

    /// The thread title changed (`log:thread-name`).
    ThreadRenamed {
        /// Thread that was renamed.
        thread_id: ThreadId,
        /// New title; empty when the title was removed.
        name: String,
    },

    /// Any other event kind.
    Other {
        /// The raw `type` or `logMessageType` of the event.
        kind: String,
    },
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(rename = "threadID", default, deserialize_with = "id::deserialize_opt")]
    thread_id: Option<String>,
    #[serde(rename = "senderID", default, deserialize_with = "id::deserialize_opt")]
    sender_id: Option<String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(rename = "logMessageType", default)]
    log_type: Option<String>,
    #[serde(rename = "logMessageData", default)]
    log_data: Value,
}

impl Event {
    /// Parse an event from its JSON text.
    pub fn from_json(raw: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(raw)?)
    }

    /// Parse an event from an already-decoded JSON value.
    pub fn from_value(value: Value) -> Result<Self> {
        let raw: RawEvent = serde_json::from_value(value)?;

        // Log notifications come as `type: "event"` with the real kind in
        // `logMessageType`; some client versions put the log kind in `type`.
        let kind = match (raw.kind.as_str(), raw.log_type.as_deref()) {
            ("event", Some(log_type)) => log_type.to_string(),
            _ => raw.kind.clone(),
        };

        match kind.as_str() {
            "message" => Ok(Event::Message {
                thread_id: raw
                    .thread_id
                    .ok_or_else(|| ProtoError::missing("message", "threadID"))?,
                sender_id: raw
                    .sender_id
                    .ok_or_else(|| ProtoError::missing("message", "senderID"))?,
                body: raw.body.unwrap_or_default(),
            }),
            LOG_USER_NICKNAME => {
                let thread_id = raw
                    .thread_id
                    .ok_or_else(|| ProtoError::missing(LOG_USER_NICKNAME, "threadID"))?;
                let participant_id = raw
                    .log_data
                    .get("participant_id")
                    .and_then(id::from_value)
                    .ok_or_else(|| ProtoError::missing(LOG_USER_NICKNAME, "participant_id"))?;
                let nickname = text_field(&raw.log_data, LOG_USER_NICKNAME, "nickname")?;
                Ok(Event::NicknameChanged {
                    thread_id,
                    participant_id,
                    nickname,
                })
            }
            LOG_THREAD_NAME => {
                let thread_id = raw
                    .thread_id
                    .ok_or_else(|| ProtoError::missing(LOG_THREAD_NAME, "threadID"))?;
                let name = text_field(&raw.log_data, LOG_THREAD_NAME, "name")?;
                Ok(Event::ThreadRenamed { thread_id, name })
            }
            _ => Ok(Event::Other { kind }),
        }
    }

    /// Thread the event belongs to, if it carries one.
    pub fn thread_id(&self) -> Option<&str> {
        match self {
            Event::Message { thread_id, .. }
            | Event::NicknameChanged { thread_id, .. }
            | Event::ThreadRenamed { thread_id, .. } => Some(thread_id),
            Event::Other { .. } => None,
        }
    }
}

/// Read a text field that must be present but may be `null`.
fn text_field(data: &Value, kind: &str, field: &'static str) -> Result<String> {
    match data.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Null) => Ok(String::new()),
        _ => Err(ProtoError::missing(kind, field)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_operator_message() {
        let event = Event::from_value(json!({
            "type": "message",
            "threadID": "T1",
            "senderID": 61578631626802u64,
            "body": "/nicklock on"
        }))
        .unwrap();

        assert_eq!(
            event,
            Event::Message {
                thread_id: "T1".into(),
                sender_id: "61578631626802".into(),
                body: "/nicklock on".into(),
            }
        );
    }

    #[test]
    fn message_without_body_is_empty() {
        let event = Event::from_value(json!({
            "type": "message", "threadID": "T1", "senderID": "A"
        }))
        .unwrap();
        assert!(matches!(event, Event::Message { body, .. } if body.is_empty()));
    }

    #[test]
    fn parses_nickname_log_event() {
        let event = Event::from_value(json!({
            "type": "event",
            "logMessageType": "log:user-nickname",
            "threadID": "T1",
            "logMessageData": { "participant_id": "A", "nickname": "Eve" }
        }))
        .unwrap();

        assert_eq!(
            event,
            Event::NicknameChanged {
                thread_id: "T1".into(),
                participant_id: "A".into(),
                nickname: "Eve".into(),
            }
        );
    }

    #[test]
    fn cleared_nickname_is_empty_string() {
        let event = Event::from_value(json!({
            "type": "log:user-nickname",
            "threadID": "T1",
            "logMessageData": { "participant_id": 7, "nickname": null }
        }))
        .unwrap();

        assert_eq!(
            event,
            Event::NicknameChanged {
                thread_id: "T1".into(),
                participant_id: "7".into(),
                nickname: String::new(),
            }
        );
    }

    #[test]
    fn nickname_event_without_participant_is_rejected() {
        let err = Event::from_value(json!({
            "type": "event",
            "logMessageType": "log:user-nickname",
            "threadID": "T1",
            "logMessageData": { "nickname": "Eve" }
        }))
        .unwrap_err();

        assert!(matches!(
            err,
            ProtoError::MissingField { field: "participant_id", .. }
        ));
    }

    #[test]
    fn parses_thread_rename() {
        let event = Event::from_json(
            r#"{"type":"event","logMessageType":"log:thread-name","threadID":"T2","logMessageData":{"name":"Spam"}}"#,
        )
        .unwrap();

        assert_eq!(event.thread_id(), Some("T2"));
        assert!(matches!(event, Event::ThreadRenamed { name, .. } if name == "Spam"));
    }

    #[test]
    fn unknown_kinds_pass_through() {
        let event = Event::from_value(json!({
            "type": "event",
            "logMessageType": "log:subscribe",
            "threadID": "T1"
        }))
        .unwrap();
        assert_eq!(event, Event::Other { kind: "log:subscribe".into() });

        let typing = Event::from_value(json!({ "type": "typ", "from": "A" })).unwrap();
        assert_eq!(typing.thread_id(), None);
    }
}
