//! Bridge framing.
//!
//! The bridge sidecar owns the authenticated platform session and exchanges
//! newline-delimited JSON with `nickwarden`: one [`Request`] per outbound
//! call, and a stream of [`Frame`]s carrying replies and feed events.

use crate::{ThreadId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A remote operation issued to the platform client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Op {
    /// Rename one member of a thread.
    ChangeNickname {
        /// Nickname to apply.
        nickname: String,
        /// Target thread.
        #[serde(rename = "threadID")]
        thread_id: ThreadId,
        /// Member to rename.
        #[serde(rename = "participantID")]
        participant_id: UserId,
    },
    /// Set a thread's title.
    SetTitle {
        /// Title to apply.
        title: String,
        /// Target thread.
        #[serde(rename = "threadID")]
        thread_id: ThreadId,
    },
    /// Fetch the thread title and roster.
    GetThreadInfo {
        /// Target thread.
        #[serde(rename = "threadID")]
        thread_id: ThreadId,
    },
    /// Toggle the typing indicator in a thread.
    SendTypingIndicator {
        /// Target thread.
        #[serde(rename = "threadID")]
        thread_id: ThreadId,
        /// Whether the indicator is shown.
        typing: bool,
    },
    /// Export the current session state.
    GetAppState,
}

impl Op {
    /// Short operation name for logs and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            Op::ChangeNickname { .. } => "changeNickname",
            Op::SetTitle { .. } => "setTitle",
            Op::GetThreadInfo { .. } => "getThreadInfo",
            Op::SendTypingIndicator { .. } => "sendTypingIndicator",
            Op::GetAppState => "getAppState",
        }
    }
}

/// An outbound request line.
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    /// Correlation ID echoed back in the matching reply.
    pub id: u64,
    /// The operation to perform.
    #[serde(flatten)]
    pub op: Op,
}

impl Request {
    /// Encode as a single JSON line (without the trailing newline).
    pub fn to_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// An inbound line from the bridge.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Frame {
    /// A notification from the platform's real-time feed.
    Event {
        /// Raw event payload, decoded with [`crate::Event::from_value`].
        event: Value,
    },
    /// The outcome of a previously issued [`Request`].
    Reply {
        /// Correlation ID of the request.
        id: u64,
        /// Failure description; absent on success.
        #[serde(default)]
        error: Option<String>,
        /// Operation result; `null` for operations without one.
        #[serde(default)]
        result: Value,
    },
}

impl Frame {
    /// Decode a single line.
    pub fn from_line(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }
}
