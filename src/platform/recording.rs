//! In-memory platform client that records every call.
//!
//! Used by the test suites to observe exactly which remote mutations the
//! warden issues and when, under tokio's paused clock.

use super::PlatformClient;
use crate::error::PlatformError;
use async_trait::async_trait;
use nickwarden_proto::{ThreadId, ThreadInfo, UserId};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tokio::time::Instant;

/// A single remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ChangeNickname {
        thread_id: ThreadId,
        user_id: UserId,
        nickname: String,
    },
    SetTitle {
        thread_id: ThreadId,
        title: String,
    },
    ThreadInfo {
        thread_id: ThreadId,
    },
    Typing {
        thread_id: ThreadId,
        typing: bool,
    },
    AppState,
}

/// A call together with the (virtual) time it was issued.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub at: Instant,
    pub call: Call,
}

/// Scriptable [`PlatformClient`] for tests.
#[derive(Debug, Default)]
pub struct RecordingClient {
    calls: Mutex<Vec<RecordedCall>>,
    threads: Mutex<HashMap<ThreadId, ThreadInfo>>,
    failing_members: Mutex<HashSet<UserId>>,
    app_state: Mutex<Value>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `info` for thread-info queries on `thread_id`.
    pub fn with_thread(self, thread_id: &str, info: ThreadInfo) -> Self {
        self.set_thread(thread_id, info);
        self
    }

    pub fn set_thread(&self, thread_id: &str, info: ThreadInfo) {
        self.threads.lock().insert(thread_id.to_string(), info);
    }

    /// Make every rename of `user_id` fail.
    pub fn fail_renames_for(&self, user_id: &str) {
        self.failing_members.lock().insert(user_id.to_string());
    }

    pub fn set_app_state(&self, state: Value) {
        *self.app_state.lock() = state;
    }

    /// Every call issued so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Rename calls as `(thread, member, nickname)` triples.
    pub fn renames(&self) -> Vec<(ThreadId, UserId, String)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match &c.call {
                Call::ChangeNickname {
                    thread_id,
                    user_id,
                    nickname,
                } => Some((thread_id.clone(), user_id.clone(), nickname.clone())),
                _ => None,
            })
            .collect()
    }

    /// Instants at which rename calls were issued.
    pub fn rename_times(&self) -> Vec<Instant> {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c.call, Call::ChangeNickname { .. }))
            .map(|c| c.at)
            .collect()
    }

    /// Title calls as `(thread, title)` pairs.
    pub fn titles(&self) -> Vec<(ThreadId, String)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match &c.call {
                Call::SetTitle { thread_id, title } => Some((thread_id.clone(), title.clone())),
                _ => None,
            })
            .collect()
    }

    /// Forget recorded calls, keeping scripted behaviour.
    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(RecordedCall {
            at: Instant::now(),
            call,
        });
    }
}

#[async_trait]
impl PlatformClient for RecordingClient {
    async fn change_nickname(
        &self,
        thread_id: &str,
        user_id: &str,
        nickname: &str,
    ) -> Result<(), PlatformError> {
        self.record(Call::ChangeNickname {
            thread_id: thread_id.to_string(),
            user_id: user_id.to_string(),
            nickname: nickname.to_string(),
        });
        if self.failing_members.lock().contains(user_id) {
            return Err(PlatformError::Rejected {
                op: "changeNickname",
                reason: format!("cannot rename {user_id}"),
            });
        }
        Ok(())
    }

    async fn set_title(&self, thread_id: &str, title: &str) -> Result<(), PlatformError> {
        self.record(Call::SetTitle {
            thread_id: thread_id.to_string(),
            title: title.to_string(),
        });
        Ok(())
    }

    async fn thread_info(&self, thread_id: &str) -> Result<ThreadInfo, PlatformError> {
        self.record(Call::ThreadInfo {
            thread_id: thread_id.to_string(),
        });
        self.threads
            .lock()
            .get(thread_id)
            .cloned()
            .ok_or_else(|| PlatformError::Rejected {
                op: "getThreadInfo",
                reason: format!("unknown thread {thread_id}"),
            })
    }

    async fn send_typing(&self, thread_id: &str, typing: bool) -> Result<(), PlatformError> {
        self.record(Call::Typing {
            thread_id: thread_id.to_string(),
            typing,
        });
        Ok(())
    }

    async fn app_state(&self) -> Result<Value, PlatformError> {
        self.record(Call::AppState);
        Ok(self.app_state.lock().clone())
    }
}
