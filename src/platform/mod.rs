//! Platform client seam.
//!
//! The chat platform itself (authentication, the real-time feed, remote
//! mutations) lives outside this crate. Enforcement code only sees the
//! [`PlatformClient`] trait and a feed of typed [`Event`]s.
//!
//! [`Event`]: nickwarden_proto::Event

pub mod bridge;
pub mod recording;

pub use bridge::BridgeClient;
pub use recording::{Call, RecordedCall, RecordingClient};

use crate::error::PlatformError;
use async_trait::async_trait;
use nickwarden_proto::ThreadInfo;
use serde_json::Value;

/// Remote calls the agent issues against the chat platform.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Rename one member of a thread.
    async fn change_nickname(
        &self,
        thread_id: &str,
        user_id: &str,
        nickname: &str,
    ) -> Result<(), PlatformError>;

    /// Set a thread's title.
    async fn set_title(&self, thread_id: &str, title: &str) -> Result<(), PlatformError>;

    /// Fetch the thread's current title and roster.
    async fn thread_info(&self, thread_id: &str) -> Result<ThreadInfo, PlatformError>;

    /// Show or hide the typing indicator in a thread.
    async fn send_typing(&self, thread_id: &str, typing: bool) -> Result<(), PlatformError>;

    /// Export the session state (cookies and tokens) for backup.
    async fn app_state(&self) -> Result<Value, PlatformError>;
}
