//! Unified error handling for nickwarden.
//!
//! Every failure in the enforcement path is operator-invisible: errors are
//! logged and counted, never posted back into a chat thread.

use nickwarden_proto::ProtoError;
use thiserror::Error;

// ============================================================================
// Platform Errors (remote calls)
// ============================================================================

/// Failures of a call into the platform client.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The platform rejected the call (rate limit, missing permission, ...).
    #[error("{op} rejected: {reason}")]
    Rejected { op: &'static str, reason: String },

    /// The reply payload could not be decoded.
    #[error("malformed {op} reply: {source}")]
    Malformed {
        op: &'static str,
        #[source]
        source: ProtoError,
    },

    /// The bridge connection is gone.
    #[error("platform bridge disconnected")]
    Disconnected,

    #[error("bridge I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PlatformError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Rejected { .. } => "rejected",
            Self::Malformed { .. } => "malformed",
            Self::Disconnected => "disconnected",
            Self::Io(_) => "io",
        }
    }
}

// ============================================================================
// Command Errors (operator directives)
// ============================================================================

/// Reasons an operator directive was aborted.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("thread info unavailable: {0}")]
    ThreadInfo(#[source] PlatformError),

    #[error("thread {0} has no title to lock")]
    Untitled(String),
}

impl CommandError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ThreadInfo(_) => "thread_info",
            Self::Untitled(_) => "untitled",
        }
    }
}

/// Result type for directive handlers.
pub type CommandResult<T> = Result<T, CommandError>;

// ============================================================================
// Backup Errors (session state)
// ============================================================================

/// Failures while snapshotting session state to disk.
#[derive(Debug, Error)]
pub enum BackupError {
    #[error("failed to export session state: {0}")]
    Export(#[from] PlatformError),

    #[error("failed to encode session state: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to write session file: {0}")]
    Write(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable() {
        let rejected = PlatformError::Rejected {
            op: "changeNickname",
            reason: "rate limited".into(),
        };
        assert_eq!(rejected.error_code(), "rejected");
        assert_eq!(rejected.to_string(), "changeNickname rejected: rate limited");
        assert_eq!(PlatformError::Disconnected.error_code(), "disconnected");
        assert_eq!(
            CommandError::ThreadInfo(PlatformError::Disconnected).error_code(),
            "thread_info"
        );
        assert_eq!(CommandError::Untitled("T1".into()).error_code(), "untitled");
    }
}
