//! # nickwarden-proto
//!
//! Wire model for the chat-platform bridge used by `nickwarden`.
//!
//! The platform client speaks loosely-typed JSON: identifiers arrive as
//! strings or numbers, log notifications carry their payload in an untyped
//! `logMessageData` object, and optional fields are frequently `null`. This
//! crate turns that shape into strongly-typed values and back.
//!
//! ## Parsing events
//!
//! ```rust
//! use nickwarden_proto::Event;
//!
//! let raw = r#"{"type":"event","logMessageType":"log:thread-name",
//!               "threadID":"42","logMessageData":{"name":"Fun Group"}}"#;
//! let event = Event::from_json(raw).expect("valid event");
//! assert_eq!(
//!     event,
//!     Event::ThreadRenamed { thread_id: "42".into(), name: "Fun Group".into() }
//! );
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod event;
pub mod frame;
pub mod thread;

mod id;

pub use error::{ProtoError, Result};
pub use event::Event;
pub use frame::{Frame, Op, Request};
pub use thread::ThreadInfo;

/// Identifier of a chat thread (group or direct conversation).
pub type ThreadId = String;

/// Identifier of a platform user.
pub type UserId = String;
