//! nickwarden - nickname and group-title lock enforcement for group chats.
//!
//! The agent watches a chat platform's event feed (through a bridge sidecar)
//! and reverts member nicknames and thread titles to their locked values.

pub mod config;
pub mod error;
pub mod http;
pub mod lock;
pub mod maintenance;
pub mod metrics;
pub mod platform;
pub mod telemetry;
