//! Nickname and title lock enforcement.
//!
//! # Architecture
//!
//! - [`registry`]: per-thread desired state and drift counters.
//! - [`reconcile`]: turns drift notifications into corrective actions and
//!   owns the violation/cooldown policy.
//! - [`commands`]: parses operator directives into registry mutations.
//! - [`executor`]: paced queue of rename actions plus the two remote calls.
//! - [`warden`]: the actor that owns all of the above and consumes the
//!   event feed, so none of the state needs locking.
//!
//! Commands and the reconciler never touch the platform directly for
//! mutations; they return [`LockEffect`]s which the warden applies.

pub mod commands;
pub mod executor;
pub mod reconcile;
pub mod registry;
pub mod warden;

pub use commands::{Interpreter, LockCommand};
pub use executor::Executor;
pub use reconcile::{CorrectionOutcome, Reconciler};
pub use registry::{LockRegistry, ThreadLockConfig};
pub use warden::Warden;

use nickwarden_proto::{ThreadId, UserId};

/// Why a rename was queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Part of a roster-wide application (`/nicklock on`, `/nickall`).
    Batch,
    /// Reverting an observed drift.
    Correction,
}

/// A queued member rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameAction {
    pub thread_id: ThreadId,
    pub user_id: UserId,
    pub nickname: String,
    pub origin: Origin,
}

/// Side effects produced by directives and drift handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockEffect {
    /// Queue a paced member rename.
    Rename(RenameAction),
    /// Set the thread title right away (unpaced).
    SetTitle { thread_id: ThreadId, title: String },
    /// Drop every rename still queued for the thread.
    DropPending { thread_id: ThreadId },
    /// Forget a scheduled cooldown lift for the thread.
    CancelCooldown { thread_id: ThreadId },
}
