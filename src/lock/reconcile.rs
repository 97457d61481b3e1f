//! Drift reconciliation.
//!
//! Compares change notifications against the registry and decides which
//! corrective actions to take. Nickname corrections are subject to the
//! violation/cooldown policy; title corrections are not.

use super::registry::LockRegistry;
use super::{Origin, RenameAction};
use tracing::{debug, warn};

/// Result of counting an issued correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectionOutcome {
    /// Counted; the next correction for the thread waits for the pacing delay.
    Counted(u32),
    /// The threshold was reached and the thread entered cooldown.
    CooldownStarted,
    /// The thread has no record.
    Untracked,
}

/// Violation/cooldown policy for nickname drift.
#[derive(Debug, Clone)]
pub struct Reconciler {
    threshold: u32,
}

impl Reconciler {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Decide whether a nickname change needs reverting.
    ///
    /// A notification that already matches the expected nickname is ignored,
    /// which is also what stops the echo of our own rename from looping.
    pub fn nickname_changed(
        &self,
        registry: &LockRegistry,
        thread_id: &str,
        user_id: &str,
        nickname: &str,
    ) -> Option<RenameAction> {
        let config = registry.get(thread_id)?;
        if !config.enabled || config.cooldown_active {
            return None;
        }

        let expected = config.expected_nickname(user_id)?;
        if expected == nickname {
            return None;
        }

        debug!(
            thread = %thread_id,
            member = %user_id,
            observed = %nickname,
            expected = %expected,
            "Nickname drift detected"
        );
        Some(RenameAction {
            thread_id: thread_id.to_string(),
            user_id: user_id.to_string(),
            nickname: expected.to_string(),
            origin: Origin::Correction,
        })
    }

    /// Decide whether a title change needs reverting. Returns the title to restore.
    pub fn title_changed(&self, registry: &LockRegistry, thread_id: &str, title: &str) -> Option<String> {
        let config = registry.get(thread_id)?;
        if !config.title_lock_enabled || config.locked_title == title {
            return None;
        }
        Some(config.locked_title.clone())
    }

    /// Re-check a queued rename against the current registry state.
    ///
    /// The lock must still be enabled and still expect the queued nickname
    /// for the member; corrections are also held back by an active cooldown.
    pub fn permits(&self, registry: &LockRegistry, action: &RenameAction) -> bool {
        let Some(config) = registry.get(&action.thread_id) else {
            return false;
        };
        if !config.enabled {
            return false;
        }
        if action.origin == Origin::Correction && config.cooldown_active {
            return false;
        }
        config.expected_nickname(&action.user_id) == Some(action.nickname.as_str())
    }

    /// Count an issued correction and start a cooldown at the threshold.
    pub fn record_correction(&self, registry: &mut LockRegistry, thread_id: &str) -> CorrectionOutcome {
        match registry.record_violation(thread_id) {
            Some(count) if count >= self.threshold => {
                registry.start_cooldown(thread_id);
                warn!(thread = %thread_id, violations = count, "Correction threshold reached, cooling down");
                CorrectionOutcome::CooldownStarted
            }
            Some(count) => CorrectionOutcome::Counted(count),
            None => CorrectionOutcome::Untracked,
        }
    }
}
