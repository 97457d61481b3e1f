//! In-memory lock registry.
//!
//! Single source of truth for what each thread should look like. Records
//! are created lazily by the first lock-enabling directive and live for the
//! lifetime of the process; disabling a lock only clears its flag.

use nickwarden_proto::{ThreadId, UserId};
use std::collections::HashMap;

/// Desired state and drift counters for one thread.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadLockConfig {
    /// Whether nickname locking is active.
    pub enabled: bool,
    /// Nickname enforced on every tracked member.
    pub locked_nickname: String,
    /// Expected nickname per tracked member.
    ///
    /// Entries are written when a lock is (re)established or reapplied and
    /// never pruned; entries for departed members are inert.
    pub member_overrides: HashMap<UserId, String>,
    /// Corrections issued since the last cooldown lift.
    pub violation_count: u32,
    /// Suppresses nickname corrections while set.
    pub cooldown_active: bool,
    /// Whether the thread title is locked. Independent of `enabled`.
    pub title_lock_enabled: bool,
    pub locked_title: String,
}

impl ThreadLockConfig {
    pub fn expected_nickname(&self, user_id: &str) -> Option<&str> {
        self.member_overrides.get(user_id).map(String::as_str)
    }
}

/// Mapping from thread ID to its lock configuration.
#[derive(Debug, Default)]
pub struct LockRegistry {
    threads: HashMap<ThreadId, ThreadLockConfig>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock every member in `members` to `nickname`.
    ///
    /// Overwrites the nickname fields (including previous member overrides)
    /// and resets the drift counters. Title lock fields are left untouched.
    pub fn set_nickname_lock<I>(&mut self, thread_id: &str, nickname: &str, members: I)
    where
        I: IntoIterator<Item = UserId>,
    {
        let config = self.threads.entry(thread_id.to_string()).or_default();
        config.enabled = true;
        config.locked_nickname = nickname.to_string();
        config.member_overrides = members
            .into_iter()
            .map(|member| (member, nickname.to_string()))
            .collect();
        config.violation_count = 0;
        config.cooldown_active = false;
    }

    /// Point every member in `members` at the thread's locked nickname.
    ///
    /// Returns the locked nickname, or `None` (without changes) when the
    /// nickname lock is not enabled. Existing overrides are kept.
    pub fn refresh_members<I>(&mut self, thread_id: &str, members: I) -> Option<String>
    where
        I: IntoIterator<Item = UserId>,
    {
        let config = self.threads.get_mut(thread_id).filter(|c| c.enabled)?;
        let nickname = config.locked_nickname.clone();
        for member in members {
            config.member_overrides.insert(member, nickname.clone());
        }
        Some(nickname)
    }

    /// Disable nickname locking. Returns false when the thread has no record.
    pub fn clear_nickname_lock(&mut self, thread_id: &str) -> bool {
        match self.threads.get_mut(thread_id) {
            Some(config) => {
                config.enabled = false;
                true
            }
            None => false,
        }
    }

    pub fn set_title_lock(&mut self, thread_id: &str, title: &str) {
        let config = self.threads.entry(thread_id.to_string()).or_default();
        config.title_lock_enabled = true;
        config.locked_title = title.to_string();
    }

    /// Disable title locking. Returns false when the thread has no record.
    pub fn clear_title_lock(&mut self, thread_id: &str) -> bool {
        match self.threads.get_mut(thread_id) {
            Some(config) => {
                config.title_lock_enabled = false;
                true
            }
            None => false,
        }
    }

    /// Count one correction. Returns the new count, or `None` for unknown threads.
    pub fn record_violation(&mut self, thread_id: &str) -> Option<u32> {
        let config = self.threads.get_mut(thread_id)?;
        config.violation_count += 1;
        Some(config.violation_count)
    }

    pub fn start_cooldown(&mut self, thread_id: &str) {
        if let Some(config) = self.threads.get_mut(thread_id) {
            config.cooldown_active = true;
        }
    }

    /// End a cooldown, resetting the violation count.
    ///
    /// Returns false when no cooldown was active.
    pub fn lift_cooldown(&mut self, thread_id: &str) -> bool {
        match self.threads.get_mut(thread_id) {
            Some(config) if config.cooldown_active => {
                config.cooldown_active = false;
                config.violation_count = 0;
                true
            }
            _ => false,
        }
    }

    /// Look up a thread. `None` means no record, which is distinct from a
    /// record with locking disabled.
    pub fn get(&self, thread_id: &str) -> Option<&ThreadLockConfig> {
        self.threads.get(thread_id)
    }

    /// Every thread with a record, locked or not.
    pub fn thread_ids(&self) -> impl Iterator<Item = &ThreadId> {
        self.threads.keys()
    }

    /// Threads with nickname locking enabled.
    pub fn locked_count(&self) -> usize {
        self.threads.values().filter(|c| c.enabled).count()
    }

    pub fn len(&self) -> usize {
        self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }
}
