//! Operator directives.
//!
//! Only the configured operator can issue directives. Anything else, from
//! anyone, is silently ignored: the agent never answers in a thread.

use super::registry::LockRegistry;
use super::{LockEffect, Origin, RenameAction};
use crate::error::{CommandError, CommandResult};
use crate::platform::PlatformClient;
use nickwarden_proto::UserId;
use tracing::{debug, info};

const TITLE_LOCK_PREFIX: &str = "/gclock ";

/// A recognised operator directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockCommand {
    /// `/nicklock on`: snapshot the roster and lock everyone's nickname.
    NickLockOn,
    /// `/nicklock off`
    NickLockOff,
    /// `/nickall`: reapply the locked nickname to the current roster.
    NickAll,
    /// `/gclock` locks the current title; `/gclock <title>` sets and locks a new one.
    TitleLock(Option<String>),
    /// `/unlockgname`
    TitleUnlock,
}

impl LockCommand {
    /// Parse a message body. Matching is case-insensitive and exact.
    pub fn parse(body: &str) -> Option<Self> {
        match body.to_lowercase().as_str() {
            "/nicklock on" => return Some(Self::NickLockOn),
            "/nicklock off" => return Some(Self::NickLockOff),
            "/nickall" => return Some(Self::NickAll),
            "/gclock" => return Some(Self::TitleLock(None)),
            "/unlockgname" => return Some(Self::TitleUnlock),
            _ => {}
        }

        // The title keeps its original case.
        let prefix = body.get(..TITLE_LOCK_PREFIX.len())?;
        if !prefix.eq_ignore_ascii_case(TITLE_LOCK_PREFIX) {
            return None;
        }
        let title = body[TITLE_LOCK_PREFIX.len()..].trim();
        if title.is_empty() {
            return None;
        }
        Some(Self::TitleLock(Some(title.to_string())))
    }

    /// Short name for logs and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::NickLockOn => "nicklock_on",
            Self::NickLockOff => "nicklock_off",
            Self::NickAll => "nickall",
            Self::TitleLock(None) => "gclock",
            Self::TitleLock(Some(_)) => "gclock_set",
            Self::TitleUnlock => "unlockgname",
        }
    }
}

/// Turns operator directives into registry mutations and effects.
#[derive(Debug, Clone)]
pub struct Interpreter {
    operator: UserId,
    default_nickname: String,
}

impl Interpreter {
    pub fn new(operator: impl Into<UserId>, default_nickname: impl Into<String>) -> Self {
        Self {
            operator: operator.into(),
            default_nickname: default_nickname.into(),
        }
    }

    pub fn is_operator(&self, sender_id: &str) -> bool {
        sender_id == self.operator
    }

    /// Execute a directive against one thread.
    ///
    /// Registry mutations happen before any effect is returned, so they never
    /// depend on the outcome of the remote calls that follow.
    pub async fn execute(
        &self,
        command: &LockCommand,
        thread_id: &str,
        client: &dyn PlatformClient,
        registry: &mut LockRegistry,
    ) -> CommandResult<Vec<LockEffect>> {
        match command {
            LockCommand::NickLockOn => {
                let info = client
                    .thread_info(thread_id)
                    .await
                    .map_err(CommandError::ThreadInfo)?;

                registry.set_nickname_lock(thread_id, &self.default_nickname, info.participants.clone());
                info!(thread = %thread_id, members = info.participants.len(), "Nickname lock enabled");

                let mut effects = vec![
                    LockEffect::CancelCooldown {
                        thread_id: thread_id.to_string(),
                    },
                    LockEffect::DropPending {
                        thread_id: thread_id.to_string(),
                    },
                ];
                effects.extend(batch_renames(thread_id, &self.default_nickname, info.participants));
                Ok(effects)
            }

            LockCommand::NickLockOff => {
                if registry.clear_nickname_lock(thread_id) {
                    info!(thread = %thread_id, "Nickname lock disabled");
                }
                Ok(vec![LockEffect::DropPending {
                    thread_id: thread_id.to_string(),
                }])
            }

            LockCommand::NickAll => {
                if !registry.get(thread_id).is_some_and(|config| config.enabled) {
                    debug!(thread = %thread_id, "Reapply requested without an active lock");
                    return Ok(Vec::new());
                }

                let info = client
                    .thread_info(thread_id)
                    .await
                    .map_err(CommandError::ThreadInfo)?;

                let Some(nickname) = registry.refresh_members(thread_id, info.participants.clone()) else {
                    return Ok(Vec::new());
                };
                info!(thread = %thread_id, members = info.participants.len(), "Reapplying locked nickname");
                Ok(batch_renames(thread_id, &nickname, info.participants).collect())
            }

            LockCommand::TitleLock(None) => {
                let info = client
                    .thread_info(thread_id)
                    .await
                    .map_err(CommandError::ThreadInfo)?;
                let title = info
                    .thread_name
                    .ok_or_else(|| CommandError::Untitled(thread_id.to_string()))?;

                registry.set_title_lock(thread_id, &title);
                info!(thread = %thread_id, title = %title, "Title locked");
                Ok(Vec::new())
            }

            LockCommand::TitleLock(Some(title)) => {
                registry.set_title_lock(thread_id, title);
                info!(thread = %thread_id, title = %title, "Title set and locked");
                Ok(vec![LockEffect::SetTitle {
                    thread_id: thread_id.to_string(),
                    title: title.clone(),
                }])
            }

            LockCommand::TitleUnlock => {
                if registry.clear_title_lock(thread_id) {
                    info!(thread = %thread_id, "Title unlocked");
                }
                Ok(Vec::new())
            }
        }
    }
}

fn batch_renames<'a>(
    thread_id: &'a str,
    nickname: &'a str,
    members: Vec<UserId>,
) -> impl Iterator<Item = LockEffect> + 'a {
    members.into_iter().map(move |user_id| {
        LockEffect::Rename(RenameAction {
            thread_id: thread_id.to_string(),
            user_id,
            nickname: nickname.to_string(),
            origin: Origin::Batch,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::RecordingClient;
    use nickwarden_proto::ThreadInfo;

    fn interpreter() -> Interpreter {
        Interpreter::new("op", "locked")
    }

    fn renamed_members(effects: &[LockEffect]) -> Vec<&str> {
        effects
            .iter()
            .filter_map(|effect| match effect {
                LockEffect::Rename(action) => Some(action.user_id.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn parses_directives_case_insensitively() {
        assert_eq!(LockCommand::parse("/nicklock on"), Some(LockCommand::NickLockOn));
        assert_eq!(LockCommand::parse("/NickLock ON"), Some(LockCommand::NickLockOn));
        assert_eq!(LockCommand::parse("/nicklock off"), Some(LockCommand::NickLockOff));
        assert_eq!(LockCommand::parse("/NICKALL"), Some(LockCommand::NickAll));
        assert_eq!(LockCommand::parse("/gclock"), Some(LockCommand::TitleLock(None)));
        assert_eq!(LockCommand::parse("/unlockgname"), Some(LockCommand::TitleUnlock));
    }

    #[test]
    fn rejects_near_misses() {
        assert_eq!(LockCommand::parse("/nicklock"), None);
        assert_eq!(LockCommand::parse(" /nickall"), None);
        assert_eq!(LockCommand::parse("/nickall please"), None);
        assert_eq!(LockCommand::parse("/gclock   "), None);
        assert_eq!(LockCommand::parse("hello"), None);
        assert_eq!(LockCommand::parse(""), None);
    }

    #[test]
    fn title_argument_keeps_its_case() {
        assert_eq!(
            LockCommand::parse("/GCLOCK  Fun Group "),
            Some(LockCommand::TitleLock(Some("Fun Group".into())))
        );
        // Multi-byte text right at the prefix boundary must not panic.
        assert_eq!(LockCommand::parse("/gcloc\u{212A} x"), None);
    }

    #[tokio::test]
    async fn nicklock_on_snapshots_roster() {
        let client = RecordingClient::new().with_thread("T1", ThreadInfo::new(Some("Fun"), &["A", "B"]));
        let mut registry = LockRegistry::new();

        let effects = interpreter()
            .execute(&LockCommand::NickLockOn, "T1", &client, &mut registry)
            .await
            .unwrap();

        assert_eq!(renamed_members(&effects), vec!["A", "B"]);
        let config = registry.get("T1").unwrap();
        assert!(config.enabled);
        assert_eq!(config.expected_nickname("B"), Some("locked"));
        assert!(client.renames().is_empty(), "the interpreter never renames directly");
    }

    #[tokio::test]
    async fn failed_roster_fetch_aborts_without_mutation() {
        let client = RecordingClient::new();
        let mut registry = LockRegistry::new();

        let err = interpreter()
            .execute(&LockCommand::NickLockOn, "T1", &client, &mut registry)
            .await
            .unwrap_err();

        assert!(matches!(err, CommandError::ThreadInfo(_)));
        assert!(registry.get("T1").is_none());
    }

    #[tokio::test]
    async fn nickall_requires_enabled_lock() {
        let client = RecordingClient::new().with_thread("T1", ThreadInfo::new(None, &["A", "C"]));
        let mut registry = LockRegistry::new();
        let interpreter = interpreter();

        let effects = interpreter
            .execute(&LockCommand::NickAll, "T1", &client, &mut registry)
            .await
            .unwrap();
        assert!(effects.is_empty());
        assert!(client.calls().is_empty(), "no roster fetch without a lock");

        registry.set_nickname_lock("T1", "locked", vec!["A".to_string()]);
        let effects = interpreter
            .execute(&LockCommand::NickAll, "T1", &client, &mut registry)
            .await
            .unwrap();
        assert_eq!(renamed_members(&effects), vec!["A", "C"]);
        assert_eq!(registry.get("T1").unwrap().expected_nickname("C"), Some("locked"));
    }

    #[tokio::test]
    async fn gclock_snapshots_current_title() {
        let client = RecordingClient::new()
            .with_thread("T2", ThreadInfo::new(Some("Fun Group"), &["A"]))
            .with_thread("T3", ThreadInfo::new(None, &["A"]));
        let mut registry = LockRegistry::new();
        let interpreter = interpreter();

        let effects = interpreter
            .execute(&LockCommand::TitleLock(None), "T2", &client, &mut registry)
            .await
            .unwrap();
        assert!(effects.is_empty());
        let config = registry.get("T2").unwrap();
        assert!(config.title_lock_enabled);
        assert_eq!(config.locked_title, "Fun Group");

        let err = interpreter
            .execute(&LockCommand::TitleLock(None), "T3", &client, &mut registry)
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Untitled(_)));
        assert!(registry.get("T3").is_none());
    }

    #[tokio::test]
    async fn gclock_with_title_sets_it() {
        let client = RecordingClient::new();
        let mut registry = LockRegistry::new();

        let effects = interpreter()
            .execute(&LockCommand::TitleLock(Some("New Name".into())), "T2", &client, &mut registry)
            .await
            .unwrap();

        assert_eq!(
            effects,
            vec![LockEffect::SetTitle {
                thread_id: "T2".into(),
                title: "New Name".into()
            }]
        );
        assert_eq!(registry.get("T2").unwrap().locked_title, "New Name");
    }

    #[tokio::test]
    async fn unlocking_only_touches_its_own_lock() {
        let client = RecordingClient::new();
        let mut registry = LockRegistry::new();
        registry.set_nickname_lock("T1", "locked", vec!["A".to_string()]);
        registry.set_title_lock("T1", "Fun Group");
        let interpreter = interpreter();

        interpreter
            .execute(&LockCommand::TitleUnlock, "T1", &client, &mut registry)
            .await
            .unwrap();
        assert!(registry.get("T1").unwrap().enabled);

        registry.set_title_lock("T1", "Fun Group");
        let effects = interpreter
            .execute(&LockCommand::NickLockOff, "T1", &client, &mut registry)
            .await
            .unwrap();
        assert_eq!(effects, vec![LockEffect::DropPending { thread_id: "T1".into() }]);
        let config = registry.get("T1").unwrap();
        assert!(!config.enabled);
        assert!(config.title_lock_enabled);
    }

    #[test]
    fn only_the_operator_is_authorised() {
        let interpreter = interpreter();
        assert!(interpreter.is_operator("op"));
        assert!(!interpreter.is_operator("OP"));
        assert!(!interpreter.is_operator(""));
    }
}
