//! The lock enforcement actor.
//!
//! The `Warden` owns the registry, the executor and the cooldown timers and
//! processes everything on one task: feed events in delivery order, queued
//! renames as their pacing gates open, cooldown lifts, and the keepalive and
//! backup ticks. Because nothing else touches its state, none of it needs
//! locking, and a directive can never observe a half-applied change.

use super::commands::{Interpreter, LockCommand};
use super::executor::Executor;
use super::reconcile::{CorrectionOutcome, Reconciler};
use super::registry::LockRegistry;
use super::{LockEffect, Origin};
use crate::config::{Config, MaintenanceConfig};
use crate::maintenance;
use crate::metrics;
use crate::platform::PlatformClient;
use crate::telemetry::spans;
use futures_util::StreamExt;
use nickwarden_proto::{Event, ThreadId};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep_until};
use tokio_util::time::{DelayQueue, delay_queue};
use tracing::{Instrument, debug, error, info, trace, warn};

/// Single-task owner of all lock state.
pub struct Warden {
    client: Arc<dyn PlatformClient>,
    registry: LockRegistry,
    executor: Executor,
    reconciler: Reconciler,
    interpreter: Interpreter,
    cooldown: Duration,
    cooldowns: DelayQueue<ThreadId>,
    cooldown_keys: HashMap<ThreadId, delay_queue::Key>,
    maintenance: MaintenanceConfig,
    session_path: PathBuf,
}

impl Warden {
    pub fn new(config: &Config, client: Arc<dyn PlatformClient>) -> Self {
        Self {
            client,
            registry: LockRegistry::new(),
            executor: Executor::new(config.lock.pacing_range()),
            reconciler: Reconciler::new(config.lock.violation_threshold),
            interpreter: Interpreter::new(
                config.operator.uid.clone(),
                config.lock.default_nickname.clone(),
            ),
            cooldown: config.lock.cooldown(),
            cooldowns: DelayQueue::new(),
            cooldown_keys: HashMap::new(),
            maintenance: config.maintenance.clone(),
            session_path: config.session.path.clone(),
        }
    }

    /// Replace the executor, e.g. with one using a seeded jitter source.
    pub fn with_executor(mut self, executor: Executor) -> Self {
        self.executor = executor;
        self
    }

    pub fn registry(&self) -> &LockRegistry {
        &self.registry
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Consume the event feed until it closes.
    pub async fn run(mut self, mut events: mpsc::Receiver<Event>) {
        let start = Instant::now();
        let mut keepalive = interval_at(
            start + self.maintenance.keepalive_interval(),
            self.maintenance.keepalive_interval(),
        );
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut backup = interval_at(
            start + self.maintenance.backup_interval(),
            self.maintenance.backup_interval(),
        );
        backup.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Warden started");
        loop {
            let next_action = self.executor.next_ready();

            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => {
                        info!("Event feed closed, warden stopping");
                        break;
                    }
                },
                Some(expired) = self.cooldowns.next(), if !self.cooldowns.is_empty() => {
                    self.on_cooldown_expired(expired.into_inner());
                }
                _ = sleep_until_or_pending(next_action) => {
                    self.dispatch_ready().await;
                }
                _ = keepalive.tick() => {
                    let threads: Vec<ThreadId> = self.registry.thread_ids().cloned().collect();
                    maintenance::send_keepalive(&self.client, &threads, self.maintenance.typing_hold()).await;
                }
                _ = backup.tick() => self.backup().await,
            }
        }
    }

    /// Handle one feed event to completion.
    pub async fn handle_event(&mut self, event: Event) {
        let span = spans::event(&event);
        async {
            match event {
                Event::Message {
                    thread_id,
                    sender_id,
                    body,
                } => self.on_message(&thread_id, &sender_id, &body).await,
                Event::NicknameChanged {
                    thread_id,
                    participant_id,
                    nickname,
                } => self.on_nickname_changed(&thread_id, &participant_id, &nickname),
                Event::ThreadRenamed { thread_id, name } => {
                    self.on_thread_renamed(&thread_id, &name).await
                }
                Event::Other { kind } => trace!(kind = %kind, "Ignoring event"),
            }
        }
        .instrument(span)
        .await
    }

    async fn on_message(&mut self, thread_id: &str, sender_id: &str, body: &str) {
        let Some(command) = LockCommand::parse(body) else {
            return;
        };
        if !self.interpreter.is_operator(sender_id) {
            debug!(sender = %sender_id, command = command.name(), "Ignoring directive from unauthorised sender");
            return;
        }

        metrics::record_command(command.name());
        match self
            .interpreter
            .execute(&command, thread_id, self.client.as_ref(), &mut self.registry)
            .await
        {
            Ok(effects) => self.apply_effects(effects).await,
            Err(e) => {
                metrics::record_command_error(command.name(), e.error_code());
                warn!(command = command.name(), error = %e, "Directive aborted");
            }
        }
        metrics::set_locked_threads(self.registry.locked_count());
    }

    fn on_nickname_changed(&mut self, thread_id: &str, user_id: &str, nickname: &str) {
        if let Some(action) = self
            .reconciler
            .nickname_changed(&self.registry, thread_id, user_id, nickname)
        {
            self.executor.enqueue(action);
        }
    }

    async fn on_thread_renamed(&mut self, thread_id: &str, title: &str) {
        if let Some(locked) = self.reconciler.title_changed(&self.registry, thread_id, title) {
            self.executor
                .set_title(self.client.as_ref(), thread_id, &locked)
                .await;
        }
    }

    async fn apply_effects(&mut self, effects: Vec<LockEffect>) {
        for effect in effects {
            match effect {
                LockEffect::Rename(action) => self.executor.enqueue(action),
                LockEffect::SetTitle { thread_id, title } => {
                    self.executor
                        .set_title(self.client.as_ref(), &thread_id, &title)
                        .await;
                }
                LockEffect::DropPending { thread_id } => {
                    let dropped = self.executor.discard(&thread_id, None);
                    if dropped > 0 {
                        info!(thread = %thread_id, dropped, "Dropped queued renames");
                    }
                }
                LockEffect::CancelCooldown { thread_id } => {
                    if let Some(key) = self.cooldown_keys.remove(&thread_id) {
                        self.cooldowns.remove(&key);
                    }
                }
            }
        }
    }

    /// Issue the next queued rename whose gate is open.
    ///
    /// Returns false when nothing was ready. A queued rename that no longer
    /// matches the registry is dropped without consuming a pacing slot. An
    /// issued rename closes the thread's gate whether or not the call
    /// succeeded.
    pub async fn dispatch_ready(&mut self) -> bool {
        let Some(action) = self.executor.pop_ready(Instant::now()) else {
            return false;
        };

        if !self.reconciler.permits(&self.registry, &action) {
            debug!(
                thread = %action.thread_id,
                member = %action.user_id,
                "Dropping stale rename"
            );
            return true;
        }

        let issued = self.executor.rename(self.client.as_ref(), &action).await;

        if issued && action.origin == Origin::Correction {
            match self.reconciler.record_correction(&mut self.registry, &action.thread_id) {
                CorrectionOutcome::CooldownStarted => {
                    self.start_cooldown(&action.thread_id);
                    return true;
                }
                CorrectionOutcome::Counted(_) | CorrectionOutcome::Untracked => {}
            }
        }

        self.executor.arm(&action.thread_id);
        if action.origin == Origin::Batch && self.executor.pending(&action.thread_id) == 0 {
            info!(thread = %action.thread_id, "Locked nickname applied to roster");
        }
        true
    }

    /// Dispatch queued renames, waiting out pacing gates, until the queue is empty.
    pub async fn run_until_idle(&mut self) {
        while let Some(ready_at) = self.executor.next_ready() {
            sleep_until(ready_at).await;
            self.dispatch_ready().await;
        }
    }

    /// Wait for the next cooldown to expire and lift it.
    ///
    /// Returns `None` immediately when no cooldown is scheduled.
    pub async fn lift_next_cooldown(&mut self) -> Option<ThreadId> {
        let expired = self.cooldowns.next().await?;
        let thread_id = expired.into_inner();
        self.on_cooldown_expired(thread_id.clone());
        Some(thread_id)
    }

    fn start_cooldown(&mut self, thread_id: &str) {
        let dropped = self.executor.discard(thread_id, Some(Origin::Correction));
        if let Some(key) = self.cooldown_keys.remove(thread_id) {
            self.cooldowns.remove(&key);
        }
        let key = self.cooldowns.insert(thread_id.to_string(), self.cooldown);
        self.cooldown_keys.insert(thread_id.to_string(), key);

        metrics::record_cooldown();
        warn!(
            thread = %thread_id,
            dropped,
            cooldown_secs = self.cooldown.as_secs(),
            "Cooldown triggered"
        );
    }

    fn on_cooldown_expired(&mut self, thread_id: ThreadId) {
        self.cooldown_keys.remove(&thread_id);
        if self.registry.lift_cooldown(&thread_id) {
            info!(thread = %thread_id, "Cooldown lifted");
        }
    }

    async fn backup(&self) {
        match maintenance::backup_session(self.client.as_ref(), &self.session_path).await {
            Ok(bytes) => info!(path = %self.session_path.display(), bytes, "Session state backed up"),
            Err(e) => error!(path = %self.session_path.display(), error = %e, "Session backup failed"),
        }
    }
}

async fn sleep_until_or_pending(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
