//! Rate-limited action executor.
//!
//! Renames are queued per thread and released through a gate: a thread's
//! first rename goes out immediately, and after every issued rename the gate
//! closes for a random delay drawn uniformly from the pacing range. The
//! delay therefore sits *between* consecutive renames of a thread, never in
//! front of the first one.
//!
//! Title corrections bypass the queue.

use super::{Origin, RenameAction};
use crate::metrics;
use crate::platform::PlatformClient;
use nickwarden_proto::ThreadId;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, VecDeque};
use std::ops::Range;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug)]
struct ThreadQueue {
    pending: VecDeque<RenameAction>,
    ready_at: Instant,
}

impl ThreadQueue {
    fn new(now: Instant) -> Self {
        Self {
            pending: VecDeque::new(),
            ready_at: now,
        }
    }
}

/// Paced queue of member renames plus the remote mutation calls.
#[derive(Debug)]
pub struct Executor {
    queues: BTreeMap<ThreadId, ThreadQueue>,
    pacing: Range<Duration>,
    rng: StdRng,
}

impl Executor {
    pub fn new(pacing: Range<Duration>) -> Self {
        Self::with_rng(pacing, StdRng::from_entropy())
    }

    /// Build an executor with a caller-supplied jitter source.
    pub fn with_rng(pacing: Range<Duration>, rng: StdRng) -> Self {
        Self {
            queues: BTreeMap::new(),
            pacing,
            rng,
        }
    }

    /// Queue a rename.
    ///
    /// A rename already pending for the same member is replaced in place, so
    /// bursts of drift for one member collapse into a single call.
    pub fn enqueue(&mut self, action: RenameAction) {
        let queue = self
            .queues
            .entry(action.thread_id.clone())
            .or_insert_with(|| ThreadQueue::new(Instant::now()));

        if let Some(existing) = queue
            .pending
            .iter_mut()
            .find(|pending| pending.user_id == action.user_id)
        {
            debug!(thread = %action.thread_id, member = %action.user_id, "Coalescing queued rename");
            *existing = action;
        } else {
            queue.pending.push_back(action);
        }
    }

    /// Earliest instant at which some queued rename may be issued.
    pub fn next_ready(&self) -> Option<Instant> {
        self.queues
            .values()
            .filter(|queue| !queue.pending.is_empty())
            .map(|queue| queue.ready_at)
            .min()
    }

    /// Take the next rename whose thread gate is open at `now`.
    pub fn pop_ready(&mut self, now: Instant) -> Option<RenameAction> {
        // Gates that opened long ago on empty queues carry no information.
        self.queues
            .retain(|_, queue| !queue.pending.is_empty() || queue.ready_at > now);

        let thread_id = self
            .queues
            .iter()
            .filter(|(_, queue)| !queue.pending.is_empty() && queue.ready_at <= now)
            .min_by_key(|(_, queue)| queue.ready_at)
            .map(|(thread_id, _)| thread_id.clone())?;

        self.queues.get_mut(&thread_id)?.pending.pop_front()
    }

    /// Close the thread's gate for one pacing delay, starting now.
    pub fn arm(&mut self, thread_id: &str) -> Duration {
        let delay = self.pacing_delay();
        let now = Instant::now();
        self.queues
            .entry(thread_id.to_string())
            .or_insert_with(|| ThreadQueue::new(now))
            .ready_at = now + delay;
        delay
    }

    /// Drop queued renames for a thread, optionally only those of one origin.
    pub fn discard(&mut self, thread_id: &str, origin: Option<Origin>) -> usize {
        let Some(queue) = self.queues.get_mut(thread_id) else {
            return 0;
        };
        let before = queue.pending.len();
        queue
            .pending
            .retain(|action| origin.is_some_and(|o| action.origin != o));
        before - queue.pending.len()
    }

    pub fn pending(&self, thread_id: &str) -> usize {
        self.queues
            .get(thread_id)
            .map_or(0, |queue| queue.pending.len())
    }

    pub fn is_idle(&self) -> bool {
        self.queues.values().all(|queue| queue.pending.is_empty())
    }

    fn pacing_delay(&mut self) -> Duration {
        if self.pacing.is_empty() {
            return self.pacing.start;
        }
        self.rng.gen_range(self.pacing.clone())
    }

    /// Issue a member rename. Failures are logged and reported as `false`.
    pub async fn rename(&self, client: &dyn PlatformClient, action: &RenameAction) -> bool {
        match client
            .change_nickname(&action.thread_id, &action.user_id, &action.nickname)
            .await
        {
            Ok(()) => {
                if action.origin == Origin::Correction {
                    metrics::record_correction("nickname");
                    info!(thread = %action.thread_id, member = %action.user_id, "Reverted nickname");
                } else {
                    metrics::record_batch_rename();
                    debug!(thread = %action.thread_id, member = %action.user_id, "Applied locked nickname");
                }
                true
            }
            Err(e) => {
                metrics::record_platform_failure("changeNickname", e.error_code());
                warn!(
                    thread = %action.thread_id,
                    member = %action.user_id,
                    error = %e,
                    "Nickname change failed"
                );
                false
            }
        }
    }

    /// Set a thread title. Failures are logged and reported as `false`.
    pub async fn set_title(&self, client: &dyn PlatformClient, thread_id: &str, title: &str) -> bool {
        match client.set_title(thread_id, title).await {
            Ok(()) => {
                metrics::record_correction("title");
                info!(thread = %thread_id, "Restored locked title");
                true
            }
            Err(e) => {
                metrics::record_platform_failure("setTitle", e.error_code());
                warn!(thread = %thread_id, error = %e, "Title change failed");
                false
            }
        }
    }
}
