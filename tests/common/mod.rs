//! Integration test common infrastructure.
//!
//! Builds a warden over a [`RecordingClient`] with deterministic pacing
//! jitter, and feeds it events the way the bridge would.

#![allow(dead_code)]

use nickwarden::config::Config;
use nickwarden::lock::{Executor, Warden};
use nickwarden::platform::RecordingClient;
use nickwarden_proto::{Event, ThreadInfo};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;

pub const OPERATOR: &str = "100000000000001";

pub fn config() -> Config {
    config_with("")
}

/// Parse a config with the test operator plus `extra` TOML.
pub fn config_with(extra: &str) -> Config {
    let text = format!("[operator]\nuid = \"{OPERATOR}\"\n{extra}");
    toml::from_str(&text).expect("test config should parse")
}

pub fn thread(name: Option<&str>, members: &[&str]) -> ThreadInfo {
    ThreadInfo::new(name, members)
}

pub fn message(thread_id: &str, sender_id: &str, body: &str) -> Event {
    Event::Message {
        thread_id: thread_id.to_string(),
        sender_id: sender_id.to_string(),
        body: body.to_string(),
    }
}

pub fn nickname_changed(thread_id: &str, participant_id: &str, nickname: &str) -> Event {
    Event::NicknameChanged {
        thread_id: thread_id.to_string(),
        participant_id: participant_id.to_string(),
        nickname: nickname.to_string(),
    }
}

pub fn thread_renamed(thread_id: &str, name: &str) -> Event {
    Event::ThreadRenamed {
        thread_id: thread_id.to_string(),
        name: name.to_string(),
    }
}

pub struct Harness {
    pub client: Arc<RecordingClient>,
    pub warden: Warden,
}

impl Harness {
    pub fn new(client: RecordingClient) -> Self {
        Self::with_config(client, &config())
    }

    pub fn with_config(client: RecordingClient, config: &Config) -> Self {
        let client = Arc::new(client);
        let executor = Executor::with_rng(config.lock.pacing_range(), StdRng::seed_from_u64(7));
        let warden = Warden::new(config, client.clone()).with_executor(executor);
        Self { client, warden }
    }

    /// Send a message as the operator.
    pub async fn operator_says(&mut self, thread_id: &str, body: &str) {
        self.warden.handle_event(message(thread_id, OPERATOR, body)).await;
    }

    pub async fn drift(&mut self, thread_id: &str, member: &str, nickname: &str) {
        self.warden
            .handle_event(nickname_changed(thread_id, member, nickname))
            .await;
    }

    pub fn violations(&self, thread_id: &str) -> u32 {
        self.warden
            .registry()
            .get(thread_id)
            .map(|config| config.violation_count)
            .unwrap_or_default()
    }

    pub fn cooling_down(&self, thread_id: &str) -> bool {
        self.warden
            .registry()
            .get(thread_id)
            .is_some_and(|config| config.cooldown_active)
    }
}
