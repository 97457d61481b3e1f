//! Prometheus metrics collection for nickwarden.
//!
//! - `nickwarden_corrections_total{kind}` - corrective calls issued (nickname / title)
//! - `nickwarden_batch_renames_total` - renames issued by roster-wide directives
//! - `nickwarden_platform_failures_total{op, error}` - failed platform calls
//! - `nickwarden_cooldowns_total` - cooldowns started
//! - `nickwarden_dropped_events_total` - feed events dropped because the feed was full
//! - `nickwarden_commands_total{command}` / `nickwarden_command_errors_total{command, error}`
//! - `nickwarden_locked_threads` - threads with nickname locking enabled

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

pub static CORRECTIONS: OnceLock<IntCounterVec> = OnceLock::new();

pub static BATCH_RENAMES: OnceLock<IntCounter> = OnceLock::new();

pub static PLATFORM_FAILURES: OnceLock<IntCounterVec> = OnceLock::new();

pub static COOLDOWNS: OnceLock<IntCounter> = OnceLock::new();

pub static DROPPED_EVENTS: OnceLock<IntCounter> = OnceLock::new();

pub static COMMAND_COUNTER: OnceLock<IntCounterVec> = OnceLock::new();

pub static COMMAND_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

pub static LOCKED_THREADS: OnceLock<IntGauge> = OnceLock::new();

static INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Idempotent; concurrent callers wait for the first to finish. Recording
/// before `init` is a no-op.
pub fn init() {
    INITIALIZED.get_or_init(register_all);
}

fn register_all() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            match $init {
                Ok(m) => {
                    if let Err(e) = r.register(Box::new(m.clone())) {
                        tracing::warn!(error = %e, "Failed to register metric {}", stringify!($metric));
                    }
                    let _ = $metric.set(m);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to create metric {}", stringify!($metric));
                }
            }
        };
    }

    register!(CORRECTIONS, IntCounterVec::new(Opts::new("nickwarden_corrections_total", "Corrective calls issued"), &["kind"]));
    register!(BATCH_RENAMES, IntCounter::new("nickwarden_batch_renames_total", "Renames issued by roster-wide directives"));
    register!(PLATFORM_FAILURES, IntCounterVec::new(Opts::new("nickwarden_platform_failures_total", "Failed platform calls"), &["op", "error"]));
    register!(COOLDOWNS, IntCounter::new("nickwarden_cooldowns_total", "Correction cooldowns started"));
    register!(DROPPED_EVENTS, IntCounter::new("nickwarden_dropped_events_total", "Feed events dropped because the feed was full"));
    register!(COMMAND_COUNTER, IntCounterVec::new(Opts::new("nickwarden_commands_total", "Operator directives processed"), &["command"]));
    register!(COMMAND_ERRORS, IntCounterVec::new(Opts::new("nickwarden_command_errors_total", "Operator directives aborted"), &["command", "error"]));
    register!(LOCKED_THREADS, IntGauge::new("nickwarden_locked_threads", "Threads with nickname locking enabled"));
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

#[inline]
pub fn record_correction(kind: &str) {
    if let Some(c) = CORRECTIONS.get() {
        c.with_label_values(&[kind]).inc();
    }
}

#[inline]
pub fn record_batch_rename() {
    if let Some(c) = BATCH_RENAMES.get() {
        c.inc();
    }
}

#[inline]
pub fn record_platform_failure(op: &str, error: &str) {
    if let Some(c) = PLATFORM_FAILURES.get() {
        c.with_label_values(&[op, error]).inc();
    }
}

#[inline]
pub fn record_cooldown() {
    if let Some(c) = COOLDOWNS.get() {
        c.inc();
    }
}

#[inline]
pub fn record_dropped_event() {
    if let Some(c) = DROPPED_EVENTS.get() {
        c.inc();
    }
}

#[inline]
pub fn record_command(command: &str) {
    if let Some(c) = COMMAND_COUNTER.get() {
        c.with_label_values(&[command]).inc();
    }
}

#[inline]
pub fn record_command_error(command: &str, error: &str) {
    if let Some(c) = COMMAND_ERRORS.get() {
        c.with_label_values(&[command, error]).inc();
    }
}

#[inline]
pub fn set_locked_threads(count: usize) {
    if let Some(g) = LOCKED_THREADS.get() {
        g.set(count as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_lifecycle() {
        init();
        init();

        record_command("nicklock_on");
        record_correction("nickname");
        set_locked_threads(2);

        let output = gather_metrics();
        assert!(output.contains("nickwarden_commands_total"));
        assert!(output.contains("nickwarden_corrections_total"));
        assert!(output.contains("nickwarden_locked_threads 2"));
    }
}
