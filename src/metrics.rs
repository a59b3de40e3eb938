//! Metrics for observability.
//!
//! Exports Prometheus-compatible metrics for:
//! - Call interception and routing (bypass / synchronous / published)
//! - Loopback filtering
//! - Worker queue depth and replay outcomes
//! - Engine lifecycle state
//!
//! # Metric Naming Convention
//!
//! All metrics are prefixed with `call_replication_` and follow Prometheus
//! conventions: counters end in `_total`, gauges represent current state,
//! histograms track distributions.
//!
//! # Usage
//!
//! ```rust,no_run
//! use call_replication::metrics;
//! use std::time::Duration;
//!
//! // In the facade after publishing
//! metrics::record_published("counter-calls");
//!
//! // In the worker after replaying a descriptor
//! metrics::record_replay("counter-calls", true, Duration::from_micros(80));
//! ```

use metrics::{counter, gauge, histogram};
use std::time::Duration;

/// Record an intercepted facade call.
pub fn record_intercepted(topic: &str) {
    counter!("call_replication_calls_intercepted_total", "topic" => topic.to_string()).increment(1);
}

/// Record a bypassed call (object not under replication).
pub fn record_bypass(topic: &str) {
    counter!("call_replication_calls_bypassed_total", "topic" => topic.to_string()).increment(1);
}

/// Record a synchronous local invocation (return-value policy case).
pub fn record_local_invocation(topic: &str) {
    counter!("call_replication_calls_local_total", "topic" => topic.to_string()).increment(1);
}

/// Record a successfully published descriptor.
pub fn record_published(topic: &str) {
    counter!("call_replication_calls_published_total", "topic" => topic.to_string()).increment(1);
}

/// Record a publish failure (surfaced to the caller).
pub fn record_publish_failure(topic: &str) {
    counter!("call_replication_publish_failures_total", "topic" => topic.to_string()).increment(1);
}

/// Record a loopback delivery dropped by the filter.
pub fn record_loopback_dropped(topic: &str) {
    counter!("call_replication_loopback_dropped_total", "topic" => topic.to_string()).increment(1);
}

/// Record a descriptor enqueued for asynchronous replay.
pub fn record_enqueued(topic: &str) {
    counter!("call_replication_descriptors_enqueued_total", "topic" => topic.to_string()).increment(1);
}

/// Record the pending queue depth.
pub fn set_queue_depth(topic: &str, depth: usize) {
    gauge!("call_replication_queue_depth", "topic" => topic.to_string()).set(depth as f64);
}

/// Record the outcome and latency of one replayed descriptor.
pub fn record_replay(topic: &str, success: bool, duration: Duration) {
    let status = if success { "success" } else { "failure" };
    counter!("call_replication_replays_total", "topic" => topic.to_string(), "status" => status)
        .increment(1);
    histogram!("call_replication_replay_duration_seconds", "topic" => topic.to_string())
        .record(duration.as_secs_f64());
}

/// Record a descriptor dropped because its reference did not resolve.
pub fn record_unresolved(topic: &str) {
    counter!("call_replication_unresolved_references_total", "topic" => topic.to_string())
        .increment(1);
}

/// Record the engine lifecycle state.
pub fn set_engine_state(state: &str) {
    gauge!("call_replication_engine_state", "state" => state.to_string()).set(1.0);
}
