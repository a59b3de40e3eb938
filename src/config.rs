//! Configuration for the call replication proxy.
//!
//! Constructed programmatically or deserialized from YAML/JSON and passed to
//! [`ExecutionEngine::new()`](crate::engine::ExecutionEngine) and
//! [`ReplicatingProxy`](crate::proxy::ReplicatingProxy).
//!
//! # Quick Start
//!
//! ```rust
//! use call_replication::config::ProxyConfig;
//!
//! let config = ProxyConfig {
//!     node_id: "node-1".into(),
//!     topic: "counter-calls".into(),
//!     ..Default::default()
//! };
//! assert!(config.return_value);
//! ```
//!
//! # YAML Example
//!
//! ```yaml
//! node_id: "uk.node.london-1"
//! topic: "counter-calls"
//! return_value: true
//!
//! worker:
//!   drain_timeout_ms: 10000
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration for one proxy/engine pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Identity of the local node, used for logging and tracing spans.
    pub node_id: String,

    /// Topic the descriptors are published on. One topic per replicated
    /// interface keeps registries aligned across nodes.
    pub topic: String,

    /// Whether non-void calls are executed synchronously on the local
    /// object and their real result returned to the caller.
    #[serde(default = "default_true")]
    pub return_value: bool,

    /// Worker loop settings.
    #[serde(default)]
    pub worker: WorkerConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            node_id: "local.dev.node.default".to_string(),
            topic: "method-calls".to_string(),
            return_value: true,
            worker: WorkerConfig::default(),
        }
    }
}

impl ProxyConfig {
    /// Create a minimal config for testing.
    pub fn for_testing(node_id: &str) -> Self {
        Self {
            node_id: node_id.to_string(),
            topic: "test-calls".to_string(),
            return_value: true,
            worker: WorkerConfig::default(),
        }
    }
}

/// Settings for the asynchronous execution worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// How long `stop()` waits for the listener and worker tasks to drain
    /// before giving up on them. An in-flight invocation is never
    /// interrupted; a timeout only abandons the join.
    #[serde(default = "default_drain_timeout_ms")]
    pub drain_timeout_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_drain_timeout_ms() -> u64 {
    10_000
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            drain_timeout_ms: default_drain_timeout_ms(),
        }
    }
}

impl WorkerConfig {
    /// Drain timeout as a [`Duration`].
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }
}
