//! Engine state types.
//!
//! The execution engine has a deliberately small lifecycle: unlike a
//! connection-oriented service there is nothing to connect to, so there is
//! no intermediate state between created and running.
//!
//! # State Transitions
//!
//! ```text
//!            start()                 stop()
//! Created ────────────→ Running ────────────→ Stopped
//!                          ↑                     │
//!                          └───────start()───────┘
//! ```
//!
//! `start()` on a running engine is a no-op; `stop()` on anything but a
//! running engine is a no-op. A stopped engine may be started again, which
//! re-subscribes and spawns a fresh listener/worker pair.

/// State of the execution engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Engine created but not started. No subscription, no worker.
    Created,

    /// Subscribed to the topic; listener and worker tasks running.
    Running,

    /// Stopped after a graceful drain. May be started again.
    Stopped,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineState::Created => write!(f, "Created"),
            EngineState::Running => write!(f, "Running"),
            EngineState::Stopped => write!(f, "Stopped"),
        }
    }
}
