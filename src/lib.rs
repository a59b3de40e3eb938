//! # Call Replication
//!
//! Best-effort replication of side-effecting method calls across the nodes
//! of a cluster, over a pub/sub topic.
//!
//! ## Architecture
//!
//! Each node runs the same pipeline. Calls enter through a
//! [`ReplicatingProxy`] wrapping a shared object; an [`ExecutionEngine`]
//! replays calls received from peers:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────────┐
//! │                            call-replication                           │
//! │                                                                       │
//! │  caller ──► ReplicatingProxy ──► MethodRegistry (local invoke)        │
//! │                   │                                                   │
//! │                   ▼                                                   │
//! │             Topic::publish ═══════════ pub/sub ═══════════╗           │
//! │                                                            ▼          │
//! │  ┌──────────────────────────── ExecutionEngine ─────────────────────┐ │
//! │  │ listener (loopback filter) ──► FIFO queue ──► replay worker      │ │
//! │  │                                               │                  │ │
//! │  │                          ReferenceResolver ◄──┘ (lookup target)  │ │
//! │  └───────────────────────────────────────────────────────────────── ┘ │
//! └───────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Routing
//!
//! Interception splits each call on two axes, decided by [`policy`]:
//! whether the call runs locally right away, and whether peers that see
//! their own published message should replay it (`execute_everywhere`).
//! Procedures replicate; value-returning methods run locally only when
//! return values are enabled.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use call_replication::{
//!     ExecutionEngine, MapResolver, MethodRegistry, ProxyConfig, ReplicatingProxy,
//! };
//! use call_replication::transport::LocalHub;
//! use std::sync::Arc;
//!
//! struct Light;
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = Arc::new(
//!         MethodRegistry::builder()
//!             .procedure("turn_on", 0, |_light: &Light, _args| Ok(()))
//!             .build()
//!             .expect("valid registry"),
//!     );
//!     let resolver = Arc::new(MapResolver::new());
//!     let light = resolver.register("light.kitchen", Light);
//!
//!     let config = ProxyConfig::default();
//!     let hub = LocalHub::new();
//!     let topic = Arc::new(hub.topic(&config.node_id, &config.topic));
//!
//!     let engine = ExecutionEngine::new(
//!         config.clone(),
//!         topic.clone(),
//!         Arc::clone(&registry),
//!         Arc::clone(&resolver),
//!     );
//!     engine.start().await.expect("engine start");
//!
//!     let proxy = ReplicatingProxy::new(light, registry, resolver, topic, &config);
//!     proxy.call("turn_on", vec![]).expect("call");
//!
//!     engine.stop().await;
//! }
//! ```

pub mod call;
pub mod config;
pub mod debounce;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod metrics;
pub mod policy;
pub mod proxy;
pub mod registry;
pub mod resolver;
pub mod transport;

// Re-exports for convenience
pub use call::CallDescriptor;
pub use config::{ProxyConfig, WorkerConfig};
pub use debounce::Debouncer;
pub use engine::{EngineState, ExecutionEngine};
pub use error::{ProxyError, Result};
pub use lifecycle::{Component, LifecycleHandler};
pub use proxy::ReplicatingProxy;
pub use registry::MethodRegistry;
pub use resolver::{MapResolver, ReferenceResolver};
pub use transport::{LocalHub, Topic};
