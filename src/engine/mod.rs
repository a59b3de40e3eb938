// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Loopback filter and asynchronous execution engine.
//!
//! The engine owns the receive side of replication on one node:
//! - a listener task drains the topic subscription, applies the loopback
//!   filter, and enqueues surviving descriptors without ever blocking the
//!   delivery path;
//! - a single worker task (see [`worker`]) replays queued descriptors in
//!   FIFO order.
//!
//! # Loopback Filter
//!
//! Per received descriptor `d`: when `d.execute_everywhere` is false and the
//! message originated on this node, the call already executed synchronously
//! at interception time, so the delivery is dropped. Everything else is
//! enqueued.
//!
//! # Lifecycle
//!
//! `start()` subscribes to the topic and spawns the listener/worker pair;
//! it is idempotent while running. `stop()` is cooperative: it flips the
//! shutdown flag, joins both tasks with a bounded drain timeout, and
//! unsubscribes. An in-flight invocation is never interrupted. A stopped
//! engine may be started again.

mod types;
mod worker;

pub use types::EngineState;

use crate::call::CallDescriptor;
use crate::config::ProxyConfig;
use crate::error::Result;
use crate::lifecycle::{BoxFuture, Component};
use crate::metrics;
use crate::registry::MethodRegistry;
use crate::resolver::ReferenceResolver;
use crate::transport::{Envelope, SubscriptionId, Topic};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, info, warn, Instrument};

/// Handles held while the engine is running.
struct Running {
    shutdown_tx: watch::Sender<bool>,
    subscription_id: SubscriptionId,
    handles: Vec<tokio::task::JoinHandle<()>>,
}

/// Per-node receive pipeline for one topic: loopback filter, pending
/// queue, replay worker.
///
/// Shares the registry and resolver with the node's
/// [`ReplicatingProxy`](crate::proxy::ReplicatingProxy) instances.
pub struct ExecutionEngine<O, R: ReferenceResolver<O>> {
    config: ProxyConfig,
    topic: Arc<dyn Topic>,
    registry: Arc<MethodRegistry<O>>,
    resolver: Arc<R>,
    state_tx: watch::Sender<EngineState>,
    state_rx: watch::Receiver<EngineState>,
    running: Mutex<Option<Running>>,
    queue_depth: Arc<AtomicUsize>,
}

impl<O, R> ExecutionEngine<O, R>
where
    O: Send + Sync + 'static,
    R: ReferenceResolver<O>,
{
    /// Create an engine in the `Created` state.
    pub fn new(
        config: ProxyConfig,
        topic: Arc<dyn Topic>,
        registry: Arc<MethodRegistry<O>>,
        resolver: Arc<R>,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(EngineState::Created);
        Self {
            config,
            topic,
            registry,
            resolver,
            state_tx,
            state_rx,
            running: Mutex::new(None),
            queue_depth: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Current engine state.
    pub fn state(&self) -> EngineState {
        *self.state_rx.borrow()
    }

    /// Get a receiver to watch state changes.
    pub fn state_receiver(&self) -> watch::Receiver<EngineState> {
        self.state_rx.clone()
    }

    /// Check if the engine is running.
    pub fn is_running(&self) -> bool {
        matches!(self.state(), EngineState::Running)
    }

    /// Number of descriptors waiting for the worker.
    pub fn queue_depth(&self) -> usize {
        self.queue_depth.load(Ordering::SeqCst)
    }

    /// The node identity this engine runs under.
    pub fn node_id(&self) -> &str {
        &self.config.node_id
    }

    /// Subscribe to the topic and start the listener/worker pair.
    ///
    /// Idempotent: a second `start()` while running is a no-op.
    pub async fn start(&self) -> Result<()> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            debug!(topic = %self.topic.name(), "Engine already running");
            return Ok(());
        }

        info!(
            node_id = %self.config.node_id,
            topic = %self.topic.name(),
            "Starting execution engine"
        );

        let subscription = self.topic.subscribe()?;
        let subscription_id = subscription.id;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();

        let listener = tokio::spawn(run_listener(
            self.topic.name().to_string(),
            self.config.node_id.clone(),
            subscription.receiver,
            queue_tx,
            shutdown_rx.clone(),
            Arc::clone(&self.queue_depth),
        ));

        let worker = tokio::spawn(worker::run_worker(
            self.topic.name().to_string(),
            self.config.node_id.clone(),
            Arc::clone(&self.registry),
            Arc::clone(&self.resolver),
            queue_rx,
            shutdown_rx,
            Arc::clone(&self.queue_depth),
        ));

        *running = Some(Running {
            shutdown_tx,
            subscription_id,
            handles: vec![listener, worker],
        });

        let _ = self.state_tx.send(EngineState::Running);
        metrics::set_engine_state("Running");
        info!(topic = %self.topic.name(), "Execution engine running");

        Ok(())
    }

    /// Stop the engine cooperatively.
    ///
    /// Signals shutdown, joins the listener and worker with the configured
    /// drain timeout, then unsubscribes. No-op unless running.
    pub async fn stop(&self) {
        let Some(running) = self.running.lock().await.take() else {
            return;
        };

        info!(topic = %self.topic.name(), "Stopping execution engine");
        let _ = running.shutdown_tx.send(true);

        let drain_timeout = self.config.worker.drain_timeout();
        for (i, handle) in running.handles.into_iter().enumerate() {
            match tokio::time::timeout(drain_timeout, handle).await {
                Ok(Ok(())) => {
                    debug!(task = i + 1, "Task completed gracefully");
                }
                Ok(Err(e)) => {
                    warn!(task = i + 1, error = %e, "Task panicked during shutdown");
                }
                Err(_) => {
                    warn!(task = i + 1, "Task timed out during shutdown");
                }
            }
        }

        self.topic.unsubscribe(running.subscription_id);

        let _ = self.state_tx.send(EngineState::Stopped);
        metrics::set_engine_state("Stopped");
        info!(topic = %self.topic.name(), "Execution engine stopped");
    }
}

impl<O, R> Component for ExecutionEngine<O, R>
where
    O: Send + Sync + 'static,
    R: ReferenceResolver<O>,
{
    fn name(&self) -> &str {
        self.topic.name()
    }

    fn on_start(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(self.start())
    }

    fn on_stop(&self) -> BoxFuture<'_, ()> {
        Box::pin(self.stop())
    }
}

/// Drain the subscription, filter loopback deliveries, enqueue the rest.
///
/// The enqueue is an unbounded channel send: the delivery path never
/// blocks on invocation.
async fn run_listener(
    topic_name: String,
    node_id: String,
    mut subscription_rx: mpsc::UnboundedReceiver<Envelope>,
    queue_tx: mpsc::UnboundedSender<CallDescriptor>,
    mut shutdown_rx: watch::Receiver<bool>,
    queue_depth: Arc<AtomicUsize>,
) {
    let span = tracing::info_span!("delivery_listener", topic = %topic_name, node_id = %node_id);

    async move {
        info!("Started");

        loop {
            tokio::select! {
                biased;

                // A dropped sender means the engine is gone; treat it like
                // a stop request instead of letting this arm stay ready
                // and starve the subscription.
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }

                maybe_envelope = subscription_rx.recv() => {
                    match maybe_envelope {
                        Some(envelope) => {
                            // Loopback filter: already executed synchronously
                            // at interception time on this node.
                            if !envelope.call.execute_everywhere && envelope.from_local_node {
                                debug!(
                                    object_reference = %envelope.call.object_reference,
                                    method = %envelope.call.method,
                                    "Dropping own message, call already executed locally"
                                );
                                metrics::record_loopback_dropped(&topic_name);
                                continue;
                            }

                            let depth = queue_depth.fetch_add(1, Ordering::SeqCst) + 1;
                            metrics::set_queue_depth(&topic_name, depth);
                            metrics::record_enqueued(&topic_name);

                            if queue_tx.send(envelope.call).is_err() {
                                // Worker gone; nothing left to enqueue for.
                                break;
                            }
                        }
                        None => {
                            debug!("Subscription closed");
                            break;
                        }
                    }
                }
            }
        }

        info!("Stopped");
    }
    .instrument(span)
    .await
}
