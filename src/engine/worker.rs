//! Worker loop: asynchronous replay of queued call descriptors.
//!
//! One worker task per engine drains the pending FIFO queue and re-invokes
//! each call on the locally resolved object. The loop is the only consumer
//! of the queue, so per-node replay order equals enqueue order.
//!
//! # Graceful Shutdown
//!
//! The loop waits on the queue inside a `tokio::select!` with a biased
//! shutdown arm, so a stop request wakes it immediately without a poll
//! interval. At most the invocation already in flight completes after a
//! stop request; no descriptor is ever re-queued.
//!
//! # Failure Isolation
//!
//! Everything that can go wrong with a single descriptor (unresolvable
//! reference, unknown signature, argument decode failure, the target method
//! failing) is logged with full context and the descriptor is dropped. One
//! bad descriptor never halts replication of subsequent ones. Return
//! values are discarded by construction: this path exists to replay side
//! effects.

use crate::call::CallDescriptor;
use crate::error::ProxyError;
use crate::metrics;
use crate::registry::MethodRegistry;
use crate::resolver::ReferenceResolver;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, Instrument};

/// Run the replay worker until shutdown is signaled or the queue closes.
pub(crate) async fn run_worker<O, R>(
    topic_name: String,
    node_id: String,
    registry: Arc<MethodRegistry<O>>,
    resolver: Arc<R>,
    mut queue_rx: mpsc::UnboundedReceiver<CallDescriptor>,
    mut shutdown_rx: watch::Receiver<bool>,
    queue_depth: Arc<AtomicUsize>,
) where
    O: Send + Sync + 'static,
    R: ReferenceResolver<O>,
{
    let span = tracing::info_span!("replay_worker", topic = %topic_name, node_id = %node_id);

    async move {
        info!("Started");

        loop {
            tokio::select! {
                biased;

                // A dropped sender means the engine is gone; treat it like
                // a stop request instead of letting this arm stay ready
                // and starve the queue.
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }

                maybe_call = queue_rx.recv() => {
                    match maybe_call {
                        Some(call) => {
                            let depth = queue_depth
                                .fetch_sub(1, Ordering::SeqCst)
                                .saturating_sub(1);
                            metrics::set_queue_depth(&topic_name, depth);
                            replay(&topic_name, &registry, resolver.as_ref(), call);
                        }
                        // All senders gone: the listener stopped first.
                        None => break,
                    }
                }
            }
        }

        info!("Stopped");
    }
    .instrument(span)
    .await
}

/// Replay one descriptor, discarding its return value.
fn replay<O, R>(
    topic_name: &str,
    registry: &MethodRegistry<O>,
    resolver: &R,
    call: CallDescriptor,
) where
    O: Send + Sync + 'static,
    R: ReferenceResolver<O>,
{
    let Some(object) = resolver.resolve_object(&call.object_reference) else {
        // Expected when nodes hold disjoint subsets of replicated objects.
        let err = ProxyError::UnresolvedObject(call.object_reference.clone());
        error!(
            method = %call.method,
            error = %err,
            "Dropping descriptor"
        );
        metrics::record_unresolved(topic_name);
        return;
    };

    debug!(
        object_reference = %call.object_reference,
        method = %call.method,
        arguments = %serde_json::Value::Array(call.arguments.clone()),
        "Replaying call"
    );

    let start = Instant::now();
    match registry.invoke(&object, &call.method, &call.arguments) {
        Ok(_) => {
            metrics::record_replay(topic_name, true, start.elapsed());
        }
        Err(e) => {
            error!(
                object_reference = %call.object_reference,
                method = %call.method,
                arguments = %serde_json::Value::Array(call.arguments.clone()),
                error = %e,
                "Failed to replay call, dropping descriptor"
            );
            metrics::record_replay(topic_name, false, start.elapsed());
        }
    }
}
