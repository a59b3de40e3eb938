// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Publish/subscribe transport interface and the in-process hub.
//!
//! The core never talks to a broker directly; it goes through [`Topic`]:
//! publish a descriptor, subscribe to receive every published descriptor
//! tagged with whether it originated on this node, unsubscribe on stop.
//! Cluster membership, delivery guarantees, and serialization belong to the
//! transport implementation.
//!
//! [`LocalHub`] is the bundled implementation: a single-process hub where
//! each simulated node gets its own [`LocalTopic`] handle. Publishing
//! delivers the descriptor to every subscriber on every node of the hub,
//! marking `from_local_node` by node identity. It backs the integration
//! tests and standalone single-process use; a real broker is integrated by
//! implementing [`Topic`] over its client.
//!
//! Delivery into a subscription is a non-blocking channel send; a
//! subscriber that has gone away is pruned on the next publish.

use crate::call::CallDescriptor;
use crate::error::{ProxyError, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Opaque subscription handle, valid for the topic that issued it.
pub type SubscriptionId = u64;

/// One delivered descriptor, tagged with its origin.
#[derive(Debug)]
pub struct Envelope {
    pub call: CallDescriptor,
    /// True when this node published the message (loopback delivery).
    pub from_local_node: bool,
}

/// An active subscription: the handle plus the delivery channel.
pub struct Subscription {
    pub id: SubscriptionId,
    pub receiver: mpsc::UnboundedReceiver<Envelope>,
}

/// A named pub/sub topic as seen from one node.
pub trait Topic: Send + Sync + 'static {
    /// Topic name, for logging and error context.
    fn name(&self) -> &str;

    /// Publish a descriptor to every subscriber, including this node's.
    ///
    /// Errors are fatal to the originating call (see `error` module docs).
    fn publish(&self, call: CallDescriptor) -> Result<()>;

    /// Subscribe this node to the topic.
    fn subscribe(&self) -> Result<Subscription>;

    /// Cancel a subscription. Unknown handles are ignored.
    fn unsubscribe(&self, id: SubscriptionId);
}

struct Subscriber {
    id: SubscriptionId,
    node_id: String,
    sender: mpsc::UnboundedSender<Envelope>,
}

#[derive(Default)]
struct TopicState {
    subscribers: Vec<Subscriber>,
}

/// In-process hub simulating a cluster of nodes sharing topics.
///
/// # Example
///
/// ```rust
/// use call_replication::transport::{LocalHub, Topic};
/// use call_replication::call::CallDescriptor;
///
/// let hub = LocalHub::new();
/// let topic_a = hub.topic("node-a", "calls");
/// let topic_b = hub.topic("node-b", "calls");
///
/// let mut sub_b = topic_b.subscribe().unwrap();
/// topic_a.publish(CallDescriptor::new("obj", "poke", vec![], true)).unwrap();
///
/// let envelope = sub_b.receiver.try_recv().unwrap();
/// assert!(!envelope.from_local_node);
/// ```
pub struct LocalHub {
    topics: Mutex<HashMap<String, TopicState>>,
    next_subscription: AtomicU64,
}

impl LocalHub {
    /// Create an empty hub.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            topics: Mutex::new(HashMap::new()),
            next_subscription: AtomicU64::new(1),
        })
    }

    /// Get a node's handle on a named topic.
    ///
    /// Handles for the same name share subscribers; `node_id` determines
    /// the `from_local_node` tag on deliveries.
    pub fn topic(self: &Arc<Self>, node_id: impl Into<String>, name: impl Into<String>) -> LocalTopic {
        LocalTopic {
            hub: Arc::clone(self),
            node_id: node_id.into(),
            name: name.into(),
        }
    }
}

/// One node's handle on a [`LocalHub`] topic.
pub struct LocalTopic {
    hub: Arc<LocalHub>,
    node_id: String,
    name: String,
}

impl LocalTopic {
    /// The node identity this handle publishes and subscribes as.
    pub fn node_id(&self) -> &str {
        &self.node_id
    }
}

impl Topic for LocalTopic {
    fn name(&self) -> &str {
        &self.name
    }

    fn publish(&self, call: CallDescriptor) -> Result<()> {
        let mut topics = self
            .hub
            .topics
            .lock()
            .map_err(|_| ProxyError::publish(&self.name, "hub lock poisoned"))?;
        let state = topics.entry(self.name.clone()).or_default();

        // Prune subscribers whose receiver has been dropped.
        state.subscribers.retain(|subscriber| {
            subscriber
                .sender
                .send(Envelope {
                    call: call.clone(),
                    from_local_node: subscriber.node_id == self.node_id,
                })
                .is_ok()
        });

        Ok(())
    }

    fn subscribe(&self) -> Result<Subscription> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = self.hub.next_subscription.fetch_add(1, Ordering::Relaxed);

        let mut topics = self
            .hub
            .topics
            .lock()
            .map_err(|_| ProxyError::Internal("hub lock poisoned".to_string()))?;
        topics
            .entry(self.name.clone())
            .or_default()
            .subscribers
            .push(Subscriber {
                id,
                node_id: self.node_id.clone(),
                sender,
            });

        Ok(Subscription { id, receiver })
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        if let Ok(mut topics) = self.hub.topics.lock() {
            if let Some(state) = topics.get_mut(&self.name) {
                state.subscribers.retain(|subscriber| subscriber.id != id);
            }
        }
    }
}
