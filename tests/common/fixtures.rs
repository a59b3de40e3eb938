// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use call_replication::registry::arg;
use call_replication::transport::{Subscription, Topic};
use call_replication::{
    CallDescriptor, ExecutionEngine, LocalHub, MapResolver, MethodRegistry, ProxyConfig,
    ProxyError, ReplicatingProxy, Result,
};
use serde_json::json;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Install a log subscriber routing to the test writer.
///
/// Idempotent; every fixture constructor calls it so failing tests print
/// their trace output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Shared object under replication in the tests.
///
/// Keeps a journal of applied operations so FIFO ordering can be asserted.
pub struct Counter {
    value: AtomicI64,
    journal: Mutex<Vec<String>>,
}

impl Counter {
    pub fn new(initial: i64) -> Self {
        Self {
            value: AtomicI64::new(initial),
            journal: Mutex::new(Vec::new()),
        }
    }

    pub fn value(&self) -> i64 {
        self.value.load(Ordering::SeqCst)
    }

    pub fn journal(&self) -> Vec<String> {
        self.journal.lock().unwrap().clone()
    }

    fn record(&self, entry: String) {
        self.journal.lock().unwrap().push(entry);
    }
}

/// Registry shared by every test node.
///
/// `set_value` and `add` are procedures; `get_value` and `add_and_get`
/// return values.
pub fn counter_registry() -> Arc<MethodRegistry<Counter>> {
    Arc::new(
        MethodRegistry::builder()
            .procedure("set_value", 1, |c: &Counter, args| {
                let v: i64 = arg("set_value", args, 0)?;
                c.value.store(v, Ordering::SeqCst);
                c.record(format!("set_value({v})"));
                Ok(())
            })
            .procedure("add", 1, |c: &Counter, args| {
                let v: i64 = arg("add", args, 0)?;
                c.value.fetch_add(v, Ordering::SeqCst);
                c.record(format!("add({v})"));
                Ok(())
            })
            .returning("get_value", 0, |c: &Counter, _args| {
                Ok(json!(c.value.load(Ordering::SeqCst)))
            })
            .returning("add_and_get", 1, |c: &Counter, args| {
                let v: i64 = arg("add_and_get", args, 0)?;
                let new = c.value.fetch_add(v, Ordering::SeqCst) + v;
                c.record(format!("add_and_get({v})"));
                Ok(json!(new))
            })
            .build()
            .expect("counter registry"),
    )
}

/// Typed wrapper closing over the string-based proxy surface.
pub struct CounterHandle {
    proxy: ReplicatingProxy<Counter, MapResolver<Counter>>,
}

impl CounterHandle {
    pub fn new(proxy: ReplicatingProxy<Counter, MapResolver<Counter>>) -> Self {
        Self { proxy }
    }

    pub fn set_value(&self, value: i64) -> Result<()> {
        self.proxy.call("set_value", vec![json!(value)])?;
        Ok(())
    }

    pub fn add(&self, value: i64) -> Result<()> {
        self.proxy.call("add", vec![json!(value)])?;
        Ok(())
    }

    pub fn get_value(&self) -> Result<Option<i64>> {
        let result = self.proxy.call("get_value", vec![])?;
        Ok(result.and_then(|v| v.as_i64()))
    }

    pub fn add_and_get(&self, value: i64) -> Result<Option<i64>> {
        let result = self.proxy.call("add_and_get", vec![json!(value)])?;
        Ok(result.and_then(|v| v.as_i64()))
    }

    pub fn set_return_value(&self, return_value: bool) {
        self.proxy.set_return_value(return_value);
    }

    /// The untyped proxy underneath, for calls the handle does not cover.
    pub fn proxy(&self) -> &ReplicatingProxy<Counter, MapResolver<Counter>> {
        &self.proxy
    }
}

/// One simulated cluster node: resolver, engine, and proxy wiring over a
/// shared [`LocalHub`].
pub struct TestNode {
    pub config: ProxyConfig,
    pub resolver: Arc<MapResolver<Counter>>,
    pub registry: Arc<MethodRegistry<Counter>>,
    pub engine: ExecutionEngine<Counter, MapResolver<Counter>>,
    topic: Arc<dyn Topic>,
}

impl TestNode {
    pub fn new(hub: &Arc<LocalHub>, node_id: &str) -> Self {
        init_tracing();
        let config = ProxyConfig::for_testing(node_id);
        let resolver = Arc::new(MapResolver::new());
        let registry = counter_registry();
        let topic: Arc<dyn Topic> = Arc::new(hub.topic(&config.node_id, &config.topic));
        let engine = ExecutionEngine::new(
            config.clone(),
            Arc::clone(&topic),
            Arc::clone(&registry),
            Arc::clone(&resolver),
        );
        Self {
            config,
            resolver,
            registry,
            engine,
            topic,
        }
    }

    /// Register a counter under `reference` and return it.
    pub fn register_counter(&self, reference: &str, initial: i64) -> Arc<Counter> {
        self.resolver.register(reference, Counter::new(initial))
    }

    /// Build a proxy handle for an already registered counter.
    pub fn handle(&self, counter: Arc<Counter>) -> CounterHandle {
        CounterHandle::new(ReplicatingProxy::new(
            counter,
            Arc::clone(&self.registry),
            Arc::clone(&self.resolver),
            Arc::clone(&self.topic),
            &self.config,
        ))
    }
}

/// A topic whose publish always fails. Subscriptions yield nothing.
pub struct FailingTopic;

impl Topic for FailingTopic {
    fn name(&self) -> &str {
        "failing-topic"
    }

    fn publish(&self, _call: CallDescriptor) -> Result<()> {
        Err(ProxyError::publish("failing-topic", "broker unavailable"))
    }

    fn subscribe(&self) -> Result<Subscription> {
        Err(ProxyError::publish("failing-topic", "broker unavailable"))
    }

    fn unsubscribe(&self, _id: u64) {}
}

/// Poll `condition` until it holds or five seconds elapse.
pub async fn wait_for<F: Fn() -> bool>(condition: F) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met within timeout");
}
