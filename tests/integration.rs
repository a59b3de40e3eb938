// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Integration tests for the call replication pipeline.
//!
//! Tests run entirely in-process over a `LocalHub`, with one `TestNode`
//! per simulated cluster member.
//!
//! # Test Organization
//! - `replication_*` - end-to-end call interception and replay
//! - `policy_*` - synchronous vs asynchronous routing
//! - `engine_*` - receive-side lifecycle and robustness
//! - `lifecycle_*` - engine under the lifecycle handler

mod common;

use call_replication::{Component, LifecycleHandler, LocalHub, ProxyError, ReplicatingProxy};
use common::{counter_registry, wait_for, Counter, CounterHandle, FailingTopic, TestNode};
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// Replication Tests
// =============================================================================

#[tokio::test]
async fn replication_procedure_reaches_every_node() {
    let hub = LocalHub::new();
    let node_a = TestNode::new(&hub, "node-a");
    let node_b = TestNode::new(&hub, "node-b");
    let node_c = TestNode::new(&hub, "node-c");

    let counter_a = node_a.register_counter("counter.shared", 0);
    let counter_b = node_b.register_counter("counter.shared", 0);
    let counter_c = node_c.register_counter("counter.shared", 0);

    node_a.engine.start().await.unwrap();
    node_b.engine.start().await.unwrap();
    node_c.engine.start().await.unwrap();

    let handle = node_a.handle(Arc::clone(&counter_a));
    handle.set_value(5).unwrap();

    wait_for(|| counter_a.value() == 5 && counter_b.value() == 5 && counter_c.value() == 5).await;

    // The originator replayed its own message exactly once.
    assert_eq!(counter_a.journal(), vec!["set_value(5)"]);
    assert_eq!(counter_b.journal(), vec!["set_value(5)"]);

    node_a.engine.stop().await;
    node_b.engine.stop().await;
    node_c.engine.stop().await;
}

#[tokio::test]
async fn replication_preserves_call_order() {
    let hub = LocalHub::new();
    let node_a = TestNode::new(&hub, "node-a");
    let node_b = TestNode::new(&hub, "node-b");

    let counter_a = node_a.register_counter("counter.shared", 0);
    let counter_b = node_b.register_counter("counter.shared", 0);

    node_b.engine.start().await.unwrap();

    let handle = node_a.handle(Arc::clone(&counter_a));
    let mut expected = Vec::new();
    for i in 0..50 {
        handle.set_value(i).unwrap();
        handle.add(1).unwrap();
        expected.push(format!("set_value({i})"));
        expected.push("add(1)".to_string());
    }

    wait_for(|| counter_b.journal().len() == expected.len()).await;
    assert_eq!(counter_b.journal(), expected);
    assert_eq!(counter_b.value(), 50);

    node_b.engine.stop().await;
}

#[tokio::test]
async fn replication_skips_unreplicated_target() {
    let hub = LocalHub::new();
    let node_a = TestNode::new(&hub, "node-a");
    let node_b = TestNode::new(&hub, "node-b");

    let counter_b = node_b.register_counter("counter.shared", 0);
    node_b.engine.start().await.unwrap();

    // Not registered with node A's resolver, so calls bypass replication.
    let local_only = Arc::new(Counter::new(0));
    let handle = node_a.handle(Arc::clone(&local_only));

    handle.set_value(7).unwrap();
    assert_eq!(local_only.value(), 7);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(counter_b.value(), 0);

    node_b.engine.stop().await;
}

#[tokio::test]
async fn replication_survives_node_without_the_object() {
    let hub = LocalHub::new();
    let node_a = TestNode::new(&hub, "node-a");
    let node_b = TestNode::new(&hub, "node-b");

    let counter_a = node_a.register_counter("counter.only-on-a", 0);
    let counter_b = node_b.register_counter("counter.shared", 0);

    node_b.engine.start().await.unwrap();

    // Node B cannot resolve this reference; the delivery is dropped.
    node_a.handle(Arc::clone(&counter_a)).set_value(3).unwrap();

    // A later resolvable call still replays, so the worker kept going.
    let counter_a_shared = node_a.register_counter("counter.shared", 0);
    node_a
        .handle(Arc::clone(&counter_a_shared))
        .set_value(9)
        .unwrap();

    wait_for(|| counter_b.value() == 9).await;
    node_b.engine.stop().await;
}

#[tokio::test]
async fn replication_publish_failure_is_fatal_to_the_caller() {
    let resolver = Arc::new(call_replication::MapResolver::new());
    let counter = resolver.register("counter.shared", Counter::new(0));
    let config = call_replication::ProxyConfig::for_testing("node-a");

    let proxy = ReplicatingProxy::new(
        counter,
        counter_registry(),
        resolver,
        Arc::new(FailingTopic),
        &config,
    );
    let handle = CounterHandle::new(proxy);

    match handle.set_value(1) {
        Err(ProxyError::Publish { topic, .. }) => assert_eq!(topic, "failing-topic"),
        other => panic!("expected publish error, got {other:?}"),
    }
}

#[tokio::test]
async fn replication_unknown_method_fails_before_publishing() {
    let hub = LocalHub::new();
    let node_a = TestNode::new(&hub, "node-a");
    let node_b = TestNode::new(&hub, "node-b");

    let counter_a = node_a.register_counter("counter.shared", 0);
    let counter_b = node_b.register_counter("counter.shared", 0);
    node_b.engine.start().await.unwrap();

    let handle = node_a.handle(Arc::clone(&counter_a));
    // Wrong arity for a known name is an unknown signature.
    let err = handle
        .proxy()
        .call("set_value", vec![])
        .expect_err("arity mismatch");
    assert!(matches!(err, ProxyError::UnknownMethod { arity: 0, .. }));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(counter_b.journal().is_empty());

    node_b.engine.stop().await;
}

// =============================================================================
// Policy Tests
// =============================================================================

#[tokio::test]
async fn policy_returning_method_executes_synchronously() {
    let hub = LocalHub::new();
    let node_a = TestNode::new(&hub, "node-a");
    let node_b = TestNode::new(&hub, "node-b");

    let counter_a = node_a.register_counter("counter.shared", 10);
    let counter_b = node_b.register_counter("counter.shared", 10);

    node_a.engine.start().await.unwrap();
    node_b.engine.start().await.unwrap();

    let handle = node_a.handle(Arc::clone(&counter_a));

    // Caller observes the result immediately; peers replay the same call.
    assert_eq!(handle.add_and_get(5).unwrap(), Some(15));
    assert_eq!(counter_a.value(), 15);

    wait_for(|| counter_b.value() == 15).await;

    // No loopback replay on the originator.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(counter_a.journal(), vec!["add_and_get(5)"]);

    node_a.engine.stop().await;
    node_b.engine.stop().await;
}

#[tokio::test]
async fn policy_disabled_returns_nothing_and_replays_everywhere() {
    let hub = LocalHub::new();
    let node_a = TestNode::new(&hub, "node-a");
    let node_b = TestNode::new(&hub, "node-b");

    let counter_a = node_a.register_counter("counter.shared", 10);
    let counter_b = node_b.register_counter("counter.shared", 10);

    node_a.engine.start().await.unwrap();
    node_b.engine.start().await.unwrap();

    let handle = node_a.handle(Arc::clone(&counter_a));
    handle.set_return_value(false);

    // No synchronous result; the side effect arrives through the queue on
    // both nodes, exactly once each.
    assert_eq!(handle.add_and_get(5).unwrap(), None);

    wait_for(|| counter_a.value() == 15 && counter_b.value() == 15).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(counter_a.journal(), vec!["add_and_get(5)"]);
    assert_eq!(counter_b.journal(), vec!["add_and_get(5)"]);

    node_a.engine.stop().await;
    node_b.engine.stop().await;
}

#[tokio::test]
async fn policy_procedure_result_is_discarded_on_replay() {
    let hub = LocalHub::new();
    let node_a = TestNode::new(&hub, "node-a");
    let node_b = TestNode::new(&hub, "node-b");

    let counter_a = node_a.register_counter("counter.shared", 0);
    let counter_b = node_b.register_counter("counter.shared", 0);

    node_a.engine.start().await.unwrap();
    node_b.engine.start().await.unwrap();

    let handle = node_a.handle(Arc::clone(&counter_a));

    // Procedures never produce a synchronous result for the caller.
    assert_eq!(
        handle.proxy().call("add", vec![serde_json::json!(3)]).unwrap(),
        None
    );

    wait_for(|| counter_a.value() == 3 && counter_b.value() == 3).await;

    node_a.engine.stop().await;
    node_b.engine.stop().await;
}

// =============================================================================
// Engine Tests
// =============================================================================

#[tokio::test]
async fn engine_stop_is_cooperative_and_bounded() {
    let hub = LocalHub::new();
    let node_a = TestNode::new(&hub, "node-a");
    let node_b = TestNode::new(&hub, "node-b");

    let counter_b = node_b.register_counter("counter.shared", 0);
    let counter_a = node_a.register_counter("counter.shared", 0);
    node_b.engine.start().await.unwrap();

    let handle = node_a.handle(Arc::clone(&counter_a));
    for i in 0..20 {
        handle.set_value(i).unwrap();
    }
    wait_for(|| counter_b.value() == 19).await;

    let started = std::time::Instant::now();
    node_b.engine.stop().await;
    assert!(started.elapsed() < node_b.config.worker.drain_timeout() * 3);
    assert!(!node_b.engine.is_running());
}

#[tokio::test]
async fn engine_restart_replays_new_traffic() {
    let hub = LocalHub::new();
    let node_a = TestNode::new(&hub, "node-a");
    let node_b = TestNode::new(&hub, "node-b");

    let counter_a = node_a.register_counter("counter.shared", 0);
    let counter_b = node_b.register_counter("counter.shared", 0);

    node_b.engine.start().await.unwrap();
    let handle = node_a.handle(Arc::clone(&counter_a));

    handle.set_value(1).unwrap();
    wait_for(|| counter_b.value() == 1).await;

    node_b.engine.stop().await;
    node_b.engine.start().await.unwrap();

    handle.set_value(2).unwrap();
    wait_for(|| counter_b.value() == 2).await;

    node_b.engine.stop().await;
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[tokio::test]
async fn lifecycle_handler_starts_and_stops_the_engine() {
    let hub = LocalHub::new();
    let node_a = TestNode::new(&hub, "node-a");
    let node_b = TestNode::new(&hub, "node-b");

    let counter_a = node_a.register_counter("counter.shared", 0);
    let counter_b = node_b.register_counter("counter.shared", 0);

    let engine_b = Arc::new(node_b.engine);
    let mut lifecycle = LifecycleHandler::new();
    lifecycle.register(Arc::clone(&engine_b) as Arc<dyn Component>);

    lifecycle.start().await.unwrap();
    assert!(engine_b.is_running());

    node_a.handle(Arc::clone(&counter_a)).set_value(4).unwrap();
    wait_for(|| counter_b.value() == 4).await;

    lifecycle.stop().await;
    assert!(!engine_b.is_running());
}
