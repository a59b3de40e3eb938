// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! The proxy facade: interception, routing, encoding, publication.
//!
//! [`ReplicatingProxy`] wraps one target object behind its method registry.
//! Every call routed through [`call()`](ReplicatingProxy::call) is
//! intercepted before it reaches the target:
//!
//! 1. The resolver is asked for the object's stable reference. Absent means
//!    the object is not under replication: the call executes directly on
//!    the target and returns unmodified, nothing is published.
//! 2. The execution policy decides synchronous/asynchronous routing.
//! 3. A [`CallDescriptor`] is built and published. Publication is
//!    synchronous from the caller's point of view; replay on any node
//!    happens later through that node's worker.
//!
//! A local invocation failure under the synchronous policy propagates to
//! the caller and nothing is published. A publish failure is fatal to the
//! call.
//!
//! Embedding code typically hides the facade behind a thin typed wrapper
//! per interface, keeping call sites statically checked; see the `Counter`
//! fixtures in the integration tests.

use crate::call::CallDescriptor;
use crate::config::ProxyConfig;
use crate::error::{ProxyError, Result};
use crate::metrics;
use crate::policy;
use crate::registry::MethodRegistry;
use crate::resolver::ReferenceResolver;
use crate::transport::Topic;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// Capability-preserving facade over one replicated object.
///
/// Created once per wrapped object; not reusable across targets. The
/// registry, resolver, and topic are shared with the node's
/// [`ExecutionEngine`](crate::engine::ExecutionEngine).
pub struct ReplicatingProxy<O, R: ReferenceResolver<O>> {
    target: Arc<O>,
    registry: Arc<MethodRegistry<O>>,
    resolver: Arc<R>,
    topic: Arc<dyn Topic>,
    return_value: AtomicBool,
}

impl<O, R> ReplicatingProxy<O, R>
where
    O: Send + Sync + 'static,
    R: ReferenceResolver<O>,
{
    /// Wrap a target object.
    ///
    /// `config.return_value` seeds the return-value policy; it can be
    /// toggled later with [`set_return_value()`](Self::set_return_value).
    pub fn new(
        target: Arc<O>,
        registry: Arc<MethodRegistry<O>>,
        resolver: Arc<R>,
        topic: Arc<dyn Topic>,
        config: &ProxyConfig,
    ) -> Self {
        Self {
            target,
            registry,
            resolver,
            topic,
            return_value: AtomicBool::new(config.return_value),
        }
    }

    /// Whether non-void calls execute synchronously and return their real
    /// result.
    pub fn return_value(&self) -> bool {
        self.return_value.load(Ordering::SeqCst)
    }

    /// Toggle the return-value policy.
    pub fn set_return_value(&self, return_value: bool) {
        self.return_value.store(return_value, Ordering::SeqCst);
    }

    /// The wrapped target.
    pub fn target(&self) -> &Arc<O> {
        &self.target
    }

    /// Intercept one call.
    ///
    /// Returns the synchronous local result (`Some` under the return-value
    /// policy for non-void methods, `None` otherwise). Errors: unknown
    /// signature, local invocation failure, or publish failure.
    pub fn call(&self, method: &str, arguments: Vec<Value>) -> Result<Option<Value>> {
        let topic_name = self.topic.name().to_string();
        metrics::record_intercepted(&topic_name);

        // Bypass: object not under replication.
        let Some(reference) = self.resolver.resolve_reference(&self.target) else {
            debug!(method, "Target not under replication, executing directly");
            metrics::record_bypass(&topic_name);
            return self.registry.invoke(&self.target, method, &arguments);
        };

        let returns_value = self
            .registry
            .returns_value(method, arguments.len())
            .ok_or_else(|| ProxyError::UnknownMethod {
                method: method.to_string(),
                arity: arguments.len(),
            })?;

        let routing = policy::decide(returns_value, self.return_value());

        // Synchronous case: the caller gets the real result, and a local
        // failure propagates before anything is published.
        let local_result = if routing.invoke_locally {
            let result = self.registry.invoke(&self.target, method, &arguments)?;
            metrics::record_local_invocation(&topic_name);
            result
        } else {
            None
        };

        let descriptor = CallDescriptor::new(
            reference.clone(),
            method,
            arguments,
            routing.execute_everywhere,
        );

        trace!(
            object_reference = %reference,
            method,
            execute_everywhere = routing.execute_everywhere,
            "Publishing call descriptor"
        );

        if let Err(e) = self.topic.publish(descriptor) {
            metrics::record_publish_failure(&topic_name);
            return Err(e);
        }
        metrics::record_published(&topic_name);

        Ok(local_result)
    }
}
