//! Ordered startup and shutdown of long-lived parts.
//!
//! A [`Component`] is anything with an async start/stop pair, typically an
//! [`ExecutionEngine`](crate::engine::ExecutionEngine). The
//! [`LifecycleHandler`] starts registered components in registration order
//! and stops them in reverse, then joins its background tasks with a bounded
//! timeout so shutdown cannot hang on a stuck task.
//!
//! Background tasks are registered as factories, so a stopped handler can
//! be started again with fresh task instances.

use crate::error::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub use futures::future::BoxFuture;

/// Bound on joining a background task during shutdown.
const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// A startable and stoppable part of the node.
pub trait Component: Send + Sync {
    /// Name used in lifecycle log lines.
    fn name(&self) -> &str;

    /// Bring the component up. A failure aborts startup and unwinds the
    /// components already started.
    fn on_start(&self) -> BoxFuture<'_, Result<()>>;

    /// Take the component down. Stop is not allowed to fail.
    fn on_stop(&self) -> BoxFuture<'_, ()>;
}

type TaskFactory = Box<dyn Fn(watch::Receiver<bool>) -> BoxFuture<'static, ()> + Send + Sync>;

struct Task {
    name: String,
    factory: TaskFactory,
}

/// Starts components in order, stops them in reverse, and supervises
/// background tasks with a shared shutdown signal.
pub struct LifecycleHandler {
    components: Vec<Arc<dyn Component>>,
    tasks: Vec<Task>,
    shutdown_tx: Option<watch::Sender<bool>>,
    handles: Vec<(String, JoinHandle<()>)>,
}

impl LifecycleHandler {
    pub fn new() -> Self {
        Self {
            components: Vec::new(),
            tasks: Vec::new(),
            shutdown_tx: None,
            handles: Vec::new(),
        }
    }

    /// Register a component. Start order is registration order.
    pub fn register(&mut self, component: Arc<dyn Component>) {
        self.components.push(component);
    }

    /// Register a background task factory.
    ///
    /// The factory is invoked on every `start()`, receiving a fresh shutdown
    /// receiver. The task is expected to exit promptly once the receiver
    /// observes `true`.
    pub fn register_task<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(watch::Receiver<bool>) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        self.tasks.push(Task {
            name: name.into(),
            factory: Box::new(factory),
        });
    }

    /// Whether `start()` has run without a matching `stop()`.
    pub fn is_started(&self) -> bool {
        self.shutdown_tx.is_some()
    }

    /// Start all components in order, then spawn background tasks.
    ///
    /// If a component fails to start, the ones already started are stopped
    /// in reverse order and the error is returned.
    pub async fn start(&mut self) -> Result<()> {
        if self.shutdown_tx.is_some() {
            debug!("Lifecycle already started");
            return Ok(());
        }

        info!(components = self.components.len(), tasks = self.tasks.len(), "Starting");

        for (i, component) in self.components.iter().enumerate() {
            if let Err(e) = component.on_start().await {
                warn!(component = component.name(), error = %e, "Component failed to start, unwinding");
                for started in self.components[..i].iter().rev() {
                    started.on_stop().await;
                }
                return Err(e);
            }
            debug!(component = component.name(), "Component started");
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        for task in &self.tasks {
            let handle = tokio::spawn((task.factory)(shutdown_rx.clone()));
            self.handles.push((task.name.clone(), handle));
        }
        self.shutdown_tx = Some(shutdown_tx);

        Ok(())
    }

    /// Signal shutdown, join tasks with [`JOIN_TIMEOUT`], then stop
    /// components in reverse registration order.
    pub async fn stop(&mut self) {
        let Some(shutdown_tx) = self.shutdown_tx.take() else {
            return;
        };

        info!("Stopping");
        let _ = shutdown_tx.send(true);

        for (name, handle) in self.handles.drain(..) {
            match tokio::time::timeout(JOIN_TIMEOUT, handle).await {
                Ok(Ok(())) => debug!(task = %name, "Task completed"),
                Ok(Err(e)) => warn!(task = %name, error = %e, "Task panicked during shutdown"),
                Err(_) => warn!(task = %name, "Task timed out during shutdown"),
            }
        }

        for component in self.components.iter().rev() {
            component.on_stop().await;
            debug!(component = component.name(), "Component stopped");
        }

        info!("Stopped");
    }
}

impl Default for LifecycleHandler {
    fn default() -> Self {
        Self::new()
    }
}
