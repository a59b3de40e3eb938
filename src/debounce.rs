//! Value debouncing for noisy call sources.
//!
//! [`Debouncer::is_ready`] answers "has enough time passed since this value
//! was last seen?". A `true` return arms the value for the configured
//! timeout; any call, ready or not, re-arms it. Useful in front of a
//! [`ReplicatingProxy`](crate::proxy::ReplicatingProxy) when the underlying
//! source repeats the same event in quick succession.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::trace;

/// Stale entries are swept at most every `timeout * CLEAN_MULTIPLIER`.
const CLEAN_MULTIPLIER: u32 = 300;
/// Upper bound on the sweep interval.
const MAX_CLEAN_INTERVAL: Duration = Duration::from_secs(600);

struct Inner<T> {
    deadlines: HashMap<T, Instant>,
    last_clean: Instant,
}

/// Tracks per-value deadlines behind a mutex.
pub struct Debouncer<T: Eq + Hash> {
    timeout: Duration,
    inner: Mutex<Inner<T>>,
}

impl<T: Eq + Hash + Clone> Debouncer<T> {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            inner: Mutex::new(Inner {
                deadlines: HashMap::new(),
                last_clean: Instant::now(),
            }),
        }
    }

    /// True when `value` has not been seen within the timeout window.
    ///
    /// Always re-arms the window for `value`, so repeated calls inside
    /// the window keep returning false and keep pushing the deadline out.
    pub fn is_ready(&self, value: &T) -> bool {
        let now = Instant::now();
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        self.clean_expired(&mut inner, now);

        let ready = match inner.deadlines.get(value) {
            Some(deadline) => now >= *deadline,
            None => true,
        };
        inner.deadlines.insert(value.clone(), now + self.timeout);

        trace!(ready, "Debounce check");
        ready
    }

    /// Drop `value` so the next `is_ready` returns true immediately.
    pub fn reset(&self, value: &T) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.deadlines.remove(value);
    }

    /// Number of values currently tracked.
    pub fn len(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.deadlines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clean_expired(&self, inner: &mut Inner<T>, now: Instant) {
        let interval = (self.timeout * CLEAN_MULTIPLIER).min(MAX_CLEAN_INTERVAL);
        if now.duration_since(inner.last_clean) < interval {
            return;
        }
        inner.deadlines.retain(|_, deadline| now < *deadline);
        inner.last_clean = now;
    }
}
