//! Reference resolution: live object to stable identity and back.
//!
//! The embedding application decides what a reference string means. The
//! proxy only needs the two lookups of [`ReferenceResolver`]: forward at
//! interception time (absent means the object is not under replication and
//! the call bypasses the proxy entirely) and inverse at replay time (absent
//! means the receiving node does not hold a copy and drops the descriptor).
//!
//! [`MapResolver`] is the bundled implementation: an explicit register of
//! `reference -> Arc<O>` entries with identity-based reverse lookup. It is
//! sufficient for applications that know their replicated objects up front,
//! and for tests.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Maps live objects to stable string identities and back.
///
/// Both lookups are read-only from the proxy's point of view; ownership of
/// the target objects stays with the application.
pub trait ReferenceResolver<O>: Send + Sync + 'static {
    /// Stable identity for a live object, or `None` if the object is not
    /// under replication.
    fn resolve_reference(&self, object: &O) -> Option<String>;

    /// Live object for a received reference, or `None` if this node holds
    /// no copy.
    fn resolve_object(&self, reference: &str) -> Option<Arc<O>>;
}

/// Register-based resolver: `reference -> Arc<O>`, reverse lookup by
/// pointer identity.
///
/// # Example
///
/// ```rust
/// use call_replication::resolver::{MapResolver, ReferenceResolver};
///
/// let resolver: MapResolver<String> = MapResolver::new();
/// let greeting = resolver.register("greeting", String::from("hello"));
///
/// assert_eq!(resolver.resolve_reference(&greeting), Some("greeting".to_string()));
/// assert!(resolver.resolve_object("greeting").is_some());
/// assert!(resolver.resolve_object("unknown").is_none());
/// ```
pub struct MapResolver<O> {
    objects: RwLock<HashMap<String, Arc<O>>>,
}

impl<O> MapResolver<O> {
    /// Create an empty resolver.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Put an object under replication and return its shared handle.
    ///
    /// The returned `Arc` is the handle the proxy must wrap; reverse lookup
    /// is by pointer identity, so a clone of the object would not resolve.
    pub fn register(&self, reference: impl Into<String>, object: O) -> Arc<O> {
        let object = Arc::new(object);
        self.objects
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(reference.into(), Arc::clone(&object));
        object
    }

    /// Remove an object from replication.
    ///
    /// Subsequent descriptors for this reference are dropped on this node.
    pub fn unregister(&self, reference: &str) -> Option<Arc<O>> {
        self.objects
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(reference)
    }

    /// Number of registered objects.
    pub fn len(&self) -> usize {
        self.objects.read().unwrap_or_else(std::sync::PoisonError::into_inner).len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<O> Default for MapResolver<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: Send + Sync + 'static> ReferenceResolver<O> for MapResolver<O> {
    fn resolve_reference(&self, object: &O) -> Option<String> {
        let objects = self.objects.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        objects
            .iter()
            .find(|(_, candidate)| std::ptr::eq(candidate.as_ref(), object))
            .map(|(reference, _)| reference.clone())
    }

    fn resolve_object(&self, reference: &str) -> Option<Arc<O>> {
        self.objects
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(reference)
            .cloned()
    }
}
