// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Per-proxy method registry: `(name, arity)` to typed invocation thunk.
//!
//! The registry is the closed dispatch surface a proxied interface exposes.
//! It is built once at proxy-construction time from the interface
//! definition; every entry pairs a method signature with a thunk that
//! decodes the JSON arguments and invokes the real method on the target.
//! There is no runtime type introspection anywhere: a descriptor received
//! from the wire is dispatched purely by name and argument count, and the
//! thunk owns decoding. Registering two thunks under the same `(name,
//! arity)` fails at build time, so an ambiguous call can never be published.
//!
//! # Example
//!
//! ```rust
//! use call_replication::registry::{arg, MethodRegistry};
//! use serde_json::json;
//! use std::sync::atomic::{AtomicI64, Ordering};
//!
//! struct Counter { value: AtomicI64 }
//!
//! let registry = MethodRegistry::builder()
//!     .returning("increase", 0, |c: &Counter, _args| {
//!         Ok(json!(c.value.fetch_add(1, Ordering::SeqCst) + 1))
//!     })
//!     .procedure("set_value", 1, |c: &Counter, args| {
//!         let v: i64 = arg("set_value", args, 0)?;
//!         c.value.store(v, Ordering::SeqCst);
//!         Ok(())
//!     })
//!     .build()
//!     .unwrap();
//!
//! let counter = Counter { value: AtomicI64::new(0) };
//! let result = registry.invoke(&counter, "increase", &[]).unwrap();
//! assert_eq!(result, Some(json!(1)));
//! ```

use crate::error::{ProxyError, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;

/// Invocation thunk: decodes arguments and calls the real method.
///
/// Returns `Some(value)` for value-returning methods, `None` for void ones.
type Thunk<O> = Box<dyn Fn(&O, &[Value]) -> Result<Option<Value>> + Send + Sync>;

struct MethodEntry<O> {
    returns_value: bool,
    thunk: Thunk<O>,
}

/// Immutable method table for one proxied interface.
///
/// Keyed by `(method name, arity)`. Shared between the facade (synchronous
/// invocations and the bypass path) and the worker (asynchronous replay).
pub struct MethodRegistry<O> {
    methods: HashMap<(String, usize), MethodEntry<O>>,
}

impl<O> MethodRegistry<O> {
    /// Start building a registry.
    pub fn builder() -> MethodRegistryBuilder<O> {
        MethodRegistryBuilder {
            methods: HashMap::new(),
            duplicate: None,
        }
    }

    /// Number of registered methods.
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// True if no methods are registered.
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Whether a method with this signature is registered.
    pub fn contains(&self, method: &str, arity: usize) -> bool {
        self.methods.contains_key(&(method.to_string(), arity))
    }

    /// Whether the registered method produces a return value.
    ///
    /// `None` if the signature is unknown.
    pub fn returns_value(&self, method: &str, arity: usize) -> Option<bool> {
        self.methods
            .get(&(method.to_string(), arity))
            .map(|entry| entry.returns_value)
    }

    /// Dispatch a call through its registered thunk.
    ///
    /// Returns the method's value (`None` for void methods). Unknown
    /// signatures yield [`ProxyError::UnknownMethod`]; decode and invocation
    /// failures come back from the thunk itself.
    pub fn invoke(&self, target: &O, method: &str, args: &[Value]) -> Result<Option<Value>> {
        let entry = self
            .methods
            .get(&(method.to_string(), args.len()))
            .ok_or_else(|| ProxyError::UnknownMethod {
                method: method.to_string(),
                arity: args.len(),
            })?;
        (entry.thunk)(target, args)
    }
}

/// Builder for [`MethodRegistry`].
///
/// Duplicate signatures are remembered and reported by [`build()`](Self::build)
/// so the whole interface definition can be written fluently first.
pub struct MethodRegistryBuilder<O> {
    methods: HashMap<(String, usize), MethodEntry<O>>,
    duplicate: Option<(String, usize)>,
}

impl<O> MethodRegistryBuilder<O> {
    /// Register a value-returning method.
    pub fn returning<F>(self, name: &str, arity: usize, f: F) -> Self
    where
        F: Fn(&O, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.insert(name, arity, true, Box::new(move |target, args| f(target, args).map(Some)))
    }

    /// Register a void method.
    pub fn procedure<F>(self, name: &str, arity: usize, f: F) -> Self
    where
        F: Fn(&O, &[Value]) -> Result<()> + Send + Sync + 'static,
    {
        self.insert(name, arity, false, Box::new(move |target, args| f(target, args).map(|()| None)))
    }

    fn insert(mut self, name: &str, arity: usize, returns_value: bool, thunk: Thunk<O>) -> Self {
        let key = (name.to_string(), arity);
        if self.methods.contains_key(&key) && self.duplicate.is_none() {
            self.duplicate = Some(key.clone());
        }
        self.methods.insert(key, MethodEntry { returns_value, thunk });
        self
    }

    /// Finish the registry, rejecting ambiguous signatures.
    pub fn build(self) -> Result<MethodRegistry<O>> {
        if let Some((method, arity)) = self.duplicate {
            return Err(ProxyError::DuplicateMethod { method, arity });
        }
        Ok(MethodRegistry {
            methods: self.methods,
        })
    }
}

/// Decode one positional argument inside a thunk.
///
/// Produces [`ProxyError::ArgumentDecode`] with the method name and argument
/// index on failure, so worker logs identify the offending descriptor.
pub fn arg<T: DeserializeOwned>(method: &str, args: &[Value], index: usize) -> Result<T> {
    let value = args.get(index).ok_or_else(|| ProxyError::ArgumentDecode {
        method: method.to_string(),
        message: format!("missing argument {}", index),
    })?;
    serde_json::from_value(value.clone()).map_err(|e| ProxyError::ArgumentDecode {
        method: method.to_string(),
        message: format!("argument {}: {}", index, e),
    })
}
