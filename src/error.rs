// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Error types for the call replication proxy.
//!
//! Errors are categorized by where they surface: at the call site (the
//! caller of a proxied method sees them synchronously) or in the worker
//! (they are logged with context and the descriptor is dropped).
//!
//! # Error Categories
//!
//! | Error Type | Recoverable | Description |
//! |------------|-------------|-------------|
//! | `Publish` | No | Transport rejected the descriptor; fatal to the caller |
//! | `UnknownMethod` | Yes | No registry entry for (name, arity) |
//! | `ArgumentDecode` | Yes | A thunk could not decode a JSON argument |
//! | `Invocation` | Yes | The target method itself failed |
//! | `UnresolvedObject` | Yes | No local object for the received reference |
//! | `DuplicateMethod` | No | Registry built with two entries for one signature |
//! | `Internal` | No | Unexpected internal error |
//!
//! # Recovery Behavior
//!
//! Use [`ProxyError::is_recoverable()`] in the worker path: recoverable
//! errors are logged, the descriptor is dropped, and the loop continues.
//! Non-recoverable errors either propagate to the original caller
//! (`Publish`, a local `Invocation` under the synchronous policy) or
//! indicate bugs in the embedding code.

use thiserror::Error;

/// Result type alias for proxy operations.
pub type Result<T> = std::result::Result<T, ProxyError>;

/// Errors that can occur while intercepting, publishing, or replaying calls.
///
/// Each variant carries enough context to be logged on its own.
/// Use [`is_recoverable()`](Self::is_recoverable) to decide whether a
/// worker should drop the descriptor and continue.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// The transport refused or failed to publish a descriptor.
    ///
    /// Surfaced synchronously to the original caller: the call was already
    /// classified as replicated, so a silent publish failure would silently
    /// fork cluster state.
    #[error("Publish error on topic '{topic}': {message}")]
    Publish { topic: String, message: String },

    /// No registered method matches the requested name and arity.
    ///
    /// At the call site this means the typed wrapper and the registry
    /// disagree. On receipt it means the nodes run different registries.
    #[error("Unknown method '{method}' with {arity} argument(s)")]
    UnknownMethod { method: String, arity: usize },

    /// A registered thunk could not decode one of its JSON arguments.
    #[error("Argument decode error in '{method}': {message}")]
    ArgumentDecode { method: String, message: String },

    /// The target method itself returned an error.
    ///
    /// Under the synchronous policy this propagates to the original caller
    /// before anything is published. In the worker it is logged and dropped.
    #[error("Invocation of '{method}' on '{object_reference}' failed: {message}")]
    Invocation {
        method: String,
        object_reference: String,
        message: String,
    },

    /// A received reference does not resolve to a live local object.
    ///
    /// Expected when nodes hold disjoint subsets of replicated objects.
    /// Logged and dropped, never fatal to the worker.
    #[error("No local object for reference '{0}'")]
    UnresolvedObject(String),

    /// Two thunks were registered for the same (name, arity) signature.
    ///
    /// Rejected when the registry is built, before any call can be
    /// ambiguous. Fix the interface definition.
    #[error("Duplicate method registration: '{method}' with {arity} argument(s)")]
    DuplicateMethod { method: String, arity: usize },

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProxyError {
    /// Create an invocation error with full context.
    pub fn invocation(
        method: impl Into<String>,
        object_reference: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Invocation {
            method: method.into(),
            object_reference: object_reference.into(),
            message: message.into(),
        }
    }

    /// Create a publish error.
    pub fn publish(topic: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Publish {
            topic: topic.into(),
            message: message.into(),
        }
    }

    /// Check if the worker may drop the offending descriptor and continue.
    ///
    /// One bad descriptor must not halt replication of subsequent ones.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::UnknownMethod { .. } => true,
            Self::ArgumentDecode { .. } => true,
            Self::Invocation { .. } => true,
            Self::UnresolvedObject(_) => true,
            Self::Publish { .. } => false, // Fatal to the originating call
            Self::DuplicateMethod { .. } => false,
            Self::Internal(_) => false,
        }
    }
}
