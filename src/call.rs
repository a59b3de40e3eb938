// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! The wire-level representation of one intercepted method call.
//!
//! A [`CallDescriptor`] is created exactly once per intercepted call and is
//! immutable after publication. Arguments travel as JSON values so the wire
//! format never depends on the runtime type of an argument; `null` arguments
//! are `Value::Null` and carry no type burden. Decoding is owned by the
//! registered thunk on the receiving side.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One intercepted method call, as published on the topic.
///
/// # Fields
///
/// - `object_reference`: stable identity of the target object, opaque here.
/// - `method`: method name, unique per (name, arity) within a registry.
/// - `arguments`: ordered argument values, may contain nulls.
/// - `execute_everywhere`: when true every node, including the originator,
///   replays the call asynchronously; when false only non-originating nodes
///   replay it (the originator already executed it synchronously).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallDescriptor {
    pub object_reference: String,
    pub method: String,
    pub arguments: Vec<Value>,
    pub execute_everywhere: bool,
}

impl CallDescriptor {
    /// Build a descriptor from the resolved reference and call-time arguments.
    pub fn new(
        object_reference: impl Into<String>,
        method: impl Into<String>,
        arguments: Vec<Value>,
        execute_everywhere: bool,
    ) -> Self {
        Self {
            object_reference: object_reference.into(),
            method: method.into(),
            arguments,
            execute_everywhere,
        }
    }

    /// Number of arguments, used together with `method` for registry lookup.
    pub fn arity(&self) -> usize {
        self.arguments.len()
    }
}

impl std::fmt::Display for CallDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{}/{} (everywhere: {})",
            self.object_reference,
            self.method,
            self.arity(),
            self.execute_everywhere
        )
    }
}
