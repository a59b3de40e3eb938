//! Execution policy: synchronous, asynchronous, or dual execution per call.
//!
//! The policy answers two questions for every replicated call:
//! whether the originating node invokes the method synchronously (so the
//! caller sees a real return value), and whether the originator must also
//! replay its own published descriptor through the worker queue.
//!
//! # Decision Table
//!
//! | returns a value | return-value policy | invoke locally | execute everywhere |
//! |-----------------|---------------------|----------------|--------------------|
//! | no (void)       | ignored             | no             | yes                |
//! | yes             | true                | yes            | no                 |
//! | yes             | false               | no             | yes                |
//!
//! A synchronous local invocation already produced the side effect on the
//! originating node, so that node must not also replay its own message.
//! Calls with no usable synchronous result run uniformly through the same
//! asynchronous path on all nodes, so a single node never interleaves
//! "executed inline" with "executed via queue".

/// Routing decision for one intercepted call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Routing {
    /// Invoke the method on the local object synchronously and hand the
    /// caller its real result.
    pub invoke_locally: bool,
    /// Value of `execute_everywhere` in the published descriptor.
    pub execute_everywhere: bool,
}

/// Decide routing for a call.
///
/// `returns_value` comes from the method's registry entry; `return_value_policy`
/// is the facade-level toggle (default true).
pub fn decide(returns_value: bool, return_value_policy: bool) -> Routing {
    if !returns_value {
        Routing {
            invoke_locally: false,
            execute_everywhere: true,
        }
    } else if return_value_policy {
        Routing {
            invoke_locally: true,
            execute_everywhere: false,
        }
    } else {
        Routing {
            invoke_locally: false,
            execute_everywhere: true,
        }
    }
}
