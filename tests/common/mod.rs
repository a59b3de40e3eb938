//! Shared test utilities for integration tests.
//!
//! This module provides:
//! - A `Counter` fixture object with a call journal
//! - A registry builder covering procedures and value-returning methods
//! - A typed `CounterHandle` wrapper over the replicating proxy
//! - A `TestNode` bundling one node's proxy-side and receive-side wiring

#![allow(dead_code)]

pub mod fixtures;

pub use fixtures::*;
