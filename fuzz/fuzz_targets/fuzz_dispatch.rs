//! Fuzz target for registry dispatch.
//!
//! This tests that invoking arbitrary method names with arbitrary JSON
//! arguments never panics and always yields a structured error or a result.

#![no_main]

use call_replication::registry::arg;
use call_replication::MethodRegistry;
use libfuzzer_sys::fuzz_target;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicI64, Ordering};

struct Counter {
    value: AtomicI64,
}

fn registry() -> MethodRegistry<Counter> {
    MethodRegistry::builder()
        .procedure("set_value", 1, |c: &Counter, args| {
            let v: i64 = arg("set_value", args, 0)?;
            c.value.store(v, Ordering::SeqCst);
            Ok(())
        })
        .returning("get_value", 0, |c: &Counter, _args| {
            Ok(json!(c.value.load(Ordering::SeqCst)))
        })
        .build()
        .expect("registry")
}

fuzz_target!(|data: (&str, &[u8])| {
    let (method, raw) = data;
    let args: Vec<Value> = match serde_json::from_slice(raw) {
        Ok(Value::Array(values)) => values,
        _ => return,
    };

    let registry = registry();
    let counter = Counter {
        value: AtomicI64::new(0),
    };

    // Should never panic; unknown signatures and bad arguments come back
    // as errors
    let _ = registry.invoke(&counter, method, &args);
});
