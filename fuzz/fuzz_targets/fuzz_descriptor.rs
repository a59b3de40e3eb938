//! Fuzz target for the descriptor wire format.
//!
//! This tests that decoding arbitrary bytes never panics, and that any
//! descriptor that does decode re-encodes losslessly.

#![no_main]

use call_replication::CallDescriptor;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Should never panic
    if let Ok(descriptor) = serde_json::from_slice::<CallDescriptor>(data) {
        let encoded = serde_json::to_string(&descriptor).expect("re-encode");
        let decoded: CallDescriptor = serde_json::from_str(&encoded).expect("re-decode");
        assert_eq!(decoded, descriptor);
        assert_eq!(decoded.arity(), descriptor.arguments.len());
    }
});
