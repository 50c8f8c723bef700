#![no_main]

use libfuzzer_sys::fuzz_target;

use belegscan::core::{InvoiceData, InvoicePayload};

// Arbitrary bytes → JSON → payload → validating constructor. None of the
// stages may panic; construction may only return a ValidationError.
fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };
    let Ok(payload) = InvoicePayload::from_value(&value) else {
        return;
    };
    let _ = InvoiceData::from_payload(payload);
});
