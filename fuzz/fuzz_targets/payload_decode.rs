#![no_main]

use libfuzzer_sys::fuzz_target;
use snrebin::payload::{PayloadReader, SnPayload};

fuzz_target!(|data: &[u8]| {
    // Neither the single-payload decoder nor the stream reader may panic
    let _ = SnPayload::decode(data);
    for payload in PayloadReader::new(data) {
        if payload.is_err() {
            break;
        }
    }
});
