#![no_main]

use libfuzzer_sys::fuzz_target;
use partita_model::sdif::{encode_partials, parse_partials};

fuzz_target!(|data: &[u8]| {
    // Whatever parses must encode and parse back to the same partials.
    if let Ok(partials) = parse_partials(data) {
        if partials.iter().all(|p| p.is_finite()) {
            if let Ok(bytes) = encode_partials(&partials) {
                let back = parse_partials(&bytes).expect("re-parse of encoded partials");
                assert_eq!(back.len(), partials.len());
            }
        }
    }
});
