#![no_main]

use libfuzzer_sys::fuzz_target;
use partita_engine::{AnalyzerConfig, SynthesisParams};

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(config) = AnalyzerConfig::from_json(text) {
            let _ = config.validate();
        }
        if let Ok(params) = SynthesisParams::from_json(text) {
            let _ = params.validate();
        }
    }
});
