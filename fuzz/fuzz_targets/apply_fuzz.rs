#![no_main]
use fossil_delta::engine::{self, DeltaOptions};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must only ever produce errors, never a panic or a
    // buffer whose length disagrees with the header.
    let opts = DeltaOptions::default();
    let _ = engine::analyze(data);
    if let Ok(out) = engine::apply(&[], data, &opts) {
        assert_eq!(Some(out.len() as u32), engine::output_size(data).ok());
    }

    if data.len() >= 2 {
        let split = data.len() / 2;
        let (source, delta) = data.split_at(split);
        if let Ok(out) = engine::apply(source, delta, &opts) {
            assert_eq!(Some(out.len() as u32), engine::output_size(delta).ok());
        }
    }
});
