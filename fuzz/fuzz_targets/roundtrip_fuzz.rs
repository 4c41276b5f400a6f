#![no_main]
use fossil_delta::engine::{self, DeltaOptions};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    // First byte picks a power-of-two window (1..=64), the rest splits into
    // source/target.
    let window = 1usize << (data[0] % 7);
    let payload = &data[1..];
    let split = payload.len() / 2;
    let (source, target) = payload.split_at(split);

    let opts = DeltaOptions {
        window_size: window,
        ..Default::default()
    };
    let delta = engine::create(source, target, &opts).unwrap();
    let decoded = engine::apply(source, &delta, &opts).unwrap();
    assert_eq!(decoded, target);
    assert_eq!(engine::output_size(&delta).unwrap() as usize, target.len());
});
