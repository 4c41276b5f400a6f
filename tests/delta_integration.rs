use fossil_delta::delta::{DecodeError, Record, Records};
use fossil_delta::engine::{self, DeltaOptions};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_bytes(rng: &mut StdRng, len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    rng.fill(&mut buf[..]);
    buf
}

/// A target derived from `source` by a handful of inserts, deletes and edits.
fn mutate(rng: &mut StdRng, source: &[u8]) -> Vec<u8> {
    let mut target = source.to_vec();
    for _ in 0..rng.random_range(1..8) {
        if target.is_empty() {
            break;
        }
        let at = rng.random_range(0..target.len());
        match rng.random_range(0..3) {
            0 => {
                let len = rng.random_range(1..64);
                let insert = random_bytes(rng, len);
                target.splice(at..at, insert);
            }
            1 => {
                let end = (at + rng.random_range(1..128)).min(target.len());
                target.drain(at..end);
            }
            _ => target[at] ^= 0x5A,
        }
    }
    target
}

fn create(source: &[u8], target: &[u8]) -> Vec<u8> {
    engine::create(source, target, &DeltaOptions::default()).unwrap()
}

fn apply(source: &[u8], delta: &[u8]) -> Result<Vec<u8>, DecodeError> {
    engine::apply(source, delta, &DeltaOptions::default())
}

/// Byte ranges of every copy record in `delta`.
fn copy_record_spans(delta: &[u8]) -> Vec<std::ops::Range<usize>> {
    let mut records = Records::new(delta).unwrap();
    let mut spans = Vec::new();
    let mut start = records.position();
    while let Some(record) = records.next() {
        let end = records.position();
        if let Record::Copy { .. } = record.unwrap() {
            spans.push(start..end);
        }
        start = end;
    }
    spans
}

#[test]
fn roundtrip_random_edits() {
    let mut rng = StdRng::seed_from_u64(0x5EED);
    for round in 0..40 {
        let len = rng.random_range(0..6000);
        let source = random_bytes(&mut rng, len);
        let target = mutate(&mut rng, &source);
        let delta = create(&source, &target);
        assert_eq!(apply(&source, &delta).unwrap(), target, "round {round}");
    }
}

#[test]
fn roundtrip_unrelated_buffers() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..20 {
        let (src_len, tgt_len) = (rng.random_range(0..2000), rng.random_range(0..2000));
        let source = random_bytes(&mut rng, src_len);
        let target = random_bytes(&mut rng, tgt_len);
        let delta = create(&source, &target);
        assert_eq!(apply(&source, &delta).unwrap(), target);
    }
}

#[test]
fn create_is_deterministic() {
    let mut rng = StdRng::seed_from_u64(99);
    let source = random_bytes(&mut rng, 10_000);
    let target = mutate(&mut rng, &source);
    assert_eq!(create(&source, &target), create(&source, &target));
}

#[test]
fn degenerate_source_inserts_everything() {
    let mut rng = StdRng::seed_from_u64(3);
    for src_len in [0, 1, 8, 16] {
        let source = random_bytes(&mut rng, src_len);
        let target = random_bytes(&mut rng, 500);
        let delta = create(&source, &target);
        let stats = engine::analyze(&delta).unwrap();
        assert_eq!(stats.bytes_inserted, target.len() as u64);
        assert_eq!(stats.bytes_copied, 0);
        assert_eq!(apply(&source, &delta).unwrap(), target);
    }
}

#[test]
fn empty_inputs() {
    assert_eq!(apply(b"", &create(b"", b"")).unwrap(), b"");
    assert_eq!(apply(b"abc", &create(b"abc", b"")).unwrap(), b"");
}

#[test]
fn identical_buffers_are_mostly_copies() {
    let mut rng = StdRng::seed_from_u64(11);
    for len in [17, 100, 4096, 65_536] {
        let data = random_bytes(&mut rng, len);
        let delta = create(&data, &data);
        assert_eq!(apply(&data, &delta).unwrap(), data);
        let stats = engine::analyze(&delta).unwrap();
        assert!(
            stats.bytes_copied > stats.bytes_inserted,
            "len {len}: copied {} inserted {}",
            stats.bytes_copied,
            stats.bytes_inserted
        );
    }
}

#[test]
fn size_oracle_matches_target_length() {
    let mut rng = StdRng::seed_from_u64(21);
    for _ in 0..30 {
        let len = rng.random_range(0..3000);
        let source = random_bytes(&mut rng, len);
        let target = mutate(&mut rng, &source);
        let delta = create(&source, &target);
        assert_eq!(engine::output_size(&delta).unwrap() as usize, target.len());
    }
}

#[test]
fn flipped_copy_bytes_never_yield_wrong_output() {
    let mut rng = StdRng::seed_from_u64(42);
    let source = random_bytes(&mut rng, 3000);
    let target = mutate(&mut rng, &source);
    let delta = create(&source, &target);
    let spans = copy_record_spans(&delta);
    assert!(!spans.is_empty());

    for span in spans {
        for i in span {
            for mask in [0x01u8, 0x80, 0xFF] {
                let mut bad = delta.clone();
                bad[i] ^= mask;
                match apply(&source, &bad) {
                    Err(_) => {}
                    Ok(out) => assert_eq!(out, target, "byte {i} mask {mask:#x}"),
                }
            }
        }
    }
}

#[test]
fn truncation_is_always_detected() {
    let mut rng = StdRng::seed_from_u64(5);
    let source = random_bytes(&mut rng, 1500);
    let target = mutate(&mut rng, &source);
    let delta = create(&source, &target);
    for cut in 0..delta.len() {
        assert!(apply(&source, &delta[..cut]).is_err(), "cut at {cut}");
    }
}

#[test]
fn trailing_bytes_are_rejected() {
    let delta = create(b"some source bytes here", b"some target bytes here");
    let mut extended = delta.clone();
    extended.push(b'x');
    assert!(matches!(
        apply(b"some source bytes here", &extended),
        Err(DecodeError::MalformedDelta(_))
    ));
}

#[test]
fn wrong_source_is_detected() {
    let mut rng = StdRng::seed_from_u64(8);
    let source = random_bytes(&mut rng, 2000);
    let target = mutate(&mut rng, &source);
    let delta = create(&source, &target);
    let mut other = source.clone();
    other[1000] ^= 0xFF;
    other.truncate(1900);
    match apply(&other, &delta) {
        Err(_) => {}
        Ok(out) => assert_eq!(out, target),
    }
}

#[test]
fn batch_equals_nested_apply() {
    let mut rng = StdRng::seed_from_u64(13);
    let v0 = random_bytes(&mut rng, 4000);
    let v1 = mutate(&mut rng, &v0);
    let v2 = mutate(&mut rng, &v1);
    let v3 = mutate(&mut rng, &v2);
    let deltas = [create(&v0, &v1), create(&v1, &v2), create(&v2, &v3)];

    let nested = apply(
        &apply(&apply(&v0, &deltas[0]).unwrap(), &deltas[1]).unwrap(),
        &deltas[2],
    )
    .unwrap();
    let batched = engine::apply_batch(&v0, &deltas, &DeltaOptions::default()).unwrap();
    assert_eq!(batched, nested);
    assert_eq!(batched, v3);
}

#[test]
fn batch_propagates_first_error() {
    let v0 = b"version zero of a small document".to_vec();
    let v1 = b"version one of a small document!".to_vec();
    let good = create(&v0, &v1);
    let mut bad = good.clone();
    bad.truncate(bad.len() - 1);
    let err = engine::apply_batch(&v0, &[good, bad], &DeltaOptions::default()).unwrap_err();
    assert!(matches!(err, DecodeError::TruncatedDelta));
}

#[cfg(feature = "zlib")]
#[test]
fn compressed_roundtrip_zlib() {
    use fossil_delta::compress::Compression;

    let mut rng = StdRng::seed_from_u64(17);
    let source = random_bytes(&mut rng, 5000);
    let target = mutate(&mut rng, &source);
    let opts = DeltaOptions {
        compression: Compression::Zlib { level: 6 },
        ..Default::default()
    };
    let delta = engine::create(&source, &target, &opts).unwrap();
    assert_eq!(engine::apply(&source, &delta, &opts).unwrap(), target);
}

#[cfg(feature = "lzma")]
#[test]
fn compressed_roundtrip_lzma() {
    use fossil_delta::compress::Compression;

    let source = b"lorem ipsum dolor sit amet ".repeat(100);
    let mut target = source.clone();
    target.extend_from_slice(b"consectetur adipiscing elit");
    let opts = DeltaOptions {
        compression: Compression::Lzma,
        ..Default::default()
    };
    let delta = engine::create(&source, &target, &opts).unwrap();
    assert_eq!(engine::apply(&source, &delta, &opts).unwrap(), target);
}

#[test]
fn apply_each_is_independent() {
    let mut rng = StdRng::seed_from_u64(31);
    let source = random_bytes(&mut rng, 3000);
    let targets: Vec<Vec<u8>> = (0..4).map(|_| mutate(&mut rng, &source)).collect();
    let opts = DeltaOptions::default();
    let deltas = engine::create_each(&source, &targets, &opts).unwrap();
    assert_eq!(
        engine::apply_each(&source, &deltas, &opts).unwrap(),
        targets
    );
}

#[test]
fn seed_byte_windows_roundtrip() {
    let mut rng = StdRng::seed_from_u64(0xF0);
    for seed in 0..=u8::MAX {
        let window = 1usize << (seed % 7);
        let len = rng.random_range(0..400);
        let payload = random_bytes(&mut rng, len);
        let (source, target) = payload.split_at(len / 2);
        let opts = DeltaOptions {
            window_size: window,
            ..Default::default()
        };
        let delta = engine::create(source, target, &opts).unwrap();
        assert_eq!(engine::apply(source, &delta, &opts).unwrap(), target);
        assert_eq!(engine::output_size(&delta).unwrap() as usize, target.len());
    }
}

#[test]
fn non_power_of_two_window_is_an_error() {
    for window in (0..=64usize).filter(|w| !w.is_power_of_two()) {
        let opts = DeltaOptions {
            window_size: window,
            ..Default::default()
        };
        let err = engine::create(b"source bytes", b"target bytes", &opts).unwrap_err();
        assert!(
            matches!(err, engine::EncodeError::InvalidConfig(_)),
            "window {window}"
        );
    }
}
