use fossil_delta::engine::{self, DeltaOptions};

#[derive(Debug)]
struct Vector {
    name: String,
    window: usize,
    search_limit: usize,
    source: Vec<u8>,
    target: Vec<u8>,
    delta: Vec<u8>,
}

impl Vector {
    fn options(&self) -> DeltaOptions {
        DeltaOptions {
            window_size: self.window,
            search_depth: self.search_limit,
            ..Default::default()
        }
    }
}

fn hex_to_bytes(s: &str) -> Vec<u8> {
    let s = s.trim();
    if s.is_empty() {
        return Vec::new();
    }
    assert!(
        s.len().is_multiple_of(2),
        "hex string must have even length"
    );
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
        .collect()
}

fn load_vectors() -> Vec<Vector> {
    let manifest = include_str!("vectors/manifest.tsv");
    manifest
        .lines()
        .filter(|line| !line.trim().is_empty() && !line.starts_with('#'))
        .map(|line| {
            let parts: Vec<_> = line.split('|').collect();
            assert_eq!(parts.len(), 6, "invalid vector row: {line}");
            Vector {
                name: parts[0].to_string(),
                window: parts[1].parse().unwrap(),
                search_limit: parts[2].parse().unwrap(),
                source: hex_to_bytes(parts[3]),
                target: hex_to_bytes(parts[4]),
                delta: hex_to_bytes(parts[5]),
            }
        })
        .collect()
}

#[test]
fn vector_database_is_non_empty() {
    let vectors = load_vectors();
    assert!(vectors.len() >= 10);
}

#[test]
fn create_matches_recorded_bytes() {
    for v in load_vectors() {
        let delta = engine::create(&v.source, &v.target, &v.options()).unwrap();
        assert_eq!(delta, v.delta, "vector {}", v.name);
    }
}

#[test]
fn recorded_deltas_apply() {
    for v in load_vectors() {
        let out = engine::apply(&v.source, &v.delta, &DeltaOptions::default())
            .unwrap_or_else(|e| panic!("vector {}: {e}", v.name));
        assert_eq!(out, v.target, "vector {}", v.name);
    }
}

#[test]
fn recorded_deltas_report_sizes() {
    for v in load_vectors() {
        assert_eq!(
            engine::output_size(&v.delta).unwrap() as usize,
            v.target.len(),
            "vector {}",
            v.name
        );
        let stats = engine::analyze(&v.delta).unwrap();
        assert_eq!(
            stats.bytes_copied + stats.bytes_inserted,
            v.target.len() as u64,
            "vector {}",
            v.name
        );
    }
}

#[test]
fn degenerate_vectors_are_single_literals() {
    for v in load_vectors() {
        if v.source.len() > v.window {
            continue;
        }
        let stats = engine::analyze(&v.delta).unwrap();
        assert_eq!(stats.literal_records, 1, "vector {}", v.name);
        assert_eq!(stats.copy_records, 0, "vector {}", v.name);
    }
}
