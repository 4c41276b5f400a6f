use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use fossil_delta::engine::{self, DeltaOptions};
use fossil_delta::hash::table::SourceIndex;
use std::fs;
use std::path::Path;

fn gen_data(size: usize, seed: u64) -> Vec<u8> {
    let mut s = seed;
    let mut out = Vec::with_capacity(size);
    for _ in 0..size {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        out.push((s >> 33) as u8);
    }
    out
}

fn mutate(base: &[u8], stride: usize) -> Vec<u8> {
    let mut out = base.to_vec();
    for i in (0..out.len()).step_by(stride.max(1)) {
        out[i] = out[i].wrapping_add(1);
    }
    out
}

fn options(window: usize) -> DeltaOptions {
    DeltaOptions {
        window_size: window,
        ..Default::default()
    }
}

fn create_delta(source: &[u8], target: &[u8], window: usize) -> Vec<u8> {
    engine::create(source, target, &options(window)).unwrap()
}

fn write_ratio_snapshot() {
    let source = gen_data(2 * 1024 * 1024, 123);
    let target = mutate(&source, 4096);
    let mut csv = String::from("window,delta_bytes,target_bytes,ratio\n");
    for window in [4usize, 8, 16, 32, 64, 128] {
        let delta = create_delta(&source, &target, window);
        let ratio = delta.len() as f64 / target.len() as f64;
        csv.push_str(&format!(
            "{window},{},{},{}\n",
            delta.len(),
            target.len(),
            ratio
        ));
    }
    let out_dir = Path::new("target/criterion/custom_reports");
    let _ = fs::create_dir_all(out_dir);
    let _ = fs::write(out_dir.join("ratio_snapshot.csv"), csv);
}

fn bench_create_speed(c: &mut Criterion) {
    let mut g = c.benchmark_group("create_speed_mb_s");
    for size in [64 * 1024usize, 1024 * 1024, 8 * 1024 * 1024] {
        let source = gen_data(size, 1);
        let target = mutate(&source, 1024);
        g.throughput(Throughput::Bytes(size as u64));
        g.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let delta = create_delta(black_box(&source), black_box(&target), 16);
                black_box(delta);
            });
        });
    }
    g.finish();
}

fn bench_apply_speed(c: &mut Criterion) {
    let mut g = c.benchmark_group("apply_speed_vs_delta");
    let opts = DeltaOptions::default();
    for size in [64 * 1024usize, 1024 * 1024, 8 * 1024 * 1024] {
        let source = gen_data(size, 2);
        let target = mutate(&source, 2048);
        let delta = create_delta(&source, &target, 16);
        g.throughput(Throughput::Bytes(size as u64));
        g.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let out = engine::apply(black_box(&source), black_box(&delta), &opts).unwrap();
                black_box(out);
            });
        });
    }
    g.finish();
}

fn bench_ratio_vs_window(c: &mut Criterion) {
    write_ratio_snapshot();
    let mut g = c.benchmark_group("delta_ratio_vs_window");
    let source = gen_data(2 * 1024 * 1024, 3);
    let target = mutate(&source, 4096);
    for window in [4usize, 16, 64] {
        g.bench_with_input(BenchmarkId::from_parameter(window), &window, |b, window| {
            b.iter(|| {
                let delta = create_delta(&source, &target, *window);
                let ratio = delta.len() as f64 / target.len() as f64;
                black_box(ratio);
            });
        });
    }
    g.finish();
}

fn bench_source_index(c: &mut Criterion) {
    let mut g = c.benchmark_group("source_index_build");
    for size in [256 * 1024usize, 4 * 1024 * 1024] {
        let source = gen_data(size, 4);
        g.throughput(Throughput::Bytes(size as u64));
        g.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let index = SourceIndex::build(black_box(&source), 16).unwrap();
                black_box(index.size());
            });
        });
    }
    g.finish();
}

fn bench_analyze(c: &mut Criterion) {
    let source = gen_data(4 * 1024 * 1024, 5);
    let target = mutate(&source, 512);
    let delta = create_delta(&source, &target, 16);
    c.bench_function("analyze_4mb", |b| {
        b.iter(|| black_box(engine::analyze(black_box(&delta)).unwrap()));
    });
}

fn bench_real_world_scenarios(c: &mut Criterion) {
    let mut g = c.benchmark_group("real_world_scenarios");
    let opts = DeltaOptions::default();
    let scenarios = [
        ("software_update", 4 * 1024 * 1024usize, 1024usize),
        ("document_versioning", 512 * 1024usize, 256usize),
        ("database_snapshot", 8 * 1024 * 1024usize, 4096usize),
    ];

    for (name, size, stride) in scenarios {
        let source = gen_data(size, size as u64);
        let target = mutate(&source, stride);
        g.throughput(Throughput::Bytes(size as u64));
        g.bench_function(name, |b| {
            b.iter(|| {
                let delta = engine::create(&source, &target, &opts).unwrap();
                let out = engine::apply(&source, &delta, &opts).unwrap();
                black_box(out);
            });
        });
    }
    g.finish();
}

criterion_group!(
    benches,
    bench_create_speed,
    bench_apply_speed,
    bench_ratio_vs_window,
    bench_source_index,
    bench_analyze,
    bench_real_world_scenarios
);
criterion_main!(benches);
