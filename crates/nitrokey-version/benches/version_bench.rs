//! Benchmarks for version parsing and comparison
//!
//! Run with: cargo bench --bench version_bench

use criterion::{Criterion, criterion_group, criterion_main};
use nitrokey_version::{Version, select_by_start};
use std::hint::black_box;

fn bench_parse(c: &mut Criterion) {
    c.bench_function("parse_release", |b| {
        b.iter(|| Version::from_v_str(black_box("v1.8.2")));
    });
    c.bench_function("parse_pre_release", |b| {
        b.iter(|| Version::from_v_str(black_box("v1.8.2-test.20250312+git")));
    });
}

fn bench_compare(c: &mut Criterion) {
    let (Ok(lhs), Ok(rhs)) = (
        Version::from_v_str("v1.0.0-rc.2.alpha"),
        Version::from_v_str("v1.0.0-rc.10.beta"),
    ) else {
        return;
    };
    c.bench_function("compare_pre_release", |b| {
        b.iter(|| black_box(&lhs) < black_box(&rhs));
    });
}

fn bench_select(c: &mut Criterion) {
    let ranges: Vec<(Version, u32)> = (0..32).map(|i| (Version::new(1, i, 0), i)).collect();
    let version = Version::new(1, 17, 3);
    c.bench_function("select_by_start_32", |b| {
        b.iter(|| select_by_start(black_box(&ranges), black_box(&version), |(start, _)| start));
    });
}

criterion_group!(benches, bench_parse, bench_compare, bench_select);
criterion_main!(benches);
