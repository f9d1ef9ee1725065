//! Registry and subject tree benchmark suite.
//!
//! Benchmarks the hot paths at different scales:
//! - Registry sizes: 100, 1000
//! - Subject depths: 3, 6
//!
//! Run with: cargo bench --bench registry
//! Results saved to: target/criterion/

use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rvsnoop_core::{
    Connection, ConnectionKey, ConnectionRegistry, EventBus, NullTransport, SubjectHierarchy,
    SubjectName,
};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const REGISTRY_SIZES: &[usize] = &[100, 1000];
const SUBJECT_DEPTHS: &[usize] = &[3, 6];

// ============================================================================
// Helpers
// ============================================================================

fn connection(i: usize) -> Connection {
    Connection::with_description(
        ConnectionKey::new(format!("{}", 7000 + i), "", "tcp:7500"),
        format!("Connection {i:05}"),
        NullTransport::shared(),
    )
}

fn populated(size: usize) -> Arc<ConnectionRegistry> {
    let registry = ConnectionRegistry::new(Arc::new(EventBus::new()));
    for i in 0..size {
        registry.add(connection(i));
    }
    registry
}

fn subject(depth: usize, leaf: usize) -> SubjectName {
    let mut segments: Vec<String> = (0..depth - 1).map(|d| format!("LEVEL{d}")).collect();
    segments.push(format!("LEAF{leaf}"));
    SubjectName::parse(&segments.join(".")).expect("valid subject")
}

// ============================================================================
// Benchmark: Registry
// ============================================================================

fn bench_registry_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry_add");

    for &size in REGISTRY_SIZES {
        group.bench_with_input(BenchmarkId::new("add", size), &size, |b, &size| {
            b.iter(|| black_box(populated(size)));
        });
    }

    group.finish();
}

fn bench_registry_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry_get");

    for &size in REGISTRY_SIZES {
        let registry = populated(size);
        let service = format!("{}", 7000 + size / 2);
        group.bench_with_input(BenchmarkId::new("get", size), &size, |b, _| {
            b.iter(|| black_box(registry.get(&service, "", "tcp:7500")));
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Subject Tree
// ============================================================================

fn bench_record_added(c: &mut Criterion) {
    let mut group = c.benchmark_group("subject_record_added");

    for &depth in SUBJECT_DEPTHS {
        let subjects: Vec<SubjectName> = (0..100).map(|i| subject(depth, i)).collect();
        group.bench_with_input(BenchmarkId::new("depth", depth), &depth, |b, _| {
            b.iter(|| {
                let hierarchy = SubjectHierarchy::new();
                for s in &subjects {
                    hierarchy.record_added(s);
                }
                black_box(hierarchy.prune_empty())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_registry_add, bench_registry_get, bench_record_added);
criterion_main!(benches);
