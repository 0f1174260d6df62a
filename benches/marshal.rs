//! Marshaling micro-benchmarks against the mock host
//!
//! Measures the per-operation overhead of the boundary discipline: the
//! predicate round trip, the full record shape check, and the two-phase
//! string copy.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use arbor_bridge::mock::MockHost;
use arbor_bridge::{Env, NativeKind};

fn bench_classify(c: &mut Criterion) {
    let host = MockHost::new();
    let env = Env::init(&host).unwrap();
    let text = host.seed_string("a modest source line");
    let number = host.seed_integer(17);

    c.bench_function("classify_hit", |b| {
        b.iter(|| black_box(env.is_kind(black_box(text), "stringp")))
    });

    c.bench_function("classify_miss", |b| {
        b.iter(|| black_box(env.is_kind(black_box(number), "stringp")))
    });
}

fn bench_record_check(c: &mut Criterion) {
    let host = MockHost::new();
    let env = Env::init(&host).unwrap();
    let payload = host.seed_integer(0x40);
    let record = host.seed_record("TSLanguage", &[payload]);

    c.bench_function("record_shape_check", |b| {
        b.iter(|| black_box(env.is_record_of_kind(black_box(record), "TSLanguage", 1)))
    });

    c.bench_function("native_ptr_unwrap", |b| {
        b.iter(|| black_box(env.native_ptr(NativeKind::Language, black_box(record))))
    });
}

fn bench_extract_string(c: &mut Criterion) {
    let host = MockHost::new();
    let env = Env::init(&host).unwrap();
    let payload: Vec<u8> = (0..4096).map(|i| (i % 251) as u8).collect();
    let value = host.seed_bytes(&payload);

    c.bench_function("extract_string_4k", |b| {
        b.iter(|| black_box(env.extract_string(black_box(value))))
    });
}

criterion_group!(
    benches,
    bench_classify,
    bench_record_check,
    bench_extract_string
);
criterion_main!(benches);
