use criterion::{criterion_group, criterion_main};


criterion_group!(
    benches,
    config::bench_compile_minimal,
    config::bench_compile_full,
    config::bench_restore
);
criterion_main!(benches);
