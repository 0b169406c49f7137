//! Command layer benchmarks for SCQL.
//!
//! Benchmarks for:
//! - Command APDU parsing
//! - Full dispatch through the applet

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use scql_apdu::{CommandApdu, ScqlApplet};
use scql_bench::utils::{bench_config, setup_apdus};

/// Benchmark APDU parsing and dispatch.
fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("apdu/dispatch");

    let declare = [0x00, 0x10, 0x00, 0x87, 0x08, 0x06, b'p', b'e', b'o', b'p', b'l', b'e', 0x00];
    group.bench_function("parse_declare", |b| {
        b.iter(|| black_box(CommandApdu::parse(black_box(&declare)).unwrap()))
    });

    for size in [25, 250] {
        let apdus = setup_apdus(size);
        group.throughput(Throughput::Elements(apdus.len() as u64));
        group.bench_with_input(BenchmarkId::new("create_and_fill", size), &size, |b, &size| {
            b.iter(|| {
                let mut applet = ScqlApplet::new(bench_config(size)).unwrap();
                for apdu in &apdus {
                    let response = applet.process(apdu);
                    debug_assert!(response.is_success());
                    black_box(response);
                }
                applet
            })
        });
    }

    group.bench_function("fetch_next_cycle", |b| {
        let mut applet = ScqlApplet::new(bench_config(25)).unwrap();
        for apdu in setup_apdus(25) {
            applet.process(&apdu);
        }
        applet.process(&declare);
        b.iter(|| {
            applet.process(&[0x00, 0x10, 0x00, 0x88]);
            while applet.process(&[0x00, 0x10, 0x00, 0x8B]).is_success() {}
        })
    });

    group.finish();
}

criterion_group!(benches, bench_dispatch);
criterion_main!(benches);
