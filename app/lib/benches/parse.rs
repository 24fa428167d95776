//! Criterion benchmarks for log parsing and flat-table encoding.

use std::hint::black_box;

use accel_convert::{write_flat_table, LogDialect, LogParser, ParserConfig};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn ticked_log(lines: usize) -> String {
    let mut text = String::with_capacity(lines * 32);
    for i in 0..lines {
        if i % 50 == 0 {
            text.push_str("[W] battery 87%\n");
        }
        text.push_str(&format!(
            "[I] ({}ms) {} {}.{:03} {};\n",
            i * 10,
            i,
            i / 100,
            (i * 10) % 1000,
            512 + (i % 64)
        ));
    }
    text
}

fn plain_log(lines: usize) -> String {
    (0..lines)
        .map(|i| format!("[I] {} {}.{:03} {};\n", i, i / 100, (i * 10) % 1000, i % 1024))
        .collect()
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    for lines in [1_000usize, 100_000] {
        let ticked = ticked_log(lines);
        group.throughput(Throughput::Bytes(ticked.len() as u64));
        group.bench_with_input(BenchmarkId::new("ticked", lines), &ticked, |b, text| {
            let parser = LogParser::new();
            b.iter(|| black_box(parser.parse_str(black_box(text)).map(|p| p.records().len())))
        });

        let plain = plain_log(lines);
        group.throughput(Throughput::Bytes(plain.len() as u64));
        group.bench_with_input(BenchmarkId::new("plain", lines), &plain, |b, text| {
            let parser = LogParser::with_config(ParserConfig::new().with_dialect(LogDialect::Plain));
            b.iter(|| black_box(parser.parse_str(black_box(text)).map(|p| p.records().len())))
        });
    }

    group.finish();
}

fn bench_flat_table(c: &mut Criterion) {
    let set = match LogParser::new()
        .parse_str(&ticked_log(100_000))
        .and_then(|parsed| parsed.into_record_set())
    {
        Ok(set) => set,
        Err(e) => panic!("benchmark input failed to parse: {}", e),
    };

    let mut group = c.benchmark_group("flat_table");
    group.throughput(Throughput::Elements(set.len() as u64));
    group.bench_function("write_100k", |b| {
        let mut buffer = Vec::with_capacity(4 * 1024 * 1024);
        b.iter(|| {
            buffer.clear();
            black_box(write_flat_table(black_box(&set), &mut buffer).is_ok())
        })
    });
    group.finish();
}

criterion_group!(benches, bench_parse, bench_flat_table);
criterion_main!(benches);
