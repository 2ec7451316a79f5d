//! Performance benchmarks for record encoding and broadcast publishing.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use logcast::{
    BroadcastMedium, ChannelSink, Level, Logger, MemoryHub, Medium, MediumExt, Record, Sink,
};
use std::sync::Arc;

fn bench_record_encoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("record_encoding");

    for message_len in [16, 256, 4096] {
        let record = Record::new(
            vec!["main".into(), "child".into()],
            12.5,
            Level::Warning,
            "x".repeat(message_len),
        );
        let body = record.encode().unwrap();

        group.bench_with_input(BenchmarkId::new("encode", message_len), &record, |b, record| {
            b.iter(|| black_box(record.encode().unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("decode", message_len), &body, |b, body| {
            b.iter(|| black_box(Record::decode(body).unwrap()));
        });
    }

    group.finish();
}

/// Publish throughput with zero, one and several subscribed sinks.
fn bench_publish(c: &mut Criterion) {
    let mut group = c.benchmark_group("broadcast_publish");

    for sinks in [0usize, 1, 8] {
        group.bench_with_input(BenchmarkId::new("sinks", sinks), &sinks, |b, &sinks| {
            let medium = Arc::new(BroadcastMedium::in_memory(&MemoryHub::new()));
            let logger = Logger::new("bench");
            medium.equip(&logger);

            let mut subscribed = Vec::new();
            for _ in 0..sinks {
                let (sink, rx) = ChannelSink::unbounded();
                let sink: Arc<dyn Sink> = Arc::new(sink);
                medium.subscribe(sink.clone(), "bench", Level::Info).unwrap();
                subscribed.push((sink, rx));
            }

            b.iter(|| {
                logger.info(black_box("benchmark message")).unwrap();
            });

            for (sink, _rx) in &subscribed {
                medium.unsubscribe(sink, "bench").unwrap();
            }
        });
    }

    group.finish();
}

criterion_group!(benches, bench_record_encoding, bench_publish);
criterion_main!(benches);
