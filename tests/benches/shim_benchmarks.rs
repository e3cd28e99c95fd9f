//! # Snap Shim Benchmarks
//!
//! | Group | Measures |
//! |-------|----------|
//! | registry | slot create, fulfill and delete for one txid |
//! | codec | envelope encode/decode across payload sizes |
//! | round-trip | one request answered by an echo peer over an in-process stream |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;
use snap_shim::{CorrelationRegistry, RequestDriver, SerialWriter};
use snap_stream::{duplex_pair, MessageSink, MessageSource};
use snap_types::{Message, MessageKind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn bench_registry_slot_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry");
    let registry = CorrelationRegistry::new(10_000);

    group.bench_function("create_fulfill_delete", |b| {
        b.iter(|| {
            let rx = registry.create_slot("bench").unwrap();
            registry
                .fulfill(Message::new(MessageKind::Response, "bench", Vec::new()))
                .unwrap();
            registry.delete_slot("bench");
            black_box(rx)
        })
    });

    // Lookups against a crowded map.
    let _held: Vec<_> = (0..1_000)
        .map(|i| registry.create_slot(&format!("held-{}", i)).unwrap())
        .collect();
    group.bench_function("is_awaiting_1000_pending", |b| {
        b.iter(|| black_box(registry.is_awaiting("held-500")))
    });

    group.finish();
}

fn bench_message_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");
    let mut rng = rand::thread_rng();

    for size in [64usize, 4 * 1024, 256 * 1024] {
        let payload: Vec<u8> = (0..size).map(|_| rng.gen()).collect();
        let msg = Message::new(MessageKind::PutState, "t-bench", payload).with_proposal(vec![1; 128]);
        let bytes = msg.to_bytes().unwrap();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("encode", size), &msg, |b, msg| {
            b.iter(|| black_box(msg.to_bytes().unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("decode", size), &bytes, |b, bytes| {
            b.iter(|| black_box(Message::from_bytes(bytes).unwrap()))
        });
    }

    group.finish();
}

fn bench_send_and_await_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("round-trip");
    group.measurement_time(Duration::from_secs(5));

    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap();

    let driver = rt.block_on(async {
        let (local, remote) = duplex_pair(1024);
        let (local_sink, mut local_source) = local.into_parts();
        let (mut remote_sink, mut remote_source) = remote.into_parts();
        let registry = Arc::new(CorrelationRegistry::new(10_000));

        // Echo peer.
        tokio::spawn(async move {
            while let Ok(Some(request)) = remote_source.recv().await {
                let reply = Message::new(MessageKind::Response, request.txid, request.payload);
                if remote_sink.send(reply).await.is_err() {
                    break;
                }
            }
        });

        let pump = registry.clone();
        tokio::spawn(async move {
            while let Ok(Some(reply)) = local_source.recv().await {
                let _ = pump.fulfill(reply);
            }
        });

        RequestDriver::new(Arc::new(SerialWriter::new(Box::new(local_sink))), registry)
    });

    let counter = AtomicU64::new(0);
    group.bench_function("get_state", |b| {
        b.iter(|| {
            let txid = format!("rt-{}", counter.fetch_add(1, Ordering::Relaxed));
            let reply = rt
                .block_on(driver.send_and_await(Message::new(
                    MessageKind::GetState,
                    txid,
                    b"key".to_vec(),
                )))
                .unwrap();
            black_box(reply)
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_registry_slot_cycle,
    bench_message_codec,
    bench_send_and_await_round_trip
);
criterion_main!(benches);
