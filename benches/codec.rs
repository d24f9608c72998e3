use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use telemlink::protocol::{encode_outbound, internet_checksum};
use telemlink::transport::{Framer, FramerConfig};
use telemlink::RawMessage;

fn bench_checksum(c: &mut Criterion) {
    let mut group = c.benchmark_group("checksum");

    // Inbound payload (12 bytes)
    let payload = RawMessage::new(0x0001_0B08, 0x1122_3344_5566_7788).to_payload();
    group.throughput(Throughput::Bytes(payload.len() as u64));
    group.bench_function("inbound_12b", |b| {
        b.iter(|| black_box(internet_checksum(black_box(&payload))));
    });

    // Odd-length buffer (1 KB + 1)
    let large = vec![0xA5u8; 1025];
    group.throughput(Throughput::Bytes(large.len() as u64));
    group.bench_function("odd_1kb", |b| {
        b.iter(|| black_box(internet_checksum(black_box(&large))));
    });

    group.finish();
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");

    let msg = RawMessage::new(0x0000_0308, 42);
    group.bench_function("encode_inbound_frame", |b| {
        b.iter(|| black_box(msg.encode_frame()));
    });

    group.bench_function("encode_outbound_frame", |b| {
        b.iter(|| black_box(encode_outbound(black_box(&[5, 0, 0, 0]))));
    });

    group.finish();
}

fn bench_framer(c: &mut Criterion) {
    let mut group = c.benchmark_group("framer");

    // 16 frames per batch, with one byte of noise in front of each
    let mut stream = Vec::new();
    for data in 0..16u64 {
        stream.push(0x00);
        stream.extend_from_slice(&RawMessage::new(0x0000_0308, data).encode_frame());
    }
    group.throughput(Throughput::Bytes(stream.len() as u64));
    group.bench_function("parse_16_frames", |b| {
        let mut framer = Framer::new(FramerConfig::default());
        b.iter(|| {
            framer.push_bytes(&stream);
            black_box(framer.drain(|event| {
                black_box(event);
            }))
        });
    });

    group.finish();
}

criterion_group!(benches, bench_checksum, bench_encode, bench_framer);
criterion_main!(benches);
