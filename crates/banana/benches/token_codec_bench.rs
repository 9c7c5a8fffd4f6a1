//! Throughput benchmarks for the b128 header codec and whole-token
//! encoding, the two hottest paths in the send/receive loops.

use banana::token::{decode_b128, encode_b128, RawToken, TokenKind};
use bytes::{BufMut, Bytes, BytesMut};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_b128_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("b128");
    for &value in &[0u64, 127, 16_384, u32::MAX as u64, u64::MAX] {
        group.bench_with_input(format!("encode/{value}"), &value, |b, &value| {
            b.iter(|| {
                let mut buf = BytesMut::new();
                encode_b128(black_box(value), &mut buf);
                black_box(buf);
            });
        });

        let mut encoded = BytesMut::new();
        encode_b128(value, &mut encoded);
        encoded.put_u8(TokenKind::Int.as_u8()); // stand-in type byte terminates the header
        let encoded = encoded.freeze();
        group.bench_with_input(format!("decode/{value}"), &encoded, |b, encoded| {
            b.iter(|| black_box(decode_b128(black_box(encoded)).unwrap()));
        });
    }
    group.finish();
}

fn bench_string_token_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("string_token");
    for &len in &[0usize, 16, 256, 4096] {
        let body = vec![b'x'; len];
        group.bench_with_input(format!("encode/{len}"), &body, |b, body| {
            b.iter(|| {
                let token = RawToken::with_body(TokenKind::String, Bytes::copy_from_slice(body));
                let mut buf = BytesMut::new();
                token.encode_into(&mut buf);
                black_box(buf);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_b128_round_trip, bench_string_token_encode);
criterion_main!(benches);
