//! Benchmarks for neti wire encoding and message dispatch

use bytes::{Bytes, BytesMut};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use neti::message::encode_envelope;
use neti::wire::{decode_bytes, decode_number, decode_string, encode_bytes, encode_number, encode_string};
use neti::{Message, MessageKind, Registry};

#[derive(Debug)]
struct Sample {
    name: String,
    payload: Vec<u8>,
    seq: u64,
}

impl Message for Sample {
    fn code(&self) -> u16 {
        Self::CODE
    }

    fn name(&self) -> &str {
        "Sample"
    }

    fn serialize(&self, buf: &mut BytesMut) -> neti::Result<()> {
        encode_string(&self.name, buf)?;
        encode_bytes(&self.payload, buf)?;
        encode_number(self.seq, buf);
        Ok(())
    }
}

impl MessageKind for Sample {
    const CODE: u16 = 1;

    fn deserialize(buf: &mut Bytes) -> neti::Result<Self> {
        Ok(Sample {
            name: decode_string(buf)?,
            payload: decode_bytes(buf)?.to_vec(),
            seq: decode_number(buf)?,
        })
    }
}

fn sample(size: usize) -> Sample {
    Sample {
        name: "bench-service".to_string(),
        payload: vec![0xAB; size],
        seq: 42,
    }
}

fn codec_benchmarks(c: &mut Criterion) {
    let blob = vec![7u8; 4096];
    c.bench_function("encode_bytes_4k", |b| {
        b.iter(|| {
            let mut buf = BytesMut::with_capacity(blob.len() + 2);
            encode_bytes(black_box(&blob), &mut buf).unwrap();
            buf
        })
    });

    let mut encoded = BytesMut::new();
    encode_bytes(&blob, &mut encoded).unwrap();
    let encoded = encoded.freeze();
    c.bench_function("decode_bytes_4k", |b| {
        b.iter(|| {
            let mut buf = encoded.clone();
            decode_bytes(black_box(&mut buf)).unwrap()
        })
    });

    c.bench_function("encode_decode_string", |b| {
        b.iter(|| {
            let mut buf = BytesMut::new();
            encode_string(black_box("svcA-destination"), &mut buf).unwrap();
            decode_string(&mut buf.freeze()).unwrap()
        })
    });
}

fn envelope_benchmarks(c: &mut Criterion) {
    let mut registry = Registry::new();
    registry.register::<Sample>();

    for size in [64usize, 1024] {
        let msg = sample(size);
        c.bench_function(&format!("encode_envelope_{}", size), |b| {
            b.iter(|| encode_envelope(black_box(&msg)).unwrap())
        });

        let envelope = encode_envelope(&msg).unwrap().freeze();
        c.bench_function(&format!("registry_decode_{}", size), |b| {
            b.iter(|| registry.decode(black_box(envelope.clone())).unwrap())
        });
    }
}

criterion_group!(benches, codec_benchmarks, envelope_benchmarks);
criterion_main!(benches);
