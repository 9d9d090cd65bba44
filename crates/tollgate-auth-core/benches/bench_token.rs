//! Benchmarks for token issuance and verification hot paths

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tollgate_auth_core::{crypto::constant_time_eq, AuthConfig, TokenCodec};
use tollgate_types::SessionId;

const PRIVATE_PEM: &str = include_str!("../tests/fixtures/signing.pem");
const PUBLIC_PEM: &str = include_str!("../tests/fixtures/signing.pub.pem");

fn codec() -> TokenCodec {
    TokenCodec::new(&AuthConfig::new("auth", "svcA", PRIVATE_PEM, PUBLIC_PEM)).unwrap()
}

fn bench_issue_pair(c: &mut Criterion) {
    let codec = codec();
    let session_id = SessionId::new("Zm9vYmFyYmF6cXV4Zm9vYmFyYmF6cXV4Zm9vYmFyYmE");

    c.bench_function("token_issue_pair", |b| {
        b.iter(|| {
            codec
                .issue_pair(black_box("alice"), black_box("svcA"), &session_id)
                .unwrap()
        });
    });
}

fn bench_verify(c: &mut Criterion) {
    let codec = codec();
    let pair = codec
        .issue_pair("alice", "svcA", &SessionId::new("bench-session"))
        .unwrap();

    let mut group = c.benchmark_group("token_verify");

    group.bench_function("access", |b| {
        b.iter(|| codec.decode_and_verify(black_box(&pair.access)).unwrap());
    });

    group.bench_function("refresh_for_revocation", |b| {
        b.iter(|| codec.decode_for_revocation(black_box(&pair.refresh)).unwrap());
    });

    // Rejections should be cheap: no RSA work before structure checks pass
    group.bench_function("reject_malformed", |b| {
        b.iter(|| codec.decode_and_verify(black_box("not.a.token")).is_err());
    });

    let mut tampered = pair.access.clone();
    tampered.pop();
    tampered.push(if pair.access.ends_with('A') { 'B' } else { 'A' });
    group.bench_function("reject_bad_signature", |b| {
        b.iter(|| codec.decode_and_verify(black_box(&tampered)).is_err());
    });

    group.finish();
}

fn bench_constant_time_eq(c: &mut Criterion) {
    let sizes = [32, 64, 128, 256];

    let mut group = c.benchmark_group("constant_time_eq");

    for size in sizes {
        let a: Vec<u8> = (0..size).map(|i| (i % 256) as u8).collect();
        let b: Vec<u8> = a.clone();

        group.bench_with_input(
            BenchmarkId::new("equal", size),
            &(a.clone(), b),
            |bench, (a, b)| {
                bench.iter(|| constant_time_eq(black_box(a), black_box(b)));
            },
        );

        let mut c = a.clone();
        c[0] ^= 0xFF;

        group.bench_with_input(
            BenchmarkId::new("diff_start", size),
            &(a.clone(), c),
            |bench, (a, c)| {
                bench.iter(|| constant_time_eq(black_box(a), black_box(c)));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_issue_pair, bench_verify, bench_constant_time_eq);
criterion_main!(benches);
