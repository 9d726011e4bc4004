use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use bncsv::{decode_to_vec, encode_to_vec, encode_with_options, CanonicalNumber, CodecOptions, IterSource};

fn price_table(rows: usize, columns: usize) -> Vec<u8> {
    let mut csv = String::new();
    for row in 0..rows {
        for column in 0..columns {
            if column > 0 {
                csv.push(',');
            }
            let cents = (row * 7919 + column * 104_729) % 100_000;
            csv.push_str(&format!("{}.{:02}", cents / 100, cents % 100));
        }
        csv.push('\n');
    }
    csv.into_bytes()
}

fn benchmark_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    for rows in [10, 1_000, 10_000].iter() {
        let csv = price_table(*rows, 8);
        group.throughput(Throughput::Bytes(csv.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &csv, |b, csv| {
            b.iter(|| encode_to_vec(black_box(csv)))
        });
    }
    group.finish();
}

fn benchmark_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    for rows in [10, 1_000, 10_000].iter() {
        let binary = encode_to_vec(&price_table(*rows, 8)).unwrap();
        group.throughput(Throughput::Bytes(binary.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &binary, |b, binary| {
            b.iter(|| decode_to_vec(black_box(binary)))
        });
    }
    group.finish();
}

fn benchmark_chunk_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_chunk_size");
    let csv = price_table(1_000, 8);

    for chunk in [16, 256, 4096].iter() {
        let options = CodecOptions::new().with_chunk_size(*chunk);
        group.bench_with_input(BenchmarkId::from_parameter(chunk), chunk, |b, &chunk| {
            b.iter(|| {
                let mut out = Vec::new();
                encode_with_options(IterSource::new(csv.chunks(chunk)), &mut out, &options)
                    .map(|_| out)
            })
        });
    }
    group.finish();
}

fn benchmark_number_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("number_parse");

    let short = b"42.91";
    let long = b"-123456789012345678901234567890.123456789";

    group.bench_function("short", |b| b.iter(|| CanonicalNumber::parse(black_box(short))));
    group.bench_function("long", |b| b.iter(|| CanonicalNumber::parse(black_box(long))));
    group.bench_function("magnitude_big", |b| {
        let number = CanonicalNumber::parse(long).unwrap();
        b.iter(|| black_box(&number).magnitude())
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_encode,
    benchmark_decode,
    benchmark_chunk_sizes,
    benchmark_number_parse
);
criterion_main!(benches);
