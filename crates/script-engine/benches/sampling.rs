use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rust_decimal::Decimal;
use script_engine::sampling::{mean, median, price_volatility, take_samples};

fn price_series(len: usize) -> Vec<Decimal> {
    (0..len)
        .map(|i| Decimal::from(1_000 + (i * 7919) % 97))
        .collect()
}

fn bench_sampling(c: &mut Criterion) {
    let prices = price_series(86_400);

    c.bench_function("take_samples_60x60", |b| {
        b.iter(|| take_samples(black_box(&prices), 60, 60))
    });

    c.bench_function("median_volatility_300x100", |b| {
        b.iter(|| price_volatility(black_box(&prices), 300, 100, median))
    });

    c.bench_function("mean_volatility_1x3600", |b| {
        b.iter(|| price_volatility(black_box(&prices), 1, 3_600, mean))
    });
}

criterion_group!(benches, bench_sampling);
criterion_main!(benches);
