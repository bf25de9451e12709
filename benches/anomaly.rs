//! Benchmarks for decomposition strategies and outlier detectors.

use anofox_anomaly::core::TimeSeries;
use anofox_anomaly::detection::{Gesd, Iqr, OutlierDetector};
use anofox_anomaly::seasonality::{time_decompose, DecomposeConfig};
use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn generate_daily(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            100.0
                + 0.05 * i as f64
                + 8.0 * (2.0 * std::f64::consts::PI * i as f64 / 7.0).sin()
                + ((i * 31 % 17) as f64 - 8.0) * 0.2
                + if i % 97 == 0 { 40.0 } else { 0.0 }
        })
        .collect()
}

fn make_ts(values: Vec<f64>) -> TimeSeries {
    let base = Utc.with_ymd_and_hms(2017, 1, 1, 0, 0, 0).unwrap();
    let timestamps = (0..values.len())
        .map(|i| base + Duration::days(i as i64))
        .collect();
    TimeSeries::univariate(timestamps, values).unwrap()
}

fn bench_detectors(c: &mut Criterion) {
    let mut group = c.benchmark_group("outlier_detectors");

    for size in [128, 512, 2048].iter() {
        let residual: Vec<f64> = generate_daily(*size)
            .iter()
            .enumerate()
            .map(|(i, v)| v - 100.0 - 0.05 * i as f64)
            .collect();

        group.bench_with_input(BenchmarkId::new("IQR", size), size, |b, _| {
            let detector = Iqr::default();
            b.iter(|| detector.detect(black_box(&residual)))
        });

        group.bench_with_input(BenchmarkId::new("GESD", size), size, |b, _| {
            let detector = Gesd::default();
            b.iter(|| detector.detect(black_box(&residual)))
        });
    }

    group.finish();
}

fn bench_decomposition(c: &mut Criterion) {
    let mut group = c.benchmark_group("decomposition");

    for size in [425, 1460].iter() {
        let ts = make_ts(generate_daily(*size));

        group.bench_with_input(BenchmarkId::new("stl", size), size, |b, _| {
            let config = DecomposeConfig::stl();
            b.iter(|| time_decompose(black_box(&ts), "value", &config))
        });

        group.bench_with_input(BenchmarkId::new("twitter", size), size, |b, _| {
            let config = DecomposeConfig::twitter();
            b.iter(|| time_decompose(black_box(&ts), "value", &config))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_detectors, bench_decomposition);
criterion_main!(benches);
