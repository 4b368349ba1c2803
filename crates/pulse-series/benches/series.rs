use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pulse_facts::Granularity;
use pulse_series::{Forecaster, MetricSample, SeasonalityDetector, TrendAnalyzer};

fn ninety_days() -> Vec<MetricSample> {
    let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    (0..90)
        .map(|i| {
            let weekday_load = [42.0, 40.0, 37.0, 38.0, 33.0, 9.0, 6.0][i % 7];
            MetricSample::new(start + Duration::days(i as i64), weekday_load + (i as f64) * 0.2)
        })
        .collect()
}

fn bench_series(c: &mut Criterion) {
    let samples = ninety_days();

    c.bench_function("trend_90d", |b| b.iter(|| TrendAnalyzer::analyze(black_box(&samples))));
    c.bench_function("seasonality_90d", |b| {
        b.iter(|| SeasonalityDetector::detect(black_box(&samples), Granularity::Daily))
    });
    c.bench_function("forecast_90d_h30", |b| {
        b.iter(|| Forecaster::forecast(black_box(&samples), 30, Granularity::Daily))
    });
}

criterion_group!(benches, bench_series);
criterion_main!(benches);
