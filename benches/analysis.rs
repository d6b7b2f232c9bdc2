//! Benchmarks for the indicator engine, scoring, batch scans and simulations.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use coinsight::prelude::*;

/// Generate realistic bars
fn generate_series(n: usize) -> PriceSeries {
  let mut bars = Vec::with_capacity(n);
  let mut price = 100.0;

  for i in 0..n {
    let change = ((i * 7 + 13) % 100) as f64 / 50.0 - 1.0; // Deterministic "random"
    let volatility = 2.0 + ((i * 3) % 10) as f64 / 5.0;

    let o = price;
    let c = (price + change).max(1.0);
    let h = o.max(c) + volatility * 0.5;
    let l = (o.min(c) - volatility * 0.5).max(0.5);
    let v = 1_000.0 + ((i * 11) % 17) as f64 * 100.0;

    bars.push(PriceBar::new(i as i64 * 86_400, o, h, l, c, v));
    price = c;
  }

  PriceSeries::new(bars).unwrap()
}

fn bench_indicator_frame(c: &mut Criterion) {
  let series = generate_series(1000);
  let engine = IndicatorEngine::default();

  c.bench_function("indicator_frame_1000_bars", |b| {
    b.iter(|| {
      let _ = black_box(engine.compute(black_box(&series)));
    })
  });
}

fn bench_scaling(c: &mut Criterion) {
  let engine = IndicatorEngine::default();

  let mut group = c.benchmark_group("scaling");

  for size in [100, 500, 1000, 5000].iter() {
    let series = generate_series(*size);

    group.bench_with_input(BenchmarkId::new("indicator_frame", size), size, |b, _| {
      b.iter(|| {
        let _ = black_box(engine.compute(black_box(&series)));
      })
    });
  }

  group.finish();
}

fn bench_scores(c: &mut Criterion) {
  let series = generate_series(500);
  let frame = IndicatorFrame::compute(&series);

  c.bench_function("technical_score", |b| {
    b.iter(|| {
      let _ = black_box(technical_score(black_box(&series), black_box(&frame)));
    })
  });

  c.bench_function("multi_indicator_consensus", |b| {
    b.iter(|| {
      let _ = black_box(multi_indicator_consensus(black_box(&series), black_box(&frame)));
    })
  });
}

fn bench_detectors(c: &mut Criterion) {
  let series = generate_series(1000);
  let frame = IndicatorFrame::compute(&series);

  c.bench_function("divergences_1000_bars", |b| {
    b.iter(|| {
      let _ = black_box(detect_divergences(
        black_box(&series),
        black_box(&frame),
        &DivergenceParams::default(),
      ));
    })
  });

  c.bench_function("drawdowns_1000_bars", |b| {
    b.iter(|| {
      let _ = black_box(analyze_drawdowns(black_box(&series)));
    })
  });
}

fn bench_parallel_screen(c: &mut Criterion) {
  let universe: Vec<(String, PriceSeries)> =
    (0..8).map(|i| (format!("SYM{i}"), generate_series(500 + i * 10))).collect();
  let instruments: Vec<(&str, &PriceSeries)> = universe.iter().map(|(s, p)| (s.as_str(), p)).collect();
  let engine = IndicatorEngine::default();
  let filter = ScreenFilter::default();

  c.bench_function("screen_parallel_8_instruments", |b| {
    b.iter(|| {
      let _ = black_box(screen_parallel(&engine, &filter, black_box(instruments.clone())));
    })
  });
}

fn bench_monte_carlo(c: &mut Criterion) {
  let series = generate_series(500);
  let params = MonteCarloParams::default().with_seed(42);

  c.bench_function("monte_carlo_1000_paths_30_days", |b| {
    b.iter(|| {
      let _ = black_box(monte_carlo(black_box(&series), black_box(&params)));
    })
  });
}

criterion_group!(
  benches,
  bench_indicator_frame,
  bench_scaling,
  bench_scores,
  bench_detectors,
  bench_parallel_screen,
  bench_monte_carlo,
);

criterion_main!(benches);
