// Allow our units.cents digit grouping convention (e.g., 100_00 = 100.00)
#![allow(clippy::inconsistent_digit_grouping)]

//! Rebalance benchmarks: plan computation, plan application, CSV parsing.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use folio::{compute_plan, Portfolio, Price, TargetAllocation, Ticker};

fn ticker(i: usize) -> Ticker {
    Ticker::new(&format!("S{i:04}"))
}

/// Deterministic universe of `n` tickers: prices, share counts and
/// target weights, generated with a xorshift32 PRNG.
struct Universe {
    holdings: Vec<(Ticker, u64)>,
    prices: Vec<(Ticker, Price)>,
    targets: TargetAllocation,
}

fn generate_universe(n: usize) -> Universe {
    let mut rng_state: u32 = 42;
    let mut next = || {
        rng_state ^= rng_state << 13;
        rng_state ^= rng_state >> 17;
        rng_state ^= rng_state << 5;
        rng_state
    };

    let mut holdings = Vec::with_capacity(n);
    let mut prices = Vec::with_capacity(n);
    let mut raw_weights = Vec::with_capacity(n);
    for i in 0..n {
        let t = ticker(i);
        prices.push((t, Price(10_00 + (next() % 500_000) as i64)));
        // Roughly a third of the universe is not held yet
        if next() % 3 != 0 {
            holdings.push((t, 1 + (next() % 1_000) as u64));
        }
        raw_weights.push((t, (next() % 100) as f64 + 1.0));
    }

    // 95% invested, 5% cash
    let sum: f64 = raw_weights.iter().map(|(_, w)| w).sum();
    let targets = TargetAllocation::from_weights(
        raw_weights.into_iter().map(|(t, w)| (t, w / sum * 0.95)),
    )
    .unwrap();

    Universe {
        holdings,
        prices,
        targets,
    }
}

/// Benchmark: compute_plan across universe sizes
fn bench_compute_plan(c: &mut Criterion) {
    let mut group = c.benchmark_group("rebalance/compute_plan");

    for n in [10, 100, 1_000] {
        let u = generate_universe(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &u, |b, u| {
            b.iter(|| {
                black_box(compute_plan(
                    &u.holdings,
                    100_000_00,
                    &u.targets,
                    &u.prices,
                ))
            });
        });
    }

    group.finish();
}

/// Benchmark: compute + apply against a Portfolio
fn bench_apply_plan(c: &mut Criterion) {
    let mut group = c.benchmark_group("rebalance/apply_plan");

    let u = generate_universe(100);
    let price_of = |t: &Ticker| {
        u.prices
            .iter()
            .find(|(p, _)| p == t)
            .map(|&(_, p)| p)
            .unwrap()
    };
    let mut portfolio = Portfolio::new("BENCH", "Bench", 100_000_00).unwrap();
    for &(t, shares) in &u.holdings {
        let price = price_of(&t);
        portfolio.add_holding(t, shares, price, price).unwrap();
    }
    let plan = compute_plan(&portfolio.share_counts(), portfolio.cash(), &u.targets, &u.prices).unwrap();

    group.bench_function("100_tickers", |b| {
        b.iter_batched(
            || portfolio.clone(),
            |mut p| black_box(p.apply_plan(&plan)),
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

/// Benchmark: parse a target CSV
fn bench_parse_targets(c: &mut Criterion) {
    let mut group = c.benchmark_group("rebalance/parse_targets");

    for n in [10, 500] {
        let mut csv = String::from("Name,Ticker,Current Price,Weightage\n");
        for i in 0..n {
            csv.push_str(&format!("Company {i},{},{}.50,{:.4}\n", ticker(i), 100 + i, 90.0 / n as f64));
        }
        group.bench_with_input(BenchmarkId::from_parameter(n), &csv, |b, csv| {
            b.iter(|| black_box(TargetAllocation::from_csv(csv)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_compute_plan,
    bench_apply_plan,
    bench_parse_targets,
);

criterion_main!(benches);
