//! Performance benchmarks for the analysis engine
//!
//! Run with: cargo bench --bench anova_benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fieldstat_core::anova::{run, Transform};
use fieldstat_shared::DataFrame;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Deterministic pseudo-noise so runs are comparable.
fn noise(rng: &mut StdRng) -> f64 {
    rng.gen::<f64>() - 0.5
}

fn within_frame(subjects: usize) -> DataFrame {
    let mut seed = StdRng::seed_from_u64(42);
    let mut subs = Vec::new();
    let mut angle = Vec::new();
    let mut noise_col = Vec::new();
    let mut values = Vec::new();
    for s in 0..subjects {
        for a in 0..3 {
            for n in 0..2 {
                subs.push(format!("s{:03}", s));
                angle.push(format!("a{}", a));
                noise_col.push(format!("n{}", n));
                values.push(500.0 + 60.0 * a as f64 + 40.0 * n as f64 + 30.0 * noise(&mut seed));
            }
        }
    }
    let mut df = DataFrame::new();
    df.add_labels("sub", subs).unwrap();
    df.add_labels("angle", angle).unwrap();
    df.add_labels("noise", noise_col).unwrap();
    df.add_numeric("rt", values).unwrap();
    df
}

fn mixed_frame(per_group: usize) -> DataFrame {
    let mut seed = StdRng::seed_from_u64(7);
    let mut subs = Vec::new();
    let mut group = Vec::new();
    let mut phase = Vec::new();
    let mut values = Vec::new();
    for g in 0..2 {
        for s in 0..per_group {
            for p in 0..4 {
                subs.push(format!("s{:03}", g * per_group + s));
                group.push(format!("g{}", g));
                phase.push(format!("p{}", p));
                values.push(10.0 + 2.0 * g as f64 + 0.8 * p as f64 + noise(&mut seed));
            }
        }
    }
    let mut df = DataFrame::new();
    df.add_labels("sub", subs).unwrap();
    df.add_labels("group", group).unwrap();
    df.add_labels("phase", phase).unwrap();
    df.add_numeric("score", values).unwrap();
    df
}

fn bench_within(c: &mut Criterion) {
    let mut group = c.benchmark_group("within_3x2");
    for subjects in [10usize, 50, 200] {
        let df = within_frame(subjects);
        group.bench_with_input(
            BenchmarkId::from_parameter(subjects),
            &df,
            |b, frame| {
                b.iter(|| {
                    let result = run(
                        black_box(frame),
                        "rt",
                        &["angle", "noise"],
                        &[],
                        "sub",
                        None,
                        Transform::None,
                        0.05,
                    )
                    .unwrap();
                    black_box(result)
                });
            },
        );
    }
    group.finish();
}

fn bench_mixed(c: &mut Criterion) {
    let df = mixed_frame(30);
    c.bench_function("mixed_2x4_30_per_group", |b| {
        b.iter(|| {
            let result = run(
                black_box(&df),
                "score",
                &["phase"],
                &["group"],
                "sub",
                None,
                Transform::None,
                0.05,
            )
            .unwrap();
            black_box(result)
        });
    });
}

fn bench_winsorized(c: &mut Criterion) {
    let df = within_frame(50);
    c.bench_function("within_3x2_winsor10", |b| {
        b.iter(|| {
            let result = run(
                black_box(&df),
                "rt",
                &["angle", "noise"],
                &[],
                "sub",
                None,
                Transform::Winsor10,
                0.05,
            )
            .unwrap();
            black_box(result)
        });
    });
}

criterion_group!(benches, bench_within, bench_mixed, bench_winsorized);
criterion_main!(benches);
