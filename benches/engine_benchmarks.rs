//! # AdaptiveDrive Performance Benchmarks
//!
//! ## Benchmark Categories
//!
//! - **Classification**: rule evaluation over the whole context space
//! - **Selection**: filter + shuffle on seed and large catalogs
//! - **Strategies**: local vs. remote playlist construction
//!
//! ## Running Benchmarks
//!
//! ```bash
//! cargo bench
//! cargo bench selection
//! ```

use adaptive_drive::catalog::{AudioFeatures, Catalog, Category, Track};
use adaptive_drive::classifier::classify;
use adaptive_drive::context::{DriveContext, Weather};
use adaptive_drive::selection::{
    select, LocalCatalogStrategy, PlaylistStrategy, RemoteCatalogStrategy,
};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::hint::black_box;

const CATEGORIES: [Category; 8] = [
    Category::Acoustic,
    Category::Rock,
    Category::Jazz,
    Category::Pop,
    Category::Electro,
    Category::Chill,
    Category::Classical,
    Category::Slow,
];

/// Synthetic catalog cycling through every known category.
fn synthetic_tracks(len: usize) -> Vec<Track> {
    (0..len)
        .map(|i| Track {
            id: format!("t{i}"),
            name: format!("Track {i}"),
            artist: format!("Artist {}", i % 50),
            duration_secs: 120 + (i % 240) as u32,
            category: CATEGORIES[i % CATEGORIES.len()].clone(),
            cover_art: String::new(),
            uri: None,
            features: AudioFeatures::default(),
        })
        .collect()
}

fn every_context() -> Vec<DriveContext> {
    let mut contexts = Vec::new();
    for speed in [0, 45, 90, 91, 130] {
        for hour in 0..24 {
            for weather in Weather::ALL {
                if let Ok(context) = DriveContext::new(speed, hour, weather) {
                    contexts.push(context);
                }
            }
        }
    }
    contexts
}

fn benchmark_classification(c: &mut Criterion) {
    let mut group = c.benchmark_group("classification");
    let contexts = every_context();

    group.bench_function("classify_all_contexts", |b| {
        b.iter(|| {
            for context in &contexts {
                black_box(classify(black_box(context)));
            }
        });
    });

    group.finish();
}

fn benchmark_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("selection");
    let seed = Catalog::seed();
    let preferred = [Category::Rock, Category::Electro, Category::Pop];

    group.bench_function("seed_catalog", |b| {
        let mut rng = StdRng::seed_from_u64(1);
        b.iter(|| select(black_box(&preferred), seed.tracks(), None, 5, &mut rng));
    });

    for size in [100, 1_000, 10_000] {
        let tracks = synthetic_tracks(size);
        group.bench_with_input(BenchmarkId::new("synthetic", size), &tracks, |b, tracks| {
            let mut rng = StdRng::seed_from_u64(2);
            b.iter(|| select(black_box(&preferred), tracks, Some(20), 5, &mut rng));
        });
    }

    group.bench_function("fallback_path", |b| {
        let tracks = synthetic_tracks(1_000);
        let none: [Category; 0] = [];
        let mut rng = StdRng::seed_from_u64(3);
        b.iter(|| select(black_box(&none[..]), &tracks, None, 5, &mut rng));
    });

    group.finish();
}

fn benchmark_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("strategies");
    let tracks = synthetic_tracks(1_000);
    let context = DriveContext::new(120, 22, Weather::Rain).unwrap_or_default();

    group.bench_function("local", |b| {
        let strategy = LocalCatalogStrategy::default();
        let mut rng = StdRng::seed_from_u64(4);
        b.iter(|| strategy.build(black_box(&context), &tracks, &mut rng));
    });

    group.bench_function("remote_high_speed", |b| {
        let strategy = RemoteCatalogStrategy::default();
        let mut rng = StdRng::seed_from_u64(5);
        b.iter(|| strategy.build(black_box(&context), &tracks, &mut rng));
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_classification,
    benchmark_selection,
    benchmark_strategies
);
criterion_main!(benches);
