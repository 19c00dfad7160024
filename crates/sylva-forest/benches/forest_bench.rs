//! Criterion benchmarks for sylva-forest: committee growth and scoring.

use criterion::{Criterion, criterion_group, criterion_main};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use sylva_forest::{Committee, Dataset, ForestConfig, OobMode};

fn make_classification(n_examples: usize, n_features: usize, seed: u64) -> Dataset {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut features = Vec::with_capacity(n_examples);
    let mut labels = Vec::with_capacity(n_examples);
    for i in 0..n_examples {
        let label = i % 2;
        labels.push(label);
        let row: Vec<f64> = (0..n_features)
            .map(|f| {
                let base = if f < 3 { label as f64 * 1.5 } else { 0.0 };
                base + rng.r#gen::<f64>()
            })
            .collect();
        features.push(row);
    }
    Dataset::new(features, labels).unwrap()
}

fn bench_grow(c: &mut Criterion) {
    let data = make_classification(500, 20, 42);

    for committee in [Committee::Bagging, Committee::Boosting, Committee::RandomForest] {
        let cfg = ForestConfig::new(committee).with_n_trees(50);
        c.bench_function(&format!("grow_{}_500x20_50trees", committee.name()), |b| {
            b.iter(|| {
                let mut d = data.clone();
                let mut rng = ChaCha8Rng::seed_from_u64(42);
                cfg.fit(&mut d, &mut rng).unwrap()
            });
        });
    }
}

fn bench_grow_with_oob(c: &mut Criterion) {
    let data = make_classification(500, 20, 42);
    let cfg = ForestConfig::new(Committee::RandomForest)
        .with_n_trees(50)
        .with_oob_mode(OobMode::Enabled);

    c.bench_function("grow_RandomForest_oob_500x20_50trees", |b| {
        b.iter(|| {
            let mut d = data.clone();
            let mut rng = ChaCha8Rng::seed_from_u64(42);
            cfg.fit(&mut d, &mut rng).unwrap()
        });
    });
}

fn bench_classify_batch(c: &mut Criterion) {
    let mut data = make_classification(500, 20, 42);
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let forest = ForestConfig::new(Committee::RandomForest)
        .with_n_trees(50)
        .fit(&mut data, &mut rng)
        .unwrap()
        .into_forest();

    c.bench_function("classify_batch_500x20_50trees", |b| {
        b.iter(|| forest.classify_batch(data.features()).unwrap());
    });
}

criterion_group!(benches, bench_grow, bench_grow_with_oob, bench_classify_batch);
criterion_main!(benches);
