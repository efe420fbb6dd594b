use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kolosal_classify::prelude::*;
use kolosal_classify::training::CVStrategy;
use serde_json::json;

fn candidates() -> Vec<CandidateSpec> {
    vec![
        CandidateSpec::new("logistic", ModelKind::LogisticRegression).with_param("max_iter", json!(200)),
        CandidateSpec::new("tree", ModelKind::DecisionTree).with_param("random_state", json!(0)),
        CandidateSpec::new("forest", ModelKind::RandomForest)
            .with_param("n_estimators", json!(100))
            .with_param("random_state", json!(42)),
    ]
}

fn bench_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("fit");
    group.sample_size(20);

    let dataset = Dataset::reference().unwrap();
    for candidate in candidates() {
        group.bench_with_input(BenchmarkId::new("reference", &candidate.id), &candidate, |b, candidate| {
            b.iter(|| {
                candidate
                    .build()
                    .unwrap()
                    .fit(black_box(dataset.features()), dataset.labels(), dataset.n_classes())
                    .unwrap()
            })
        });
    }

    group.finish();
}

fn bench_predict(c: &mut Criterion) {
    let mut group = c.benchmark_group("predict_labels");

    let dataset = Dataset::reference().unwrap();
    let rows: Vec<Vec<f64>> = dataset.features().rows().into_iter().map(|r| r.to_vec()).collect();

    for candidate in candidates() {
        let model = candidate
            .build()
            .unwrap()
            .fit(dataset.features(), dataset.labels(), dataset.n_classes())
            .unwrap();
        let bundle = ModelBundle::new(
            candidate.id.clone(),
            dataset.feature_names().to_vec(),
            dataset.label_map().clone(),
            model,
        )
        .unwrap();
        let adapter = InferenceAdapter::from_bundle(bundle);

        group.bench_with_input(BenchmarkId::new("batch_150", &candidate.id), &rows, |b, rows| {
            b.iter(|| adapter.predict_labels(black_box(rows)).unwrap())
        });
    }

    group.finish();
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");
    group.sample_size(10);

    let dataset = Dataset::reference().unwrap();
    let split = split(&dataset, 0.2, 42).unwrap();
    let folds = CrossValidator::new(CVStrategy::StratifiedKFold { n_splits: 5, shuffle: false });

    for candidate in candidates() {
        group.bench_with_input(BenchmarkId::new("cv5", &candidate.id), &candidate, |b, candidate| {
            b.iter(|| evaluate(black_box(candidate), &dataset, &split, &folds).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fit, bench_predict, bench_evaluate);
criterion_main!(benches);
