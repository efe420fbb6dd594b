//! Integration test: inference adapter against a model trained on the reference dataset

use kolosal_classify::prelude::*;
use kolosal_classify::training::LogisticRegression;

fn trained_adapter() -> InferenceAdapter {
    let dataset = Dataset::reference().unwrap();
    let model = Estimator::LogisticRegression(LogisticRegression::new().with_max_iter(200))
        .fit(dataset.features(), dataset.labels(), dataset.n_classes())
        .unwrap();
    let bundle = ModelBundle::new(
        "LogisticRegression",
        dataset.feature_names().to_vec(),
        dataset.label_map().clone(),
        model,
    )
    .unwrap();
    InferenceAdapter::from_bundle(bundle)
}

#[test]
fn test_setosa_sample() {
    let adapter = trained_adapter();
    let labels = adapter.predict_labels(&[vec![5.1, 3.5, 1.4, 0.2]]).unwrap();
    assert_eq!(labels, vec!["setosa"]);
}

#[test]
fn test_short_row_is_shape_error() {
    let adapter = trained_adapter();
    let err = adapter.predict_labels(&[vec![5.1, 3.5, 1.4]]).unwrap_err();
    assert!(matches!(err, KolosalError::DataShapeError { .. }));
}

#[test]
fn test_one_bad_row_fails_whole_batch() {
    let adapter = trained_adapter();
    let rows = vec![vec![5.1, 3.5, 1.4, 0.2], vec![6.0, 2.2, 5.0, 1.5, 9.9]];
    assert!(adapter.predict_labels(&rows).is_err());
}

#[test]
fn test_order_is_preserved() {
    let adapter = trained_adapter();
    let setosa = vec![5.1, 3.5, 1.4, 0.2];
    let virginica = vec![7.7, 3.0, 6.1, 2.3];

    let single_a = adapter.predict_labels(&[setosa.clone()]).unwrap();
    let single_b = adapter.predict_labels(&[virginica.clone()]).unwrap();
    let batch = adapter
        .predict_labels(&[setosa.clone(), virginica.clone(), setosa])
        .unwrap();

    assert_eq!(batch, vec![single_a[0].clone(), single_b[0].clone(), single_a[0].clone()]);
    assert_eq!(batch[1], "virginica");
}

#[test]
fn test_concurrent_callers_share_one_model() {
    let adapter = trained_adapter();
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let adapter = adapter.clone();
            std::thread::spawn(move || adapter.predict_labels(&[vec![5.1, 3.5, 1.4, 0.2]]).unwrap())
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), vec!["setosa"]);
    }
}

#[test]
fn test_recorded_bundle_loads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig::default().with_tracking_dir(dir.path());
    let report = Pipeline::new(config.clone()).run(&config.run_context()).unwrap();
    let reference = report.outcome("RandomForest").unwrap().reference().unwrap();

    let adapter = InferenceAdapter::load(reference.model_path()).unwrap();
    assert_eq!(adapter.n_features(), 4);
    assert_eq!(adapter.label_map().names(), ["setosa", "versicolor", "virginica"]);
    assert_eq!(adapter.predict_labels(&[vec![5.1, 3.5, 1.4, 0.2]]).unwrap(), vec!["setosa"]);
}
