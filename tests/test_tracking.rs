//! Integration test: run recorder layout and queries

use kolosal_classify::prelude::*;
use serde_json::json;
use std::sync::Barrier;

fn registry() -> CandidateRegistry {
    vec![
        CandidateSpec::new("tree", ModelKind::DecisionTree).with_param("max_depth", json!(1)),
        CandidateSpec::new("logit", ModelKind::LogisticRegression).with_param("max_iter", json!(200)),
    ]
    .into_iter()
    .collect()
}

fn run_once(dir: &std::path::Path, experiment: &str) -> PipelineReport {
    let config = PipelineConfig::default()
        .with_tracking_dir(dir)
        .with_experiment_name(experiment)
        .with_candidates(registry());
    Pipeline::new(config.clone()).run(&config.run_context()).unwrap()
}

#[test]
fn test_run_directory_layout() {
    let dir = tempfile::tempdir().unwrap();
    let report = run_once(dir.path(), "layout");
    let experiment_id = FileRunStore::experiment_id_for("layout");
    assert!(dir.path().join(&experiment_id).join("experiment.json").is_file());

    for reference in report.recorded() {
        let run_dir = &reference.run_dir;
        assert!(run_dir.starts_with(dir.path().join(&reference.experiment_id)));
        for file in [
            "run.json",
            "artifacts/confusion_matrix.png",
            "artifacts/confusion_matrix.json",
            "artifacts/classification_report.json",
            "artifacts/model/model.json",
        ] {
            assert!(run_dir.join(file).is_file(), "missing {}", file);
        }
        let png = std::fs::read(run_dir.join("artifacts/confusion_matrix.png")).unwrap();
        assert_eq!(&png[1..4], b"PNG");
    }
}

#[test]
fn test_record_contents() {
    let dir = tempfile::tempdir().unwrap();
    run_once(dir.path(), "contents");
    let store = FileRunStore::new(dir.path());

    let runs = store.list_runs("contents").unwrap();
    assert_eq!(runs.len(), 2);
    let tree = runs.iter().find(|r| r.candidate_id == "tree").unwrap();
    assert_eq!(tree.model_kind, ModelKind::DecisionTree);
    assert_eq!(tree.params["max_depth"], json!(1));
    assert_eq!(tree.experiment_name, "contents");
    assert_eq!(tree.cv_scores.len(), 5);
    assert_eq!(tree.n_test, 30);
    assert_eq!(tree.seed, 42);
}

#[test]
fn test_best_run_by_metric() {
    let dir = tempfile::tempdir().unwrap();
    run_once(dir.path(), "best");
    let store = FileRunStore::new(dir.path());

    // A depth-1 stump cannot separate three classes
    let best = store.best_run("best", "accuracy").unwrap().unwrap();
    assert_eq!(best.candidate_id, "logit");

    assert!(matches!(
        store.best_run("best", "roc_auc"),
        Err(KolosalError::ConfigError(_))
    ));
    assert!(store.best_run("never-ran", "f1").unwrap().is_none());
}

#[test]
fn test_experiments_are_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let a = run_once(dir.path(), "a");
    let b = run_once(dir.path(), "b");

    let id_a = &a.recorded().next().unwrap().experiment_id;
    let id_b = &b.recorded().next().unwrap().experiment_id;
    assert_ne!(id_a, id_b);

    let store = FileRunStore::new(dir.path());
    assert_eq!(store.list_runs("a").unwrap().len(), 2);
    assert_eq!(store.list_runs("b").unwrap().len(), 2);
}

#[test]
fn test_load_bundle_from_record() {
    let dir = tempfile::tempdir().unwrap();
    run_once(dir.path(), "bundle");
    let store = FileRunStore::new(dir.path());

    let record = store.best_run("bundle", "f1").unwrap().unwrap();
    let bundle = store.load_bundle(&store.reference(&record)).unwrap();
    assert_eq!(bundle.candidate_id, record.candidate_id);
    assert_eq!(bundle.label_map.names(), ["setosa", "versicolor", "virginica"]);
}

#[test]
fn test_existing_record_is_never_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let report = run_once(dir.path(), "immutable");
    let reference = report.recorded().next().unwrap();
    let before = std::fs::read(reference.run_dir.join("run.json")).unwrap();

    run_once(dir.path(), "immutable");
    let after = std::fs::read(reference.run_dir.join("run.json")).unwrap();
    assert_eq!(before, after);

    let store = FileRunStore::new(dir.path());
    assert_eq!(store.list_runs("immutable").unwrap().len(), 4);
}

fn stump_run() -> EvaluatedRun {
    let dataset = Dataset::reference().unwrap();
    let split = split(&dataset, 0.2, 42).unwrap();
    let folds = CrossValidator::new(CVStrategy::StratifiedKFold { n_splits: 3, shuffle: false });
    let candidate = CandidateSpec::new("stump", ModelKind::DecisionTree).with_param("max_depth", json!(1));
    evaluate(&candidate, &dataset, &split, &folds).unwrap()
}

/// Record from `threads` threads released together, one experiment name each
fn record_concurrently(root: &std::path::Path, names: &[String]) -> Vec<RunReference> {
    let run = stump_run();
    let store = FileRunStore::new(root);
    let barrier = Barrier::new(names.len());
    std::thread::scope(|scope| {
        let handles: Vec<_> = names
            .iter()
            .map(|name| {
                let (store, run, barrier) = (&store, &run, &barrier);
                scope.spawn(move || {
                    barrier.wait();
                    store.record(name, run).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
}

#[test]
fn test_concurrent_records_in_distinct_experiments_stay_reachable() {
    for _ in 0..5 {
        let dir = tempfile::tempdir().unwrap();
        let names: Vec<String> = (0..8).map(|i| format!("exp-{}", i)).collect();
        record_concurrently(dir.path(), &names);

        let store = FileRunStore::new(dir.path());
        for name in &names {
            assert_eq!(store.list_runs(name).unwrap().len(), 1, "runs of {} lost", name);
        }
    }
}

#[test]
fn test_concurrent_records_in_one_experiment_stay_reachable() {
    for _ in 0..5 {
        let dir = tempfile::tempdir().unwrap();
        let names = vec!["shared".to_string(); 8];
        let references = record_concurrently(dir.path(), &names);

        let first = &references[0].experiment_id;
        assert!(references.iter().all(|r| &r.experiment_id == first));

        let store = FileRunStore::new(dir.path());
        let runs = store.list_runs("shared").unwrap();
        assert_eq!(runs.len(), 8);
        for reference in &references {
            let loaded = store.load_run("shared", &reference.run_id).unwrap();
            assert_eq!(loaded.run_id, reference.run_id);
        }
    }
}
