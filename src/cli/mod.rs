//! Kolosal Classify CLI Module
//!
//! Command-line interface for running experiments, inspecting runs,
//! predicting with a saved model and serving it over HTTP.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::PipelineConfig;
use crate::evaluation::RunMetrics;
use crate::inference::InferenceAdapter;
use crate::pipeline::{CandidateOutcome, Pipeline};
use crate::server::{run_server, ServerConfig};
use crate::tracking::{FileRunStore, RunStore};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }
fn bad(s: &str) -> ColoredString    { s.truecolor(235, 100, 100) }

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn metrics_line(m: &RunMetrics) -> String {
    format!(
        "{} {:.4}  {} {:.4}  {} {:.4} ± {:.4}",
        muted("acc"),
        m.accuracy,
        muted("f1"),
        m.f1,
        muted("cv"),
        m.cv_mean,
        m.cv_std
    )
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "kolosal-classify")]
#[command(author = "KolosalAI")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train, compare, track and serve classification models")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fit, evaluate and record every configured candidate
    Train {
        /// JSON pipeline configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Experiment name
        #[arg(short, long)]
        experiment: Option<String>,

        /// Root directory for recorded runs
        #[arg(long)]
        tracking_dir: Option<PathBuf>,

        /// Train/test split seed
        #[arg(long)]
        seed: Option<u64>,

        /// Number of cross-validation folds
        #[arg(long)]
        cv_folds: Option<usize>,

        /// Held-out fraction
        #[arg(long)]
        test_fraction: Option<f64>,
    },

    /// List recorded runs of an experiment
    Runs {
        /// Experiment name
        #[arg(short, long)]
        experiment: String,

        /// Root directory for recorded runs
        #[arg(long)]
        tracking_dir: Option<PathBuf>,

        /// Only show the best run by this metric
        #[arg(long)]
        best: Option<String>,
    },

    /// Predict labels for feature rows
    Predict {
        /// Model bundle (artifacts/model/model.json of a run)
        #[arg(short, long)]
        model: PathBuf,

        /// Comma-separated feature row, repeatable
        #[arg(short, long = "features", required = true)]
        features: Vec<String>,
    },

    /// Serve a model over HTTP
    Serve {
        /// Model bundle
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Server host
        #[arg(long)]
        host: Option<String>,

        /// Server port
        #[arg(short, long)]
        port: Option<u16>,
    },
}

/// Parse "5.1,3.5,1.4,0.2" into a feature row
pub fn parse_feature_row(raw: &str) -> anyhow::Result<Vec<f64>> {
    raw.split(',')
        .map(|v| {
            let v = v.trim();
            v.parse::<f64>()
                .map_err(|e| anyhow::anyhow!("invalid feature value {:?}: {}", v, e))
        })
        .collect()
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_train(
    config_path: Option<&Path>,
    experiment: Option<String>,
    tracking_dir: Option<PathBuf>,
    seed: Option<u64>,
    cv_folds: Option<usize>,
    test_fraction: Option<f64>,
) -> anyhow::Result<bool> {
    section("Train");

    let mut config = match config_path {
        Some(path) => PipelineConfig::from_json_file(path)?.with_env_overrides()?,
        None => PipelineConfig::from_env()?,
    };
    if let Some(name) = experiment {
        config = config.with_experiment_name(name);
    }
    if let Some(dir) = tracking_dir {
        config = config.with_tracking_dir(dir);
    }
    if let Some(seed) = seed {
        config = config.with_seed(seed);
    }
    if let Some(folds) = cv_folds {
        config = config.with_cv_folds(folds);
    }
    if let Some(fraction) = test_fraction {
        config = config.with_test_fraction(fraction);
    }

    let ctx = config.run_context();
    println!("  {:<16} {}", muted("Experiment"), ctx.experiment_name.white());
    println!("  {:<16} {}", muted("Tracking dir"), ctx.tracking_dir.display().to_string().white());

    step_run(&format!("Running {} candidates", config.candidates.len()));
    let start = Instant::now();
    let report = Pipeline::new(config).run(&ctx)?;
    step_done(&format!("{:?}", start.elapsed()));

    println!();
    for outcome in &report.outcomes {
        match outcome {
            CandidateOutcome::Recorded { candidate_id, metrics, reference } => {
                println!("  {} {:<20} {}", ok("✓"), candidate_id.white(), metrics_line(metrics));
                println!("    {}", dim(&reference.run_dir.display().to_string()));
            }
            CandidateOutcome::PersistFailed { candidate_id, metrics, error } => {
                println!("  {} {:<20} {}", bad("!"), candidate_id.white(), metrics_line(metrics));
                println!("    {} {}", bad("not recorded:"), error);
            }
            CandidateOutcome::FitFailed { candidate_id, error } => {
                println!("  {} {:<20} {}", bad("✗"), candidate_id.white(), error);
            }
        }
    }
    println!();

    Ok(report.is_complete())
}

pub fn cmd_runs(experiment: &str, tracking_dir: Option<PathBuf>, best: Option<&str>) -> anyhow::Result<()> {
    section("Runs");

    let root = match tracking_dir {
        Some(dir) => dir,
        None => PipelineConfig::from_env()?.tracking_dir,
    };
    let store = FileRunStore::new(root);

    let runs: Vec<_> = match best {
        Some(metric) => store.best_run(experiment, metric)?.into_iter().collect(),
        None => store.list_runs(experiment)?,
    };

    if runs.is_empty() {
        println!("  {}", dim(&format!("no runs recorded for '{}'", experiment)));
        println!();
        return Ok(());
    }

    for run in &runs {
        println!(
            "  {} {:<20} {}",
            accent(&run.run_id[..8.min(run.run_id.len())]),
            run.candidate_id.white(),
            metrics_line(&run.metrics)
        );
        println!(
            "    {} {}",
            dim(&run.created_at.to_rfc3339()),
            dim(&store.reference(run).model_path().display().to_string())
        );
    }
    println!();
    Ok(())
}

pub fn cmd_predict(model_path: &Path, features: &[String]) -> anyhow::Result<()> {
    let rows = features
        .iter()
        .map(|raw| parse_feature_row(raw))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let adapter = InferenceAdapter::load(model_path)?;
    let labels = adapter.predict_labels(&rows)?;

    for (raw, label) in features.iter().zip(&labels) {
        println!("  {:<32} {}", muted(raw), label.white().bold());
    }
    Ok(())
}

pub async fn cmd_serve(model: Option<PathBuf>, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let mut config = ServerConfig::default();
    if let Some(model) = model {
        config.model_path = model;
    }
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }

    section("Serve");
    println!("  {:<16} {}", muted("Model"), config.model_path.display().to_string().white());
    println!("  {:<16} {}", muted("Address"), format!("http://{}:{}", config.host, config.port).white());
    println!();

    run_server(config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_feature_row() {
        assert_eq!(parse_feature_row("5.1, 3.5,1.4,0.2").unwrap(), vec![5.1, 3.5, 1.4, 0.2]);
        assert!(parse_feature_row("5.1,abc").is_err());
    }

    #[test]
    fn test_predict_args() {
        let cli = Cli::try_parse_from([
            "kolosal-classify",
            "predict",
            "--model",
            "m.json",
            "--features",
            "1,2,3,4",
            "--features",
            "5,6,7,8",
        ])
        .unwrap();
        match cli.command {
            Commands::Predict { features, .. } => assert_eq!(features.len(), 2),
            _ => panic!("expected predict"),
        }
    }
}
