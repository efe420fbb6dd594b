//! Kolosal Classify - Main Entry Point
//!
//! Experiment pipeline and model server for tabular classification.

use clap::Parser;
use kolosal_classify::cli::{cmd_predict, cmd_runs, cmd_serve, cmd_train, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kolosal_classify=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train { config, experiment, tracking_dir, seed, cv_folds, test_fraction } => {
            let pipeline_config = config.as_deref();
            let complete = tokio::task::block_in_place(|| {
                cmd_train(pipeline_config, experiment, tracking_dir, seed, cv_folds, test_fraction)
            })?;
            if !complete {
                anyhow::bail!("some candidates were not recorded");
            }
        }
        Commands::Runs { experiment, tracking_dir, best } => {
            cmd_runs(&experiment, tracking_dir, best.as_deref())?;
        }
        Commands::Predict { model, features } => {
            cmd_predict(&model, &features)?;
        }
        Commands::Serve { model, host, port } => {
            cmd_serve(model, host, port).await?;
        }
    }

    Ok(())
}
