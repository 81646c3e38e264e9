//! Profit Predictor - Main Entry Point

use clap::Parser;
use profit_predictor::cli::{cmd_predict, cmd_serve, cmd_train, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "profit_predictor=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve { host, port, model }) => {
            cmd_serve(host, port, model).await?;
        }
        Some(Commands::Train { data, output, name, alpha, infer_schema_rows }) => {
            cmd_train(&data, &output, name.as_deref(), alpha, infer_schema_rows)?;
        }
        Some(Commands::Predict { model, rnd, admin, marketing, state, strict }) => {
            cmd_predict(&model, rnd, admin, marketing, &state, strict)?;
        }
        None => {
            cmd_serve(None, None, None).await?;
        }
    }

    Ok(())
}
