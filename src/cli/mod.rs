//! Profit predictor CLI module
//!
//! Command-line interface for serving the API, provisioning the default
//! model offline and running one-off predictions.

use clap::{Parser, Subcommand};
use colored::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::inference::{
    PredictionInput, ProfitModel, ADMINISTRATION_FIELD, MARKETING_SPEND_FIELD, RND_SPEND_FIELD,
    STATE_FIELD,
};
use crate::preprocessing::CategoryPolicy;
use crate::training::{TrainEngine, TrainingConfig};
use crate::utils::DataLoader;

fn dim(s: &str) -> ColoredString { s.truecolor(100, 100, 100) }
fn ok(s: &str) -> ColoredString { s.truecolor(100, 210, 120) }

fn step_run(msg: &str) {
    print!("  {} {}... ", "›".truecolor(120, 170, 255), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn kv(key: &str, val: &str) {
    println!("  {} {}", key.truecolor(140, 140, 140), val.white());
}

#[derive(Parser)]
#[command(name = "profit-predictor")]
#[command(about = "Train and serve linear regression profit models")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Host address to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Default model file used when requests do not upload one
        #[arg(short, long)]
        model: Option<PathBuf>,
    },

    /// Fit a model on a CSV or JSON dataset and write it to disk
    Train {
        /// Dataset whose last column is the target
        #[arg(short, long)]
        data: PathBuf,

        /// Output model file
        #[arg(short, long)]
        output: PathBuf,

        /// Name stored in the model
        #[arg(short, long)]
        name: Option<String>,

        /// L2 regularization strength, 0 for ordinary least squares
        #[arg(long, default_value_t = 0.0)]
        alpha: f64,

        /// Rows scanned to infer the CSV schema, 0 scans the whole file
        #[arg(long, default_value_t = 1000)]
        infer_schema_rows: usize,
    },

    /// Predict profit for one company
    Predict {
        /// Trained model file
        #[arg(short, long)]
        model: PathBuf,

        #[arg(long)]
        rnd: f64,

        #[arg(long)]
        admin: f64,

        #[arg(long)]
        marketing: f64,

        /// california, florida or new-york
        #[arg(long)]
        state: String,

        /// Fail on unrecognized states instead of encoding them as zeros
        #[arg(long)]
        strict: bool,
    },
}

pub async fn cmd_serve(
    host: Option<String>,
    port: Option<u16>,
    model: Option<PathBuf>,
) -> anyhow::Result<()> {
    use crate::server::{run_server, ServerConfig};

    let mut config = ServerConfig::default();
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(model) = model {
        config.default_model_path = model;
    }

    println!();
    println!("  {}", "Profit Predictor".white().bold());
    kv("API    ", &format!("http://{}:{}/api", config.host, config.port));
    kv("Model  ", &config.default_model_path.display().to_string());
    println!("  {}", dim("ctrl+c to stop"));
    println!();

    run_server(config).await
}

pub fn cmd_train(
    data: &Path,
    output: &Path,
    name: Option<&str>,
    alpha: f64,
    infer_schema_rows: usize,
) -> anyhow::Result<()> {
    let name = name
        .map(str::to_string)
        .or_else(|| output.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "model".to_string());

    step_run("Loading data");
    let start = Instant::now();
    let df = DataLoader::new()
        .with_infer_schema_length((infer_schema_rows > 0).then_some(infer_schema_rows))
        .load_path(data)?;
    step_done(&format!("{} rows × {} cols in {:?}", df.height(), df.width(), start.elapsed()));

    step_run("Fitting linear regression");
    let mut engine = TrainEngine::new(TrainingConfig::new(name).with_alpha(alpha));
    engine.fit(&df)?;
    let metrics = engine.metrics().cloned().unwrap_or_default();
    step_done(&format!("{:.3}s", metrics.training_time_secs));

    kv("features", &engine.feature_names().join(", "));
    kv("r2      ", &format!("{:.4}", metrics.r2));
    kv("mae     ", &format!("{:.4}", metrics.mae));

    engine.into_model()?.save(output)?;
    println!("  {} Model written to {}", ok("✓"), output.display());
    Ok(())
}

pub fn cmd_predict(
    model_path: &Path,
    rnd: f64,
    admin: f64,
    marketing: f64,
    state: &str,
    strict: bool,
) -> anyhow::Result<()> {
    let model = ProfitModel::load(model_path)?;

    let fields = HashMap::from([
        (RND_SPEND_FIELD.to_string(), rnd.to_string()),
        (ADMINISTRATION_FIELD.to_string(), admin.to_string()),
        (MARKETING_SPEND_FIELD.to_string(), marketing.to_string()),
        (STATE_FIELD.to_string(), state.to_string()),
    ]);
    let input = PredictionInput::from_fields(&fields)?;
    let features = input.feature_vector(CategoryPolicy::from_strict_flag(strict))?;
    let prediction = model.predict_one(&features)?;

    kv("model     ", &model.name);
    kv("prediction", &format!("{:.2}", prediction));
    Ok(())
}
