use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use tracing::info;

use codebloom_api::core::types::PredictionRequest;
use codebloom_api::ml::BackendHandle;
use codebloom_api::monitoring::TelemetryManager;
use codebloom_api::services::CyclePredictor;
use codebloom_api::{APIServerConfig, AppState, CodeBloomServer, Settings};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file (defaults to ./codebloom.toml when present)
    #[arg(short, long, global = true, env = "CODEBLOOM_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Predict the next period offline and print the result as JSON
    Predict {
        /// Past cycle lengths in days, oldest first
        #[arg(long, value_delimiter = ',', required = true)]
        cycles: Vec<i64>,
        /// Start date of the most recent period (YYYY-MM-DD)
        #[arg(long)]
        last_period: String,
    },
    /// Print the effective settings
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;

    let telemetry = TelemetryManager::init(Some(settings.telemetry_config()?))?;

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                settings.server.host = host;
            }
            if let Some(port) = port {
                settings.server.port = port;
            }

            let state = AppState::from_settings(&settings, telemetry).context("Failed to initialise services")?;
            info!(
                chat_enabled = settings.chat_enabled(),
                backend = ?state.predictor.backend().name(),
                "services ready"
            );

            CodeBloomServer::new(APIServerConfig::from(&settings), state).start().await?;
        }
        Commands::Predict { cycles, last_period } => {
            let predictor = CyclePredictor::new(BackendHandle::from_name(&settings.predictor.backend))
                .with_sequence_length(settings.predictor.sequence_length);
            let request = PredictionRequest {
                past_cycles: cycles,
                last_period_date: last_period,
                framework: None,
            };

            let prediction = tokio::task::spawn_blocking(move || predictor.predict_request(&request))
                .await
                .context("Prediction task panicked")??;

            println!("{}", serde_json::to_string_pretty(&prediction)?);
        }
        Commands::Config => {
            print!("{}", settings.to_toml()?);
        }
    }

    Ok(())
}
