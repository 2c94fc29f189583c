//! resilient-fetch command line client.
//!
//! # Architecture Overview
//!
//! ```text
//!   CLI args ──▶ config (TOML + RESILIENT_FETCH_ENV) ──▶ RequestClient
//!                                                             │
//!        ┌──────────────┬────────────────┬───────────────────┤
//!        ▼              ▼                ▼                   ▼
//!     Direct  ──▶    Relay     ──▶    Bridge     ──▶   ScriptCallback
//!                 (rotating)      (isolated task)      (GET only)
//!                                                             │
//!   stdout ◀── pretty JSON ◀──────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use resilient_fetch::client::{Method, RequestMode, RequestOptions};
use resilient_fetch::config::loader::{apply_env_override, load_config};
use resilient_fetch::config::{ClientConfig, Environment};
use resilient_fetch::observability::logging::init_logging;
use resilient_fetch::RequestClient;

#[derive(Parser)]
#[command(name = "resilient-fetch")]
#[command(about = "Fetch through direct, relay, bridge and script-callback fallbacks", long_about = None)]
struct Cli {
    /// Path to a TOML config file; defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured environment (development | production)
    #[arg(short, long)]
    env: Option<Environment>,

    /// Resolve total failure to {"error": true, "message": ...}
    #[arg(long)]
    catch_error: bool,

    /// Send requests without cross-origin checks
    #[arg(long)]
    no_cors: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// GET an endpoint
    Get { endpoint: String },
    /// Send a request with an optional JSON body
    Send {
        method: Method,
        endpoint: String,
        #[arg(short, long)]
        body: Option<String>,
    },
    /// Print the relay rotation order
    Relays,
}

impl Cli {
    fn options(&self, method: Method) -> RequestOptions {
        let mode = if self.no_cors {
            RequestMode::NoCors
        } else {
            RequestMode::Cors
        };
        RequestOptions::new(method).mode(mode).catch_error(self.catch_error)
    }
}

fn load(cli: &Cli) -> Result<ClientConfig, Box<dyn std::error::Error>> {
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ClientConfig::default(),
    };
    let mut config = apply_env_override(config)?;
    if let Some(env) = cli.env {
        config.environment = env;
    }
    Ok(config)
}

async fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = load(&cli)?;
    init_logging(&config.observability);

    tracing::info!(
        environment = %config.environment,
        api_root = %config.api_root(),
        relays = config.relays.endpoints.len(),
        "resilient-fetch v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let (endpoint, options) = match &cli.command {
        Commands::Relays => {
            println!("{}", serde_json::to_string_pretty(&config.relays.endpoints)?);
            return Ok(ExitCode::SUCCESS);
        }
        Commands::Get { endpoint } => (endpoint.clone(), cli.options(Method::Get)),
        Commands::Send { method, endpoint, body } => {
            let mut options = cli.options(*method);
            if let Some(body) = body {
                // Reject malformed JSON before any strategy runs.
                let value: serde_json::Value = serde_json::from_str(body)?;
                options = options.json(&value)?;
            }
            (endpoint.clone(), options)
        }
    };

    let client = RequestClient::from_config(&config)?;
    let outcome = client.request(&endpoint, options).await;

    tracing::debug!(state = ?client.snapshot(), "Final request state");

    match outcome {
        Ok(body) => {
            let failed = body.is_error();
            println!("{}", serde_json::to_string_pretty(&body.into_value())?);
            Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
