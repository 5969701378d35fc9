//! Folio CLI
//!
//! Command-line interface for the portfolio backend.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use folio::analytics::{CostCalculator, MetricsAggregator};
use folio::api::handlers::HealthResponse;
use folio::api::{AppState, HttpServer};
use folio::chat::{ChatService, ResponseResolver};
use folio::models::{ChatRequest, ChatResponse};
use folio::Config;

/// Folio - chat assistant, analytics and contact relay for a portfolio site
#[derive(Parser)]
#[command(name = "folio")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "FOLIO_CONFIG")]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (for commands that support it)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// HTTP API port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Answer one chat message without starting the server
    Ask {
        /// The message to answer
        message: String,
    },

    /// Check a running server
    Health {
        /// Base URL of the server (defaults to the configured local port)
        #[arg(long)]
        url: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        generate_completions(shell);
        return ExitCode::SUCCESS;
    }

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let _guard = match folio::telemetry::init(&config.logging, cli.verbose) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error initializing logging: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Serve { host, port } => run_serve(config, host, port).await,
        Commands::Ask { message } => run_ask(config, message, cli.format).await,
        Commands::Health { url } => run_health(&config, url, cli.format).await,
        Commands::Completions { .. } => Ok(()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run_serve(
    mut config: Config,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config.validate()?;

    let state = AppState::from_config(&config).context("failed to build services")?;
    let addr = config.server.bind_addr();

    info!(
        addr = %addr,
        model = %config.completion.model,
        external = state.chat.external_enabled(),
        "Starting Folio"
    );

    HttpServer::new(state, config.server.allowed_origins.clone())
        .serve(&addr)
        .await?;

    Ok(())
}

async fn run_ask(config: Config, message: String, format: OutputFormat) -> anyhow::Result<()> {
    let cost = CostCalculator::for_model(
        &config.completion.model,
        config.analytics.cost_per_1k_tokens,
    );
    let metrics = Arc::new(MetricsAggregator::new(&config.analytics, cost));
    let resolver = ResponseResolver::from_config(&config)?;
    let service = ChatService::new(resolver, metrics, Duration::ZERO);

    let reply = service.respond(ChatRequest::new(message)).await?;

    match format {
        OutputFormat::Json => {
            let response = ChatResponse::from(reply);
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("{}", reply.message);
            println!();
            println!("[{} in {}ms]", reply.source, reply.latency_ms);
        }
    }

    Ok(())
}

async fn run_health(
    config: &Config,
    url: Option<String>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let base = url.unwrap_or_else(|| format!("http://127.0.0.1:{}", config.server.port));
    let endpoint = format!("{}/api/health", base.trim_end_matches('/'));

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?;
    let response = client
        .get(&endpoint)
        .send()
        .await
        .with_context(|| format!("could not reach {endpoint}"))?
        .error_for_status()?;
    let health: HealthResponse = response.json().await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&health)?),
        OutputFormat::Text => {
            println!("Server:  {}", if health.success { "up" } else { "down" });
            println!("Message: {}", health.message);
            println!("Version: {}", health.version);
        }
    }

    Ok(())
}

fn generate_completions(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "folio", &mut io::stdout());
}
