//! CLI binary for gleaner.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use gleaner::{SearchClient, SearchServer, ServerConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Gleaner: query-time content aggregation server.
#[derive(Parser)]
#[command(name = "gleaner", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Command,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Serve search requests over HTTP.
    Serve {
        /// Listen address as HOST:PORT, overriding the config file.
        #[arg(long)]
        host: Option<String>,
    },

    /// Fetch and normalise one page, printing the result as JSON.
    TestParser {
        /// Page to fetch.
        url: String,
    },

    /// Send one query to a running server and print the answer.
    TestServer {
        /// Search phrase.
        query: String,
        /// Number of passages wanted.
        n: usize,
        /// Server address as HOST:PORT.
        #[arg(long, default_value = "127.0.0.1:8080")]
        host: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so test-parser and test-server output stays clean JSON.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("gleaner=info,gleaner_search=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve { host } => run_serve(cli.config, host).await,
        Command::TestParser { url } => run_test_parser(cli.config, &url).await,
        Command::TestServer { query, n, host } => run_test_server(&host, &query, n).await,
    }
}

async fn run_serve(config_path: Option<PathBuf>, host: Option<String>) -> anyhow::Result<()> {
    let mut config = ServerConfig::load(config_path.as_deref())?;
    if let Some(host) = host {
        config.server.apply_host_override(&host)?;
    }

    info!(
        "gleaner v{} starting with the {} backend",
        env!("CARGO_PKG_VERSION"),
        config.backend.kind
    );
    let server = SearchServer::start(&config).await?;

    tokio::signal::ctrl_c().await?;
    info!("received Ctrl+C, shutting down...");
    server.shutdown();
    Ok(())
}

async fn run_test_parser(config_path: Option<PathBuf>, url: &str) -> anyhow::Result<()> {
    let config = ServerConfig::load(config_path.as_deref())?;
    let page = gleaner_search::fetch_page(url, &config.pipeline).await?;
    println!("{}", serde_json::to_string_pretty(&page)?);
    Ok(())
}

async fn run_test_server(host: &str, query: &str, n: usize) -> anyhow::Result<()> {
    let client = SearchClient::new(host)?;
    let response = client.search(query, n).await?;
    info!(passages = response.len(), "server answered");
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
