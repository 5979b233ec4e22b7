//! Agentic RAG server binary
//!
//! Run with: cargo run -p agentic-rag --bin agentic-rag-server -- --port 8000

use agentic_rag::{config::RagConfig, server::RagServer};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "agentic-rag-server", version, about = "Multi-agent RAG server with citations")]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "RAG_CONFIG")]
    config: Option<PathBuf>,

    /// Bind address (overrides config and RAG_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port (overrides config and RAG_PORT)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Failed to load .env: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agentic_rag=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = RagConfig::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    tracing::info!("Configuration loaded");
    tracing::info!("  - Data directory: {}", config.storage.data_dir.display());
    tracing::info!("  - Gemini configured: {}", config.llm.gemini_api_key.is_some());
    tracing::info!("  - Ollama model: {}", config.llm.ollama_model);
    tracing::info!("  - Chunk size: {}", config.chunking.chunk_size);
    tracing::info!("  - Web search API configured: {}", config.web_search.api_key.is_some());

    tracing::info!("Checking Ollama at {}...", config.llm.ollama_base_url);
    let client = reqwest::Client::new();
    match client
        .get(format!("{}/api/tags", config.llm.ollama_base_url))
        .send()
        .await
    {
        Ok(resp) if resp.status().is_success() => tracing::info!("Ollama is running"),
        _ => {
            tracing::warn!("Ollama not available at {}", config.llm.ollama_base_url);
            tracing::warn!(
                "Start it with `ollama serve` and pull models: ollama pull {} && ollama pull {}",
                config.llm.ollama_model,
                config.embeddings.ollama_model
            );
        }
    }

    let server = RagServer::new(config).await?;

    tracing::info!("API: http://{}", server.address());
    tracing::info!("Health: http://{}/health", server.address());

    server.start().await?;

    Ok(())
}
