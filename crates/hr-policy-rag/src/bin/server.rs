//! Chat server binary
//!
//! Run with: cargo run -p hr-policy-rag --bin hr-policy-server

use hr_policy_rag::{
    config::RagConfig, generation::OllamaClient, server::RagServer, Error,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hr_policy_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!(
        r#"
╔═══════════════════════════════════════════════════════════╗
║                    HR Policy Assistant                    ║
║          Answers strictly from the policy document        ║
╚═══════════════════════════════════════════════════════════╝
"#
    );

    let config = RagConfig::load()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Index: {}", config.index.index_dir.display());
    tracing::info!("  - Embedding model: {}", config.embeddings.model);
    tracing::info!("  - LLM model: {}", config.llm.generate_model);
    tracing::info!(
        "  - Retrieval: {:?} (k={}, fetch_k={})",
        config.retrieval.strategy,
        config.retrieval.k,
        config.retrieval.fetch_k
    );

    // Check Ollama; an unreachable backend only degrades answers
    tracing::info!("Checking Ollama at {}...", config.llm.base_url);
    match OllamaClient::new(&config.llm)?.health_check().await {
        Ok(true) => tracing::info!("Ollama is running"),
        _ => {
            tracing::warn!("Ollama not available at {}", config.llm.base_url);
            tracing::warn!("Please start Ollama:");
            tracing::warn!("  1. Start: ollama serve");
            tracing::warn!(
                "  2. Pull models: ollama pull {} && ollama pull {}",
                config.embeddings.model,
                config.llm.generate_model
            );
        }
    }

    let server = match RagServer::new(config).await {
        Ok(server) => server,
        Err(e @ Error::IndexUnavailable(_)) => {
            tracing::error!("{}", e);
            tracing::error!("Build the index first: cargo run --bin hr-policy-index -- --input <policy.pdf>");
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    println!("\nServer starting...");
    println!("  Chat:   POST http://{}/chat", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
