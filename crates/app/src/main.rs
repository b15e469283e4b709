mod config;
mod server;

use chrono::Utc;
use clap::Parser;
use pdf_chat_core::{
    Embedder, GeminiClient, Generator, InMemoryStore, LopdfExtractor, PdfExtractor, PineconeStore,
    RagPipeline, VectorIndex,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{Config, VectorStoreKind};
use crate::server::ChatPipeline;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let config = Config::parse();
    config.validate()?;

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "pdf-chat-server boot"
    );

    let pipeline = build_pipeline(&config).await?;
    server::serve(&config, pipeline).await
}

async fn build_pipeline(config: &Config) -> anyhow::Result<ChatPipeline> {
    let gemini = Arc::new(
        GeminiClient::new(config.api_key.clone())?
            .with_embedding_model(config.embedding_model.clone())
            .with_generation_model(config.generation_model.clone()),
    );
    info!(
        embedding_model = %config.embedding_model,
        generation_model = %config.generation_model,
        "gemini client initialized"
    );

    let index: Arc<dyn VectorIndex> = match config.vector_store {
        VectorStoreKind::Pinecone => {
            let api_key = config.pinecone_api_key.clone().unwrap_or_default();
            Arc::new(PineconeStore::connect(api_key, &config.index_spec()).await?)
        }
        VectorStoreKind::Memory => {
            warn!("using in-memory vector store; uploads are lost on restart");
            Arc::new(InMemoryStore::new())
        }
    };

    let extractor: Box<dyn PdfExtractor> = Box::new(LopdfExtractor);
    let embedder: Arc<dyn Embedder> = gemini.clone();
    let generator: Arc<dyn Generator> = gemini;

    Ok(RagPipeline::new(extractor, embedder, index, generator))
}
