use anyhow::bail;
use clap::{Parser, ValueEnum};
use pdf_chat_core::{IndexSpec, DEFAULT_EMBEDDING_MODEL, DEFAULT_GENERATION_MODEL};

const DEFAULT_CORS_ORIGINS: &str =
    "https://aman-pdf.netlify.app,http://localhost:3000,http://localhost:5173";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VectorStoreKind {
    /// Pinecone serverless index.
    Pinecone,
    /// Process-local store; contents are lost on restart.
    Memory,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "pdf-chat-server", version, about)]
pub struct Config {
    /// API key for the Gemini embedding and generation endpoints.
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Pinecone API key; required with `--vector-store pinecone`.
    #[arg(long, env = "PINECONE_API_KEY", hide_env_values = true)]
    pub pinecone_api_key: Option<String>,

    /// Comma-separated origins allowed to call the API from a browser.
    #[arg(long, env = "CORS_ORIGINS", value_delimiter = ',', default_value = DEFAULT_CORS_ORIGINS)]
    pub cors_origins: Vec<String>,

    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    #[arg(long, env = "VECTOR_STORE", value_enum, default_value_t = VectorStoreKind::Pinecone)]
    pub vector_store: VectorStoreKind,

    /// Pinecone index name
    #[arg(long, env = "PINECONE_INDEX", default_value = "chat-with-pdf")]
    pub index_name: String,

    #[arg(long, env = "PINECONE_CLOUD", default_value = "aws")]
    pub pinecone_cloud: String,

    #[arg(long, env = "PINECONE_REGION", default_value = "us-east-1")]
    pub pinecone_region: String,

    #[arg(long, env = "EMBEDDING_MODEL", default_value = DEFAULT_EMBEDDING_MODEL)]
    pub embedding_model: String,

    #[arg(long, env = "GENERATION_MODEL", default_value = DEFAULT_GENERATION_MODEL)]
    pub generation_model: String,

    /// Largest accepted upload body, in bytes.
    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = 20 * 1024 * 1024)]
    pub max_upload_bytes: usize,
}

impl Config {
    /// Rejects settings clap cannot express: blank keys and a missing
    /// Pinecone key when Pinecone is selected.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_key.trim().is_empty() {
            bail!("API_KEY not found in environment variables.");
        }

        if self.vector_store == VectorStoreKind::Pinecone
            && self
                .pinecone_api_key
                .as_deref()
                .map_or(true, |key| key.trim().is_empty())
        {
            bail!("PINECONE_API_KEY not found in environment variables.");
        }

        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn index_spec(&self) -> IndexSpec {
        IndexSpec {
            name: self.index_name.clone(),
            cloud: self.pinecone_cloud.clone(),
            region: self.pinecone_region.clone(),
            ..IndexSpec::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["pdf-chat-server"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).expect("arguments parse")
    }

    #[test]
    fn memory_store_needs_only_the_provider_key() {
        let config = parse(&["--api-key", "gemini", "--vector-store", "memory"]);
        assert!(config.validate().is_ok());
        assert_eq!(config.vector_store, VectorStoreKind::Memory);
    }

    #[test]
    fn pinecone_without_key_fails_fast() {
        let mut config = parse(&["--api-key", "gemini", "--vector-store", "pinecone"]);
        config.pinecone_api_key = None;
        let error = config.validate().unwrap_err();
        assert!(error.to_string().contains("PINECONE_API_KEY"));
    }

    #[test]
    fn blank_provider_key_is_rejected() {
        let config = parse(&["--api-key", "  ", "--vector-store", "memory"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn cors_origins_split_on_commas() {
        let config = parse(&[
            "--api-key",
            "gemini",
            "--cors-origins",
            "http://a.test,http://b.test",
        ]);
        assert_eq!(config.cors_origins, vec!["http://a.test", "http://b.test"]);
    }

    #[test]
    fn index_spec_is_cosine_with_embedding_dimensions() {
        let config = parse(&["--api-key", "gemini", "--index-name", "docs"]);
        let spec = config.index_spec();
        assert_eq!(spec.name, "docs");
        assert_eq!(spec.dimension, 768);
        assert_eq!(spec.metric, "cosine");
        assert_eq!(spec.region, "us-east-1");
    }
}
