use crate::chunking::ChunkingConfig;
use serde::{Deserialize, Serialize};

pub const DEFAULT_UPSERT_BATCH_SIZE: usize = 100;
pub const DEFAULT_TOP_K: usize = 5;

/// One stored chunk: `{doc_id}_{index}`, its embedding, and the chunk text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub text: String,
}

impl VectorRecord {
    pub fn chunk_id(doc_id: &str, index: usize) -> String {
        format!("{doc_id}_{index}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMatch {
    pub id: String,
    pub score: f32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub doc_id: String,
    pub message: String,
    pub num_chunks: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
    pub source_chunks: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    pub chunking: ChunkingConfig,
    pub upsert_batch_size: usize,
    pub top_k: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            chunking: ChunkingConfig::default(),
            upsert_batch_size: DEFAULT_UPSERT_BATCH_SIZE,
            top_k: DEFAULT_TOP_K,
        }
    }
}
