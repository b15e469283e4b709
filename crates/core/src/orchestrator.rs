use crate::chunking::chunk_text;
use crate::extractor::{has_pdf_extension, PdfExtractor};
use crate::prompt::{build_context, build_prompt};
use crate::traits::{Embedder, Generator, VectorIndex};
use crate::{
    Answer, ExtractError, IngestError, PipelineOptions, ProviderError, QueryError, UploadReceipt,
    VectorRecord,
};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

pub const UPLOAD_SUCCESS_MESSAGE: &str = "PDF processed and stored successfully";

/// Upload and query flows over injected extractor, embedder, index, and generator.
///
/// Built once at startup; every request borrows it immutably.
pub struct RagPipeline<X, E, V, G> {
    extractor: Arc<X>,
    embedder: E,
    index: V,
    generator: G,
    options: PipelineOptions,
}

impl<X, E, V, G> RagPipeline<X, E, V, G>
where
    X: PdfExtractor + 'static,
    E: Embedder,
    V: VectorIndex,
    G: Generator,
{
    pub fn new(extractor: X, embedder: E, index: V, generator: G) -> Self {
        Self {
            extractor: Arc::new(extractor),
            embedder,
            index,
            generator,
            options: PipelineOptions::default(),
        }
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    pub async fn upload(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadReceipt, IngestError> {
        if !has_pdf_extension(filename) {
            return Err(IngestError::InvalidInput("File must be a PDF".to_string()));
        }

        let extractor = Arc::clone(&self.extractor);
        let text = tokio::task::spawn_blocking(move || extractor.extract_text(&bytes))
            .await
            .map_err(|error| ExtractError::Task(error.to_string()))??;
        if text.trim().is_empty() {
            return Err(IngestError::EmptyText);
        }

        let chunks = chunk_text(&text, self.options.chunking);
        debug!(filename, chunk_count = chunks.len(), "chunked pdf text");

        let embeddings = self
            .embedder
            .embed_documents(&chunks)
            .await
            .map_err(IngestError::Embedding)?;
        if embeddings.len() != chunks.len() {
            return Err(IngestError::Embedding(ProviderError::Malformed {
                provider: "embedder".to_string(),
                details: format!(
                    "embedding count {} doesn't match chunk count {}",
                    embeddings.len(),
                    chunks.len()
                ),
            }));
        }

        let doc_id = Uuid::new_v4().to_string();
        let records = build_records(&doc_id, &chunks, embeddings);

        let batch_size = self.options.upsert_batch_size.max(1);
        for (batch_no, batch) in records.chunks(batch_size).enumerate() {
            debug!(namespace = %doc_id, batch_no, size = batch.len(), "upserting batch");
            self.index.upsert(&doc_id, batch).await?;
        }

        info!(namespace = %doc_id, chunk_count = chunks.len(), "pdf processed and stored");
        Ok(UploadReceipt {
            doc_id,
            message: UPLOAD_SUCCESS_MESSAGE.to_string(),
            num_chunks: chunks.len(),
        })
    }

    pub async fn query(&self, doc_id: &str, question: &str) -> Result<Answer, QueryError> {
        if doc_id.trim().is_empty() {
            return Err(QueryError::InvalidInput("doc_id is empty".to_string()));
        }
        if question.trim().is_empty() {
            return Err(QueryError::InvalidInput("query is empty".to_string()));
        }

        let query_vector = self
            .embedder
            .embed_query(question)
            .await
            .map_err(QueryError::Embedding)?;

        let matches = self
            .index
            .query(doc_id, &query_vector, self.options.top_k)
            .await?;
        let source_chunks = matches
            .into_iter()
            .map(|hit| hit.text)
            .collect::<Vec<_>>();

        if source_chunks.is_empty() {
            return Err(QueryError::NoRelevantContext);
        }
        debug!(namespace = doc_id, hits = source_chunks.len(), "retrieved context");

        let prompt = build_prompt(&build_context(&source_chunks), question);
        let answer = self
            .generator
            .generate(&prompt)
            .await
            .map_err(QueryError::Generation)?;

        Ok(Answer {
            answer,
            source_chunks,
        })
    }
}

pub fn build_records(
    doc_id: &str,
    chunks: &[String],
    embeddings: Vec<Vec<f32>>,
) -> Vec<VectorRecord> {
    chunks
        .iter()
        .zip(embeddings)
        .enumerate()
        .map(|(index, (chunk, values))| VectorRecord {
            id: VectorRecord::chunk_id(doc_id, index),
            values,
            text: chunk.clone(),
        })
        .collect()
}
