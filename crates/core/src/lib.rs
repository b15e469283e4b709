pub mod chunking;
pub mod error;
pub mod extractor;
pub mod models;
pub mod orchestrator;
pub mod prompt;
pub mod providers;
pub mod stores;
pub mod traits;

pub use chunking::{chunk_text, ChunkingConfig, Chunks, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
pub use error::{
    ChunkError, ErrorKind, ExtractError, IngestError, ProviderError, QueryError, StoreError,
};
pub use extractor::{has_pdf_extension, LopdfExtractor, PdfExtractor};
pub use models::{
    Answer, PipelineOptions, QueryMatch, UploadReceipt, VectorRecord, DEFAULT_TOP_K,
    DEFAULT_UPSERT_BATCH_SIZE,
};
pub use orchestrator::{build_records, RagPipeline, UPLOAD_SUCCESS_MESSAGE};
pub use prompt::{build_context, build_prompt, CONTEXT_SEPARATOR};
pub use providers::gemini::{
    GeminiClient, DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_EMBEDDING_MODEL, DEFAULT_GENERATION_MODEL,
};
pub use stores::{InMemoryStore, IndexSpec, PineconeStore};
pub use traits::{Embedder, Generator, VectorIndex};
