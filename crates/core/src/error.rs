use thiserror::Error;

/// Coarse classification the HTTP layer maps to a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    Upstream,
}

#[derive(Debug, Error)]
pub enum ChunkError {
    #[error("chunk size must be greater than zero")]
    ZeroSize,

    #[error("chunk overlap {overlap} must be smaller than chunk size {size}")]
    OverlapTooLarge { size: usize, overlap: usize },
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("extraction task failed: {0}")]
    Task(String),
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("bad response from {provider} (status {status}): {message}")]
    BadResponse {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("malformed response from {provider}: {details}")]
    Malformed { provider: String, details: String },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("namespace not found: {0}")]
    NamespaceNotFound(String),

    #[error("invalid response from {backend} (status {status}): {details}")]
    BackendResponse {
        backend: String,
        status: u16,
        details: String,
    },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("store request failed: {0}")]
    Request(String),
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Could not extract text from PDF: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Could not extract text from PDF.")]
    EmptyText,

    #[error("Error creating embeddings: {0}")]
    Embedding(#[source] ProviderError),

    #[error("Error storing vectors: {0}")]
    Store(#[from] StoreError),
}

impl IngestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) | Self::Extraction(_) | Self::EmptyText => {
                ErrorKind::InvalidInput
            }
            Self::Embedding(_) | Self::Store(_) => ErrorKind::Upstream,
        }
    }
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Document ID not found. The session may have expired.")]
    DocumentNotFound,

    #[error("No relevant context found for your query in this document.")]
    NoRelevantContext,

    #[error("Error embedding query: {0}")]
    Embedding(#[source] ProviderError),

    #[error("Error generating answer: {0}")]
    Generation(#[source] ProviderError),

    #[error("Error querying vectors: {0}")]
    Store(#[source] StoreError),
}

impl QueryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::DocumentNotFound | Self::NoRelevantContext => ErrorKind::NotFound,
            Self::Embedding(_) | Self::Generation(_) | Self::Store(_) => ErrorKind::Upstream,
        }
    }
}

impl From<StoreError> for QueryError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NamespaceNotFound(_) => Self::DocumentNotFound,
            other => Self::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_namespace_becomes_document_not_found() {
        let error = QueryError::from(StoreError::NamespaceNotFound("abc".to_string()));
        assert!(matches!(error, QueryError::DocumentNotFound));
        assert_eq!(error.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn other_store_failures_stay_upstream() {
        let error = QueryError::from(StoreError::Request("boom".to_string()));
        assert_eq!(error.kind(), ErrorKind::Upstream);
        assert!(error.to_string().contains("boom"));
    }

    #[test]
    fn extraction_failures_are_client_errors() {
        assert_eq!(IngestError::EmptyText.kind(), ErrorKind::InvalidInput);
        let error = IngestError::Embedding(ProviderError::BadResponse {
            provider: "gemini".to_string(),
            status: 429,
            message: "quota exceeded".to_string(),
        });
        assert_eq!(error.kind(), ErrorKind::Upstream);
        assert!(error.to_string().contains("quota exceeded"));
    }
}
