use crate::traits::{Embedder, Generator};
use crate::ProviderError;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";
pub const DEFAULT_EMBEDDING_MODEL: &str = "models/text-embedding-004";
pub const DEFAULT_GENERATION_MODEL: &str = "models/gemini-1.5-pro";
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 768;

/// Upper bound on requests the batch embedding endpoint accepts per call.
pub const MAX_EMBED_BATCH: usize = 100;

const PROVIDER: &str = "gemini";

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum TaskType {
    RetrievalDocument,
    RetrievalQuery,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    task_type: TaskType,
}

#[derive(Debug, Serialize)]
struct BatchEmbedContentsRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedContentsResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// REST client for the Gemini embedding and generation endpoints.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: Url,
    api_key: String,
    embedding_model: String,
    generation_model: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: &str,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            client: Client::new(),
            base_url: Url::parse(base_url)?,
            api_key: api_key.into(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            generation_model: DEFAULT_GENERATION_MODEL.to_string(),
        })
    }

    pub fn with_embedding_model(mut self, model: impl AsRef<str>) -> Self {
        self.embedding_model = model_path(model.as_ref());
        self
    }

    pub fn with_generation_model(mut self, model: impl AsRef<str>) -> Self {
        self.generation_model = model_path(model.as_ref());
        self
    }

    fn method_url(&self, model: &str, method: &str) -> Result<Url, ProviderError> {
        Ok(self.base_url.join(&format!("{model}:{method}"))?)
    }

    async fn post<T, R>(&self, url: Url, body: &T) -> Result<R, ProviderError>
    where
        T: Serialize + ?Sized,
        R: serde::de::DeserializeOwned,
    {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await?;

        let response = check_status(response).await?;
        let raw = response.bytes().await?;
        serde_json::from_slice(&raw).map_err(|error| ProviderError::Malformed {
            provider: PROVIDER.to_string(),
            details: error.to_string(),
        })
    }

    fn embed_request<'a>(&'a self, text: &'a str, task_type: TaskType) -> EmbedContentRequest<'a> {
        EmbedContentRequest {
            model: &self.embedding_model,
            content: Content {
                role: None,
                parts: vec![Part { text }],
            },
            task_type,
        }
    }
}

/// Resource path for a model; bare ids such as `gemini-1.5-flash` gain the
/// `models/` prefix so the `:method` suffix is never read as a URL scheme.
fn model_path(model: &str) -> String {
    let model = model.trim().trim_start_matches('/');
    if model.starts_with("models/") || model.starts_with("tunedModels/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

async fn check_status(response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::BadResponse {
        provider: PROVIDER.to_string(),
        status: status.as_u16(),
        message: upstream_message(&body).unwrap_or(body),
    })
}

/// Pulls `error.message` out of a Google API error body.
fn upstream_message(body: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(body).ok()?;
    parsed
        .pointer("/error/message")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn answer_text(response: GenerateContentResponse) -> Option<String> {
    let text = response
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .filter_map(|part| part.text)
        .collect::<String>();

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[async_trait]
impl Embedder for GeminiClient {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.method_url(&self.embedding_model, "batchEmbedContents")?;
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(MAX_EMBED_BATCH) {
            debug!(batch_size = batch.len(), "embedding document batch");
            let request = BatchEmbedContentsRequest {
                requests: batch
                    .iter()
                    .map(|text| self.embed_request(text, TaskType::RetrievalDocument))
                    .collect(),
            };
            let response: BatchEmbedContentsResponse = self.post(url.clone(), &request).await?;

            if response.embeddings.len() != batch.len() {
                return Err(ProviderError::Malformed {
                    provider: PROVIDER.to_string(),
                    details: format!(
                        "expected {} embeddings, got {}",
                        batch.len(),
                        response.embeddings.len()
                    ),
                });
            }
            vectors.extend(response.embeddings.into_iter().map(|embedding| embedding.values));
        }

        Ok(vectors)
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let url = self.method_url(&self.embedding_model, "embedContent")?;
        let request = self.embed_request(text, TaskType::RetrievalQuery);
        let response: EmbedContentResponse = self.post(url, &request).await?;
        Ok(response.embedding.values)
    }
}

#[async_trait]
impl Generator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let url = self.method_url(&self.generation_model, "generateContent")?;
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: prompt }],
            }],
        };
        let response: GenerateContentResponse = self.post(url, &request).await?;

        answer_text(response).ok_or_else(|| ProviderError::Malformed {
            provider: PROVIDER.to_string(),
            details: "response contained no text candidates".to_string(),
        })
    }
}
