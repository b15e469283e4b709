//! HTTP surface for uploading PDFs and asking questions about them.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Liveness message |
//! | `POST` | `/upload` | Multipart upload (`file` field), returns `{doc_id, message, num_chunks}` |
//! | `POST` | `/query` | `{doc_id, query}`, returns `{answer, source_chunks}` |
//!
//! Errors are returned as `{ "detail": "<message>" }` with status 400, 404, or 500.

use anyhow::Context;
use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use pdf_chat_core::{
    Answer, Embedder, ErrorKind, Generator, IngestError, PdfExtractor, QueryError, RagPipeline,
    UploadReceipt, VectorIndex,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::Config;

pub type ChatPipeline = RagPipeline<
    Box<dyn PdfExtractor>,
    Arc<dyn Embedder>,
    Arc<dyn VectorIndex>,
    Arc<dyn Generator>,
>;

const UPLOAD_FIELD: &str = "file";
const WELCOME_MESSAGE: &str = "Welcome to the Chat with PDF API! Server is running.";

#[derive(Clone)]
struct AppState {
    pipeline: Arc<ChatPipeline>,
}

pub async fn serve(config: &Config, pipeline: ChatPipeline) -> anyhow::Result<()> {
    let cors = cors_layer(&config.cors_origins)?;
    let app = router(Arc::new(pipeline), cors, config.max_upload_bytes);

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(addr = %bind_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server shut down");
    Ok(())
}

pub fn router(pipeline: Arc<ChatPipeline>, cors: CorsLayer, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(handle_root))
        .route("/upload", post(handle_upload))
        .route("/query", post(handle_query))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(AppState { pipeline })
}

/// Allows the configured origins with credentials; methods and headers are
/// mirrored from the preflight request since wildcards cannot carry credentials.
pub fn cors_layer(origins: &[String]) -> anyhow::Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|origin| origin.trim())
        .filter(|origin| !origin.is_empty())
        .map(|origin| {
            HeaderValue::from_str(origin).with_context(|| format!("invalid CORS origin: {origin}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request()))
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(%error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

#[derive(Debug)]
struct AppError {
    status: StatusCode,
    detail: String,
}

impl AppError {
    fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    fn from_kind(kind: ErrorKind, detail: String) -> Self {
        let status = match kind {
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Upstream => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, detail)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, detail = %self.detail, "request failed");
        } else {
            warn!(status = %self.status, detail = %self.detail, "request rejected");
        }
        (self.status, Json(ErrorBody { detail: self.detail })).into_response()
    }
}

impl From<IngestError> for AppError {
    fn from(value: IngestError) -> Self {
        Self::from_kind(value.kind(), value.to_string())
    }
}

impl From<QueryError> for AppError {
    fn from(value: QueryError) -> Self {
        Self::from_kind(value.kind(), value.to_string())
    }
}

impl From<MultipartError> for AppError {
    fn from(value: MultipartError) -> Self {
        Self::new(value.status(), value.body_text())
    }
}

// ============ GET / ============

#[derive(Serialize)]
struct RootResponse {
    message: &'static str,
}

async fn handle_root() -> Json<RootResponse> {
    Json(RootResponse {
        message: WELCOME_MESSAGE,
    })
}

// ============ POST /upload ============

async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadReceipt>, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;
        info!(filename = %filename, size = bytes.len(), "received upload");

        let receipt = state.pipeline.upload(&filename, bytes.to_vec()).await?;
        return Ok(Json(receipt));
    }

    Err(AppError::new(
        StatusCode::BAD_REQUEST,
        format!("missing multipart field `{UPLOAD_FIELD}`"),
    ))
}

// ============ POST /query ============

#[derive(Debug, Deserialize)]
struct QueryRequest {
    doc_id: String,
    query: String,
}

async fn handle_query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<Answer>, AppError> {
    let answer = state.pipeline.query(&request.doc_id, &request.query).await?;
    Ok(Json(answer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use pdf_chat_core::{ExtractError, InMemoryStore, ProviderError};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct StaticExtractor(&'static str);

    impl PdfExtractor for StaticExtractor {
        fn extract_text(&self, _bytes: &[u8]) -> Result<String, ExtractError> {
            Ok(self.0.to_string())
        }
    }

    struct ConstantEmbedder {
        healthy: bool,
    }

    #[async_trait]
    impl Embedder for ConstantEmbedder {
        async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
            if !self.healthy {
                return Err(ProviderError::BadResponse {
                    provider: "fake".to_string(),
                    status: 503,
                    message: "embedding backend unavailable".to_string(),
                });
            }
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }

        async fn embed_query(&self, _text: &str) -> Result<Vec<f32>, ProviderError> {
            Ok(vec![1.0, 0.0])
        }
    }

    struct CannedGenerator;

    #[async_trait]
    impl Generator for CannedGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, ProviderError> {
            Ok("It says hello.".to_string())
        }
    }

    fn app(embedder_healthy: bool) -> Router {
        let extractor: Box<dyn PdfExtractor> = Box::new(StaticExtractor("Hello world\n"));
        let embedder: Arc<dyn Embedder> = Arc::new(ConstantEmbedder {
            healthy: embedder_healthy,
        });
        let index: Arc<dyn VectorIndex> = Arc::new(InMemoryStore::new());
        let generator: Arc<dyn Generator> = Arc::new(CannedGenerator);
        let pipeline: ChatPipeline = RagPipeline::new(extractor, embedder, index, generator);
        let cors = cors_layer(&["http://localhost:5173".to_string()]).expect("valid origins");
        router(Arc::new(pipeline), cors, 1024 * 1024)
    }

    fn upload_request(filename: &str) -> Request<Body> {
        let boundary = "pdfchatboundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
             Content-Type: application/pdf\r\n\r\n\
             %PDF-1.5 fake\r\n\
             --{boundary}--\r\n"
        );
        Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .expect("request builds")
    }

    fn query_request(doc_id: &str, query: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/query")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({ "doc_id": doc_id, "query": query }).to_string(),
            ))
            .expect("request builds")
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body collects")
            .to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn root_reports_liveness() {
        let request = Request::builder()
            .uri("/")
            .body(Body::empty())
            .expect("request builds");
        let (status, body) = send(&app(true), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], WELCOME_MESSAGE);
    }

    #[tokio::test]
    async fn upload_then_query_round_trip() {
        let app = app(true);

        let (status, body) = send(&app, upload_request("hello.pdf")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["num_chunks"], 1);
        assert_eq!(body["message"], "PDF processed and stored successfully");
        let doc_id = body["doc_id"].as_str().expect("doc_id is a string").to_string();

        let (status, body) = send(&app, query_request(&doc_id, "What does it say?")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["answer"], "It says hello.");
        assert_eq!(body["source_chunks"], json!(["Hello world\n"]));
    }

    #[tokio::test]
    async fn non_pdf_upload_is_bad_request() {
        let (status, body) = send(&app(true), upload_request("notes.txt")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "File must be a PDF");
    }

    #[tokio::test]
    async fn embedding_outage_is_internal_error() {
        let (status, body) = send(&app(false), upload_request("hello.pdf")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let detail = body["detail"].as_str().expect("detail is a string");
        assert!(detail.contains("embedding backend unavailable"));
    }

    #[tokio::test]
    async fn unknown_document_is_not_found() {
        let (status, body) = send(
            &app(true),
            query_request("00000000-0000-4000-8000-000000000000", "anything?"),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            body["detail"],
            "Document ID not found. The session may have expired."
        );
    }

    #[tokio::test]
    async fn upload_without_file_field_is_bad_request() {
        let boundary = "pdfchatboundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"other\"\r\n\r\n\
             value\r\n\
             --{boundary}--\r\n"
        );
        let request = Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .expect("request builds");

        let (status, _) = send(&app(true), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn invalid_cors_origin_is_rejected() {
        assert!(cors_layer(&["http://ok.test".to_string()]).is_ok());
        assert!(cors_layer(&["bad\norigin".to_string()]).is_err());
    }
}
