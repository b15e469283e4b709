use crate::traits::VectorIndex;
use crate::{QueryMatch, StoreError, VectorRecord};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

pub const CONTROLLER_URL: &str = "https://api.pinecone.io";
const API_VERSION: &str = "2024-07";
const BACKEND: &str = "pinecone";
const METADATA_TEXT_KEY: &str = "text_chunk";
const READY_POLL_INTERVAL: Duration = Duration::from_secs(1);
const READY_POLL_ATTEMPTS: u32 = 300;

/// Serverless index the service writes into; created on startup when absent.
#[derive(Debug, Clone)]
pub struct IndexSpec {
    pub name: String,
    pub dimension: usize,
    pub metric: String,
    pub cloud: String,
    pub region: String,
}

impl Default for IndexSpec {
    fn default() -> Self {
        Self {
            name: "chat-with-pdf".to_string(),
            dimension: crate::providers::gemini::DEFAULT_EMBEDDING_DIMENSIONS,
            metric: "cosine".to_string(),
            cloud: "aws".to_string(),
            region: "us-east-1".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct IndexDescription {
    host: String,
    #[serde(default)]
    status: IndexStatus,
}

#[derive(Debug, Default, Deserialize)]
struct IndexStatus {
    #[serde(default)]
    ready: bool,
}

#[derive(Debug, Serialize)]
struct UpsertVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: Value,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<UpsertVector<'a>>,
    namespace: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    namespace: &'a str,
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
}

/// Pinecone REST client bound to one index's data-plane host.
///
/// Built once at startup and shared across requests; `reqwest::Client` pools
/// connections internally.
#[derive(Debug, Clone)]
pub struct PineconeStore {
    client: Client,
    api_key: String,
    host: String,
}

impl PineconeStore {
    /// Points at an already-known data-plane host.
    pub fn from_host(api_key: impl Into<String>, host: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            host: normalize_host(host),
        }
    }

    /// Describes `spec.name`, creating the index if the control plane has no
    /// such index, and waits until it reports ready.
    pub async fn connect(
        api_key: impl Into<String>,
        spec: &IndexSpec,
    ) -> Result<Self, StoreError> {
        Self::connect_with_controller(api_key, spec, CONTROLLER_URL).await
    }

    /// Same as [`PineconeStore::connect`] against a specific control plane.
    pub async fn connect_with_controller(
        api_key: impl Into<String>,
        spec: &IndexSpec,
        controller_url: &str,
    ) -> Result<Self, StoreError> {
        let client = Client::new();
        let api_key = api_key.into();
        let controller_url = controller_url.trim_end_matches('/');
        let describe_url = format!("{controller_url}/indexes/{}", spec.name);

        let mut description = match describe(&client, &api_key, &describe_url).await? {
            Some(description) => description,
            None => {
                info!(index = %spec.name, dimension = spec.dimension, "creating pinecone index");
                let create = client.post(format!("{controller_url}/indexes"));
                let response = authorize(create, &api_key)
                    .json(&json!({
                        "name": spec.name,
                        "dimension": spec.dimension,
                        "metric": spec.metric,
                        "spec": {
                            "serverless": { "cloud": spec.cloud, "region": spec.region }
                        },
                    }))
                    .send()
                    .await?;
                check_status(response).await?.json::<IndexDescription>().await?
            }
        };

        let mut attempts = 0;
        while !description.status.ready {
            if attempts >= READY_POLL_ATTEMPTS {
                return Err(StoreError::Request(format!(
                    "index {} did not become ready",
                    spec.name
                )));
            }
            attempts += 1;
            tokio::time::sleep(READY_POLL_INTERVAL).await;
            description = describe(&client, &api_key, &describe_url)
                .await?
                .ok_or_else(|| StoreError::Request(format!("index {} disappeared", spec.name)))?;
        }

        info!(index = %spec.name, host = %description.host, "pinecone index ready");
        Ok(Self {
            client,
            api_key,
            host: normalize_host(&description.host),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

async fn describe(
    client: &Client,
    api_key: &str,
    url: &str,
) -> Result<Option<IndexDescription>, StoreError> {
    let response = authorize(client.get(url), api_key).send().await?;
    if response.status() == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    Ok(Some(check_status(response).await?.json().await?))
}

fn authorize(request: RequestBuilder, api_key: &str) -> RequestBuilder {
    request
        .header("Api-Key", api_key)
        .header("X-Pinecone-API-Version", API_VERSION)
}

async fn check_status(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(StoreError::BackendResponse {
        backend: BACKEND.to_string(),
        status: status.as_u16(),
        details: body,
    })
}

fn normalize_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

fn parse_matches(parsed: &Value) -> Vec<QueryMatch> {
    parsed
        .pointer("/matches")
        .and_then(Value::as_array)
        .map(|matches| {
            matches
                .iter()
                .map(|hit| QueryMatch {
                    id: hit
                        .pointer("/id")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    score: hit.pointer("/score").and_then(Value::as_f64).unwrap_or(0.0) as f32,
                    text: hit
                        .pointer(&format!("/metadata/{METADATA_TEXT_KEY}"))
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                })
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl VectorIndex for PineconeStore {
    async fn upsert(&self, namespace: &str, records: &[VectorRecord]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }

        let request = UpsertRequest {
            vectors: records
                .iter()
                .map(|record| UpsertVector {
                    id: &record.id,
                    values: &record.values,
                    metadata: json!({ METADATA_TEXT_KEY: record.text }),
                })
                .collect(),
            namespace,
        };

        let response = authorize(
            self.client.post(format!("{}/vectors/upsert", self.host)),
            &self.api_key,
        )
        .json(&request)
        .send()
        .await?;
        check_status(response).await?;

        debug!(namespace, count = records.len(), "upserted vectors");
        Ok(())
    }

    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<QueryMatch>, StoreError> {
        let request = QueryRequest {
            namespace,
            vector,
            top_k,
            include_metadata: true,
            include_values: false,
        };

        let response = authorize(self.client.post(format!("{}/query", self.host)), &self.api_key)
            .json(&request)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::NamespaceNotFound(namespace.to_string()));
        }

        let parsed: Value = check_status(response).await?.json().await?;
        Ok(parse_matches(&parsed))
    }
}
