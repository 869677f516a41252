use crate::traits::VectorIndex;
use crate::{ScoredChunk, StoreError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

pub struct QdrantStore {
    endpoint: String,
    collection: String,
    client: Client,
    vector_size: usize,
}

impl QdrantStore {
    pub fn new(
        endpoint: &Url,
        api_key: &str,
        collection: impl Into<String>,
        vector_size: usize,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "api-key",
            HeaderValue::from_str(api_key.trim())
                .map_err(|_| StoreError::Request("invalid qdrant api key".to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            endpoint: endpoint.as_str().trim_end_matches('/').to_string(),
            collection: collection.into(),
            client,
            vector_size,
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Creates the collection with cosine distance unless it already exists.
    pub async fn ensure_collection(&self) -> Result<(), StoreError> {
        let url = format!("{}/collections/{}", self.endpoint, self.collection);
        let response = self.client.get(&url).send().await?;

        if response.status() == StatusCode::OK {
            debug!(collection = %self.collection, "qdrant collection exists");
            return Ok(());
        }

        if response.status() != StatusCode::NOT_FOUND {
            return Err(StoreError::BackendResponse {
                backend: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }

        let response = self
            .client
            .put(&url)
            .json(&json!({
                "vectors": {
                    "size": self.vector_size,
                    "distance": "Cosine",
                }
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StoreError::Request(format!(
                "qdrant collection setup failed with {}",
                response.status()
            )));
        }

        info!(collection = %self.collection, vector_size = self.vector_size, "created qdrant collection");
        Ok(())
    }

    fn build_points(&self, texts: &[String], embeddings: &[Vec<f32>]) -> Result<(Vec<String>, Vec<Value>), StoreError> {
        if texts.len() != embeddings.len() {
            return Err(StoreError::Request(format!(
                "embedding count {} doesn't match chunk count {}",
                embeddings.len(),
                texts.len()
            )));
        }

        let mut ids = Vec::with_capacity(texts.len());
        let mut points = Vec::with_capacity(texts.len());
        for (text, embedding) in texts.iter().zip(embeddings) {
            if embedding.len() != self.vector_size {
                return Err(StoreError::Request(format!(
                    "embedding dimension {} != {}",
                    embedding.len(),
                    self.vector_size
                )));
            }

            let id = Uuid::new_v4().to_string();
            points.push(json!({
                "id": id,
                "vector": embedding,
                "payload": { "text": text },
            }));
            ids.push(id);
        }

        Ok((ids, points))
    }
}
#[async_trait]
impl VectorIndex for QdrantStore {
    /// Upserts in slices of `UPSERT_BATCH_SIZE` points. A failing slice
    /// leaves the slices sent before it stored.
    async fn add(&self, texts: &[String], embeddings: &[Vec<f32>]) -> Result<Vec<String>, StoreError> {
        let (ids, points) = self.build_points(texts, embeddings)?;

        for body in upsert_bodies(&points) {
            let response = self
                .client
                .put(format!(
                    "{}/collections/{}/points?wait=true",
                    self.endpoint, self.collection
                ))
                .json(&body)
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(StoreError::BackendResponse {
                    backend: "qdrant".to_string(),
                    details: response.status().to_string(),
                });
            }
        }

        Ok(ids)
    }

    async fn similarity_search(
        &self,
        query_vector: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredChunk>, StoreError> {
        if query_vector.len() != self.vector_size {
            return Err(StoreError::Request(format!(
                "query vector dim {} is not {}",
                query_vector.len(),
                self.vector_size
            )));
        }

        let response = self
            .client
            .post(format!(
                "{}/collections/{}/points/search",
                self.endpoint, self.collection
            ))
            .json(&json!({
                "vector": query_vector,
                "limit": k,
                "with_payload": true,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StoreError::BackendResponse {
                backend: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        parse_search_hits(&parsed)
    }
}

pub const UPSERT_BATCH_SIZE: usize = 256;

fn upsert_bodies(points: &[Value]) -> Vec<Value> {
    points
        .chunks(UPSERT_BATCH_SIZE)
        .map(|batch| json!({ "points": batch }))
        .collect()
}

fn malformed_hit(details: String) -> StoreError {
    StoreError::BackendResponse {
        backend: "qdrant".to_string(),
        details,
    }
}

fn parse_search_hits(parsed: &Value) -> Result<Vec<ScoredChunk>, StoreError> {
    let hits = parsed
        .pointer("/result")
        .and_then(Value::as_array)
        .ok_or_else(|| malformed_hit("search response has no result array".to_string()))?;

    hits.iter()
        .enumerate()
        .map(|(position, hit)| {
            let id = match hit.pointer("/id") {
                Some(Value::String(id)) => id.clone(),
                Some(Value::Number(id)) => id.to_string(),
                _ => return Err(malformed_hit(format!("search hit {position} has no id"))),
            };
            let score = hit
                .pointer("/score")
                .and_then(Value::as_f64)
                .ok_or_else(|| malformed_hit(format!("search hit {id} has no score")))?;
            let text = hit
                .pointer("/payload/text")
                .and_then(Value::as_str)
                .ok_or_else(|| malformed_hit(format!("search hit {id} has no text payload")))?
                .to_string();

            Ok(ScoredChunk { id, text, score })
        })
        .collect()
}
