//! Qdrant vector index over its REST API.
//!
//! Points carry the payload layout `{page_content, metadata: {source, ..}}`
//! so collections written by earlier deployments stay readable.

use super::{check_compatible, check_dimensions, CollectionInfo, CollectionSpec, Metric, VectorIndex};
use crate::types::{sha256_hex, IndexedPassage, Passage, ScoredPassage};
use luxas_core::{AppError, AppResult, RetryPolicy, Service};
use luxas_llm::http;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::instrument;

/// Points per upsert request.
const UPSERT_BATCH: usize = 256;

pub struct QdrantIndex {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for QdrantIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QdrantIndex")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct QdrantResponse<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct CollectionDescription {
    #[serde(default)]
    points_count: Option<u64>,
    config: CollectionConfig,
}

#[derive(Debug, Deserialize)]
struct CollectionConfig {
    params: CollectionParams,
}

#[derive(Debug, Deserialize)]
struct CollectionParams {
    vectors: Value,
}

#[derive(Debug, Deserialize)]
struct ScoredPoint {
    id: Value,
    score: f32,
    #[serde(default)]
    payload: Option<Map<String, Value>>,
}

impl QdrantIndex {
    pub fn new(url: &str, api_key: Option<String>, retry: RetryPolicy) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: url.trim_end_matches('/').to_string(),
            api_key,
            retry,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, http::join_url(&self.base_url, path));
        match &self.api_key {
            Some(key) => builder.header("api-key", key),
            None => builder,
        }
    }

    /// Send a request scoped to `collection`; 404 means the collection is absent.
    async fn send(&self, request: RequestBuilder, collection: &str) -> AppResult<reqwest::Response> {
        let response = request
            .send()
            .await
            .map_err(|e| http::transport_error(Service::VectorStore, e))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(AppError::CollectionNotFound(collection.to_string()));
        }
        http::ensure_success(Service::VectorStore, response).await
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> AppResult<T> {
        response
            .json()
            .await
            .map_err(|e| http::transport_error(Service::VectorStore, e))
    }

    async fn fetch_info(&self, name: &str) -> AppResult<Option<CollectionInfo>> {
        let request = self.request(Method::GET, &format!("collections/{}", name));
        match self.send(request, name).await {
            Ok(response) => {
                let body: QdrantResponse<CollectionDescription> = Self::decode(response).await?;
                describe(name, body.result).map(Some)
            }
            Err(AppError::CollectionNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create_once(&self, spec: &CollectionSpec) -> AppResult<()> {
        let request = self
            .request(Method::PUT, &format!("collections/{}", spec.name))
            .json(&json!({
                "vectors": { "size": spec.dimension, "distance": distance_name(spec.metric) }
            }));
        self.send(request, &spec.name).await?;
        Ok(())
    }

    async fn delete_once(&self, name: &str) -> AppResult<()> {
        let request = self.request(Method::DELETE, &format!("collections/{}", name));
        match self.send(request, name).await {
            Ok(_) | Err(AppError::CollectionNotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn upsert_once(&self, collection: &str, points: &[Value]) -> AppResult<()> {
        let request = self
            .request(
                Method::PUT,
                &format!("collections/{}/points?wait=true", collection),
            )
            .json(&json!({ "points": points }));
        self.send(request, collection).await?;
        Ok(())
    }

    async fn delete_points_once(&self, collection: &str, ids: &[Value]) -> AppResult<()> {
        let request = self
            .request(
                Method::POST,
                &format!("collections/{}/points/delete?wait=true", collection),
            )
            .json(&json!({ "points": ids }));
        self.send(request, collection).await?;
        Ok(())
    }

    /// Remove points from an upsert that did not complete.
    async fn roll_back(&self, collection: &str, points: &[Value], cause: AppError) -> AppError {
        let ids: Vec<Value> = points.iter().map(|p| p["id"].clone()).collect();
        tracing::warn!(points = ids.len(), error = %cause, "Upsert failed; removing points already sent");

        match self
            .retry
            .run("qdrant.delete_points", || self.delete_points_once(collection, &ids))
            .await
        {
            Ok(()) => cause,
            Err(e) => AppError::VectorStore(format!(
                "{}; removing {} partially written points also failed: {}",
                cause,
                ids.len(),
                e
            )),
        }
    }

    async fn search_once(
        &self,
        collection: &str,
        vector: &[f32],
        k: usize,
    ) -> AppResult<Vec<ScoredPoint>> {
        let request = self
            .request(Method::POST, &format!("collections/{}/points/search", collection))
            .json(&json!({ "vector": vector, "limit": k, "with_payload": true }));
        let response = self.send(request, collection).await?;
        let body: QdrantResponse<Vec<ScoredPoint>> = Self::decode(response).await?;
        Ok(body.result)
    }
}

fn distance_name(metric: Metric) -> &'static str {
    match metric {
        Metric::Cosine => "Cosine",
    }
}

fn describe(name: &str, description: CollectionDescription) -> AppResult<CollectionInfo> {
    let vectors = &description.config.params.vectors;
    let dimension = vectors.get("size").and_then(Value::as_u64).ok_or_else(|| {
        AppError::VectorStore(format!(
            "Collection '{}' uses named vectors, which are not supported",
            name
        ))
    })?;
    let distance = vectors
        .get("distance")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let metric = Metric::parse(distance).ok_or_else(|| {
        AppError::VectorStore(format!(
            "Collection '{}' uses unsupported distance '{}'",
            name, distance
        ))
    })?;

    Ok(CollectionInfo {
        name: name.to_string(),
        dimension: dimension as usize,
        metric,
        passages: description.points_count.unwrap_or(0),
    })
}

/// Point body for a passage.
fn to_point(entry: &IndexedPassage) -> Value {
    let passage = &entry.passage;
    let mut metadata = passage.metadata.clone();
    metadata.insert("source".to_string(), json!(passage.source));
    metadata.insert("sequence_index".to_string(), json!(passage.sequence_index));
    metadata.insert("page".to_string(), json!(passage.page));
    metadata.insert("byte_start".to_string(), json!(passage.byte_range.0));
    metadata.insert("byte_end".to_string(), json!(passage.byte_range.1));
    metadata.insert("content_hash".to_string(), json!(passage.content_hash));

    json!({
        "id": passage.id,
        "vector": entry.vector,
        "payload": { "page_content": passage.text, "metadata": metadata },
    })
}

/// Rebuild a passage from a stored point. Missing fields get neutral values
/// so that points written by other tools still come back.
fn from_point(id: &Value, payload: Option<Map<String, Value>>) -> Passage {
    let mut payload = payload.unwrap_or_default();
    let text = match payload.remove("page_content") {
        Some(Value::String(text)) => text,
        _ => String::new(),
    };
    let mut metadata = match payload.remove("metadata") {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };

    let mut take_u64 = |key: &str| metadata.remove(key).and_then(|v| v.as_u64());
    let sequence_index = take_u64("sequence_index").unwrap_or(0) as u32;
    let page = take_u64("page").map(|p| p as u32);
    let byte_start = take_u64("byte_start").unwrap_or(0) as usize;
    let byte_end = take_u64("byte_end").unwrap_or(text.len() as u64) as usize;

    let source = match metadata.remove("source") {
        Some(Value::String(source)) => source,
        _ => "unknown".to_string(),
    };
    let content_hash = match metadata.remove("content_hash") {
        Some(Value::String(hash)) => hash,
        _ => sha256_hex(text.as_bytes()),
    };
    let id = match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    Passage {
        id,
        source,
        sequence_index,
        page,
        byte_range: (byte_start, byte_end),
        text,
        content_hash,
        metadata,
    }
}

#[async_trait::async_trait]
impl VectorIndex for QdrantIndex {
    fn backend_name(&self) -> &'static str {
        "qdrant"
    }

    async fn collection_info(&self, name: &str) -> AppResult<Option<CollectionInfo>> {
        self.retry
            .run("qdrant.get_collection", || self.fetch_info(name))
            .await
    }

    #[instrument(skip(self, spec), fields(collection = %spec.name))]
    async fn ensure_collection(&self, spec: &CollectionSpec) -> AppResult<()> {
        if let Some(existing) = self.collection_info(&spec.name).await? {
            return check_compatible(&existing, spec);
        }

        match self
            .retry
            .run("qdrant.create_collection", || self.create_once(spec))
            .await
        {
            Ok(()) => {
                tracing::info!(dimension = spec.dimension, "Created Qdrant collection");
                Ok(())
            }
            // Lost a creation race: accept the collection if it matches.
            Err(create_err) => match self.collection_info(&spec.name).await? {
                Some(existing) => check_compatible(&existing, spec),
                None => Err(create_err),
            },
        }
    }

    #[instrument(skip(self, passages), fields(collection = %collection, count = passages.len()))]
    async fn upsert(&self, collection: &str, passages: Vec<IndexedPassage>) -> AppResult<usize> {
        let info = self
            .collection_info(collection)
            .await?
            .ok_or_else(|| AppError::CollectionNotFound(collection.to_string()))?;
        check_dimensions(info.dimension, &passages)?;

        // Requests are applied one by one; on failure every point sent so
        // far, including the failed request, is deleted again.
        let points: Vec<Value> = passages.iter().map(to_point).collect();
        let mut sent = 0;
        for batch in points.chunks(UPSERT_BATCH) {
            sent += batch.len();
            if let Err(e) = self
                .retry
                .run("qdrant.upsert", || self.upsert_once(collection, batch))
                .await
            {
                return Err(self.roll_back(collection, &points[..sent], e).await);
            }
        }
        Ok(points.len())
    }

    #[instrument(skip(self, vector), fields(collection = %collection, k))]
    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        k: usize,
    ) -> AppResult<Vec<ScoredPassage>> {
        let points = self
            .retry
            .run("qdrant.search", || self.search_once(collection, vector, k))
            .await?;

        Ok(points
            .into_iter()
            .map(|point| ScoredPassage {
                passage: from_point(&point.id, point.payload),
                score: point.score,
            })
            .collect())
    }

    async fn reset(&self, name: &str) -> AppResult<()> {
        let Some(existing) = self.collection_info(name).await? else {
            return Ok(());
        };
        let spec = CollectionSpec {
            name: name.to_string(),
            dimension: existing.dimension,
            metric: existing.metric,
        };

        self.retry
            .run("qdrant.delete_collection", || self.delete_once(name))
            .await?;
        self.retry
            .run("qdrant.create_collection", || self.create_once(&spec))
            .await?;

        tracing::info!(collection = %name, "Reset Qdrant collection");
        Ok(())
    }
}
