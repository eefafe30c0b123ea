//! Vector index seam
//!
//! add/query/delete over embedding vectors with metadata filters. The
//! engine never ranks vectors itself; it consumes distances from the
//! index and converts them to relevance (1 - distance).

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::errors::{MemoryError, Result};
use crate::providers::embedding::cosine_similarity;
use crate::types::MemoryType;

/// Metadata filter applied inside the index
#[derive(Debug, Clone)]
pub struct IndexFilter {
    /// Owner filter, always present
    pub user_id: String,
    /// Optional memory tier filter
    pub memory_type: Option<MemoryType>,
    /// Optional importance floor
    pub min_importance: Option<f64>,
}

impl IndexFilter {
    pub fn for_user(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            memory_type: None,
            min_importance: None,
        }
    }

    pub fn with_type(mut self, memory_type: Option<MemoryType>) -> Self {
        self.memory_type = memory_type;
        self
    }

    pub fn with_min_importance(mut self, min_importance: Option<f64>) -> Self {
        self.min_importance = min_importance;
        self
    }

    /// Check a metadata map against this filter
    pub fn matches(&self, metadata: &HashMap<String, JsonValue>) -> bool {
        let user_ok = metadata
            .get("user_id")
            .and_then(|v| v.as_str())
            .map(|u| u == self.user_id)
            .unwrap_or(false);
        if !user_ok {
            return false;
        }

        if let Some(memory_type) = self.memory_type {
            let type_ok = metadata
                .get("memory_type")
                .and_then(|v| v.as_str())
                .map(|t| t == memory_type.as_str())
                .unwrap_or(false);
            if !type_ok {
                return false;
            }
        }

        if let Some(min) = self.min_importance {
            let importance = metadata
                .get("importance_score")
                .and_then(|v| v.as_f64())
                .unwrap_or(0.0);
            if importance < min {
                return false;
            }
        }

        true
    }
}

/// One nearest-neighbor hit
#[derive(Debug, Clone)]
pub struct IndexHit {
    pub id: String,
    pub document: String,
    pub metadata: HashMap<String, JsonValue>,
    /// Cosine distance; relevance is 1 - distance
    pub distance: f64,
}

/// Vector similarity index
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Upsert points; the three slices must have equal length
    async fn add(
        &self,
        ids: &[String],
        vectors: &[Vec<f32>],
        documents: &[String],
        metadatas: &[HashMap<String, JsonValue>],
    ) -> Result<()>;

    /// Query the n nearest neighbors matching the filter, closest first
    async fn query(&self, vector: &[f32], n: usize, filter: &IndexFilter)
        -> Result<Vec<IndexHit>>;

    /// Delete points by id; unknown ids are ignored
    async fn delete(&self, ids: &[String]) -> Result<()>;
}

struct StoredPoint {
    vector: Vec<f32>,
    document: String,
    metadata: HashMap<String, JsonValue>,
}

/// In-memory cosine index for tests and embedded deployments
pub struct InMemoryIndex {
    points: Arc<RwLock<HashMap<String, StoredPoint>>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self {
            points: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of stored points
    pub async fn len(&self) -> usize {
        self.points.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.points.read().await.is_empty()
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn add(
        &self,
        ids: &[String],
        vectors: &[Vec<f32>],
        documents: &[String],
        metadatas: &[HashMap<String, JsonValue>],
    ) -> Result<()> {
        if ids.len() != vectors.len() || ids.len() != documents.len() || ids.len() != metadatas.len()
        {
            return Err(MemoryError::validation(
                "ids",
                "ids, vectors, documents, and metadatas must have equal length",
            ));
        }

        let mut points = self.points.write().await;
        for (((id, vector), document), metadata) in ids
            .iter()
            .zip(vectors.iter())
            .zip(documents.iter())
            .zip(metadatas.iter())
        {
            points.insert(
                id.clone(),
                StoredPoint {
                    vector: vector.clone(),
                    document: document.clone(),
                    metadata: metadata.clone(),
                },
            );
        }
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        n: usize,
        filter: &IndexFilter,
    ) -> Result<Vec<IndexHit>> {
        let points = self.points.read().await;

        let mut hits: Vec<IndexHit> = points
            .iter()
            .filter(|(_, point)| filter.matches(&point.metadata))
            .map(|(id, point)| IndexHit {
                id: id.clone(),
                document: point.document.clone(),
                metadata: point.metadata.clone(),
                distance: 1.0 - cosine_similarity(vector, &point.vector),
            })
            .collect();

        hits.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap());
        hits.truncate(n);
        Ok(hits)
    }

    async fn delete(&self, ids: &[String]) -> Result<()> {
        let mut points = self.points.write().await;
        for id in ids {
            points.remove(id);
        }
        Ok(())
    }
}
