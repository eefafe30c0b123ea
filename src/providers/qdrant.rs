//! Qdrant-backed vector index adapter
use anyhow::Context;
use async_trait::async_trait;
use qdrant_client::{
    client::QdrantClient,
    qdrant::{
        condition::ConditionOneOf, r#match::MatchValue, vectors_config::Config,
        with_payload_selector::SelectorOptions, Condition, CreateCollection, Distance,
        FieldCondition, Filter, Match, PointStruct, PointsIdsList, PointsSelector, Range,
        SearchPoints, Value as QdrantValue, VectorParams, VectorsConfig, WithPayloadSelector,
    },
};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

use crate::errors::{MemoryError, Result};
use crate::providers::vector_index::{IndexFilter, IndexHit, VectorIndex};

const COLLECTION: &str = "memories";

/// Vector index backed by a Qdrant instance
pub struct QdrantIndex {
    client: QdrantClient,
    embedding_dim: u64,
}

impl QdrantIndex {
    /// Connect and ensure the memories collection exists
    pub async fn new(url: &str, embedding_dim: usize) -> Result<Self> {
        let client = QdrantClient::from_url(url)
            .build()
            .context("Failed to create Qdrant client")
            .map_err(|e| MemoryError::provider("vector_index", e))?;

        let index = Self {
            client,
            embedding_dim: embedding_dim as u64,
        };
        index.init_collection().await?;
        Ok(index)
    }

    async fn init_collection(&self) -> Result<()> {
        let collections = self
            .client
            .list_collections()
            .await
            .map_err(|e| MemoryError::provider("vector_index", e))?;

        let exists = collections
            .collections
            .iter()
            .any(|c| c.name == COLLECTION);

        if !exists {
            self.client
                .create_collection(&CreateCollection {
                    collection_name: COLLECTION.to_string(),
                    vectors_config: Some(VectorsConfig {
                        config: Some(Config::Params(VectorParams {
                            size: self.embedding_dim,
                            distance: Distance::Cosine.into(),
                            ..Default::default()
                        })),
                    }),
                    ..Default::default()
                })
                .await
                .map_err(|e| MemoryError::provider("vector_index", e))?;
        }

        Ok(())
    }

    fn build_filter(filter: &IndexFilter) -> Filter {
        let mut must = vec![Condition {
            condition_one_of: Some(ConditionOneOf::Field(FieldCondition {
                key: "user_id".to_string(),
                r#match: Some(Match {
                    match_value: Some(MatchValue::Keyword(filter.user_id.clone())),
                }),
                ..Default::default()
            })),
        }];

        if let Some(memory_type) = filter.memory_type {
            must.push(Condition {
                condition_one_of: Some(ConditionOneOf::Field(FieldCondition {
                    key: "memory_type".to_string(),
                    r#match: Some(Match {
                        match_value: Some(MatchValue::Keyword(memory_type.as_str().to_string())),
                    }),
                    ..Default::default()
                })),
            });
        }

        if let Some(min_importance) = filter.min_importance {
            must.push(Condition {
                condition_one_of: Some(ConditionOneOf::Field(FieldCondition {
                    key: "importance_score".to_string(),
                    range: Some(Range {
                        gte: Some(min_importance),
                        ..Default::default()
                    }),
                    ..Default::default()
                })),
            });
        }

        Filter {
            must,
            ..Default::default()
        }
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
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

        let points: Vec<PointStruct> = ids
            .iter()
            .zip(vectors.iter())
            .zip(documents.iter())
            .zip(metadatas.iter())
            .map(|(((id, vector), document), metadata)| {
                let mut payload = HashMap::new();
                for (key, value) in metadata {
                    payload.insert(key.clone(), json_to_qdrant_value(value.clone()));
                }
                payload.insert(
                    "document".to_string(),
                    QdrantValue::from(document.to_string()),
                );
                PointStruct::new(id.clone(), vector.clone(), payload)
            })
            .collect();

        self.client
            .upsert_points_blocking(COLLECTION, None, points, None)
            .await
            .map_err(|e| MemoryError::provider("vector_index", e))?;

        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        n: usize,
        filter: &IndexFilter,
    ) -> Result<Vec<IndexHit>> {
        let search_result = self
            .client
            .search_points(&SearchPoints {
                collection_name: COLLECTION.to_string(),
                vector: vector.to_vec(),
                limit: n as u64,
                with_payload: Some(WithPayloadSelector {
                    selector_options: Some(SelectorOptions::Enable(true)),
                }),
                filter: Some(Self::build_filter(filter)),
                ..Default::default()
            })
            .await
            .map_err(|e| MemoryError::provider("vector_index", e))?;

        let hits = search_result
            .result
            .into_iter()
            .map(|point| {
                let payload = point.payload;
                let document = payload
                    .get("document")
                    .and_then(qdrant_value_to_string)
                    .unwrap_or_default();

                let mut metadata = HashMap::new();
                for (key, value) in payload {
                    if key != "document" {
                        if let Some(json_val) = qdrant_to_json_value(&value) {
                            metadata.insert(key, json_val);
                        }
                    }
                }

                IndexHit {
                    id: point_id_to_string(&point.id),
                    document,
                    metadata,
                    // Cosine score from Qdrant is a similarity
                    distance: 1.0 - point.score as f64,
                }
            })
            .collect();

        Ok(hits)
    }

    async fn delete(&self, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        self.client
            .delete_points(
                COLLECTION,
                None,
                &PointsSelector {
                    points_selector_one_of: Some(
                        qdrant_client::qdrant::points_selector::PointsSelectorOneOf::Points(
                            PointsIdsList {
                                ids: ids
                                    .iter()
                                    .map(|id| qdrant_client::qdrant::PointId::from(id.to_string()))
                                    .collect(),
                            },
                        ),
                    ),
                },
                None,
            )
            .await
            .map_err(|e| MemoryError::provider("vector_index", e))?;

        Ok(())
    }
}

// Helper functions for type conversions
fn json_to_qdrant_value(json: JsonValue) -> QdrantValue {
    match json {
        JsonValue::String(s) => QdrantValue::from(s),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                QdrantValue::from(i)
            } else if let Some(f) = n.as_f64() {
                QdrantValue::from(f)
            } else {
                QdrantValue::from(0)
            }
        }
        JsonValue::Bool(b) => QdrantValue::from(b),
        _ => QdrantValue::from(""),
    }
}

fn qdrant_to_json_value(value: &QdrantValue) -> Option<JsonValue> {
    value.kind.as_ref().and_then(|kind| {
        use qdrant_client::qdrant::value::Kind;
        match kind {
            Kind::StringValue(s) => Some(JsonValue::String(s.clone())),
            Kind::IntegerValue(i) => Some(JsonValue::Number((*i).into())),
            Kind::DoubleValue(f) => serde_json::Number::from_f64(*f).map(JsonValue::Number),
            Kind::BoolValue(b) => Some(JsonValue::Bool(*b)),
            _ => None,
        }
    })
}

fn qdrant_value_to_string(value: &QdrantValue) -> Option<String> {
    value.kind.as_ref().and_then(|kind| {
        use qdrant_client::qdrant::value::Kind;
        match kind {
            Kind::StringValue(s) => Some(s.clone()),
            _ => None,
        }
    })
}

fn point_id_to_string(point_id: &Option<qdrant_client::qdrant::PointId>) -> String {
    point_id
        .as_ref()
        .map(|id| {
            use qdrant_client::qdrant::point_id::PointIdOptions;
            match &id.point_id_options {
                Some(PointIdOptions::Num(n)) => n.to_string(),
                Some(PointIdOptions::Uuid(u)) => u.clone(),
                None => "unknown".to_string(),
            }
        })
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MemoryType;

    #[test]
    fn test_build_filter_user_only() {
        let filter = IndexFilter::for_user("u1");
        let built = QdrantIndex::build_filter(&filter);
        assert_eq!(built.must.len(), 1);
    }

    #[test]
    fn test_build_filter_all_conditions() {
        let filter = IndexFilter::for_user("u1")
            .with_type(Some(MemoryType::Preference))
            .with_min_importance(Some(0.5));
        let built = QdrantIndex::build_filter(&filter);
        assert_eq!(built.must.len(), 3);
    }

    #[tokio::test]
    #[ignore] // Integration test - requires Qdrant
    async fn test_add_and_query() {
        let index = QdrantIndex::new("http://localhost:6334", 768).await.unwrap();

        let mut metadata = HashMap::new();
        metadata.insert("user_id".to_string(), JsonValue::String("u1".to_string()));
        metadata.insert(
            "memory_type".to_string(),
            JsonValue::String("fact".to_string()),
        );

        index
            .add(
                &["11111111-1111-1111-1111-111111111111".to_string()],
                &[vec![0.1; 768]],
                &["Test document".to_string()],
                &[metadata],
            )
            .await
            .unwrap();

        let hits = index
            .query(&vec![0.1; 768], 5, &IndexFilter::for_user("u1"))
            .await
            .unwrap();

        assert!(!hits.is_empty());
        assert_eq!(hits[0].document, "Test document");
    }
}
