//! In-process [`VectorIndex`] for local runs and tests.
//!
//! Namespaces map record ids to vectors behind a `std::sync::RwLock`. Queries
//! are brute-force cosine similarity over the whole namespace.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::traits::VectorIndex;
use crate::{QueryMatch, StoreError, VectorRecord};

#[derive(Debug, Default)]
pub struct InMemoryStore {
    namespaces: RwLock<HashMap<String, HashMap<String, VectorRecord>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn namespace_len(&self, namespace: &str) -> usize {
        self.namespaces
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(namespace)
            .map_or(0, HashMap::len)
    }
}

fn cosine_sim(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a < f32::EPSILON || mag_b < f32::EPSILON {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}

#[async_trait]
impl VectorIndex for InMemoryStore {
    async fn upsert(&self, namespace: &str, records: &[VectorRecord]) -> Result<(), StoreError> {
        let mut namespaces = self
            .namespaces
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let entries = namespaces.entry(namespace.to_string()).or_default();
        for record in records {
            entries.insert(record.id.clone(), record.clone());
        }
        Ok(())
    }

    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<QueryMatch>, StoreError> {
        let namespaces = self
            .namespaces
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let entries = namespaces
            .get(namespace)
            .ok_or_else(|| StoreError::NamespaceNotFound(namespace.to_string()))?;

        let mut scored = entries
            .values()
            .map(|record| QueryMatch {
                id: record.id.clone(),
                score: cosine_sim(vector, &record.values),
                text: record.text.clone(),
            })
            .collect::<Vec<_>>();
        scored.sort_by(|left, right| {
            right
                .score
                .total_cmp(&left.score)
                .then_with(|| left.id.cmp(&right.id))
        });
        scored.truncate(top_k);

        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, values: Vec<f32>, text: &str) -> VectorRecord {
        VectorRecord {
            id: id.to_string(),
            values,
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn query_ranks_by_cosine_similarity() {
        let store = InMemoryStore::new();
        store
            .upsert(
                "doc",
                &[
                    record("doc_0", vec![1.0, 0.0], "east"),
                    record("doc_1", vec![0.0, 1.0], "north"),
                    record("doc_2", vec![0.7, 0.7], "north-east"),
                ],
            )
            .await
            .expect("upsert succeeds");

        let matches = store.query("doc", &[1.0, 0.1], 2).await.expect("query succeeds");
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].text, "east");
        assert_eq!(matches[1].text, "north-east");
        assert!(matches[0].score >= matches[1].score);
    }

    #[tokio::test]
    async fn unknown_namespace_is_reported() {
        let store = InMemoryStore::new();
        let error = store.query("missing", &[1.0], 5).await.unwrap_err();
        assert!(matches!(error, StoreError::NamespaceNotFound(ns) if ns == "missing"));
    }

    #[tokio::test]
    async fn namespaces_are_isolated_and_upserts_replace_by_id() {
        let store = InMemoryStore::new();
        store
            .upsert("a", &[record("a_0", vec![1.0], "old")])
            .await
            .expect("upsert succeeds");
        store
            .upsert("a", &[record("a_0", vec![1.0], "new")])
            .await
            .expect("upsert succeeds");
        store
            .upsert("b", &[record("b_0", vec![1.0], "other")])
            .await
            .expect("upsert succeeds");

        assert_eq!(store.namespace_len("a"), 1);
        let matches = store.query("a", &[1.0], 5).await.expect("query succeeds");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].text, "new");
    }
}
