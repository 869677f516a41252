use crate::traits::VectorIndex;
use crate::{ScoredChunk, StoreError};
use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};
use uuid::Uuid;

#[derive(Debug, Clone)]
struct Record {
    id: String,
    text: String,
    vector: Vec<f32>,
}

/// Process-local index scored by cosine similarity. Nothing is persisted.
#[derive(Debug, Default)]
pub struct InMemoryIndex {
    records: Mutex<Vec<Record>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn texts(&self) -> Vec<String> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|record| record.text.clone())
            .collect()
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn add(&self, texts: &[String], embeddings: &[Vec<f32>]) -> Result<Vec<String>, StoreError> {
        if texts.len() != embeddings.len() {
            return Err(StoreError::Request(format!(
                "embedding count {} doesn't match chunk count {}",
                embeddings.len(),
                texts.len()
            )));
        }

        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        let mut ids = Vec::with_capacity(texts.len());
        for (text, vector) in texts.iter().zip(embeddings) {
            let id = Uuid::new_v4().to_string();
            records.push(Record {
                id: id.clone(),
                text: text.clone(),
                vector: vector.clone(),
            });
            ids.push(id);
        }
        Ok(ids)
    }

    async fn similarity_search(
        &self,
        query_vector: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredChunk>, StoreError> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        let mut scored: Vec<ScoredChunk> = records
            .iter()
            .map(|record| ScoredChunk {
                id: record.id.clone(),
                text: record.text.clone(),
                score: cosine(query_vector, &record.vector),
            })
            .collect();

        scored.sort_by(|left, right| right.score.total_cmp(&left.score));
        scored.truncate(k);
        Ok(scored)
    }
}

fn cosine(left: &[f32], right: &[f32]) -> f64 {
    let dot: f64 = left
        .iter()
        .zip(right)
        .map(|(a, b)| f64::from(*a) * f64::from(*b))
        .sum();
    let norm = |values: &[f32]| values.iter().map(|v| f64::from(*v).powi(2)).sum::<f64>().sqrt();
    let denominator = norm(left) * norm(right);
    if denominator == 0.0 {
        0.0
    } else {
        dot / denominator
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn search_returns_nearest_first() {
        let index = InMemoryIndex::new();
        index
            .add(
                &["east".to_string(), "north".to_string(), "north-east".to_string()],
                &[vec![1.0, 0.0], vec![0.0, 1.0], vec![0.7, 0.7]],
            )
            .await
            .unwrap();

        let hits = index.similarity_search(&[0.0, 1.0], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text, "north");
        assert_eq!(hits[1].text, "north-east");
        assert!((hits[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn add_rejects_mismatched_lengths() {
        let index = InMemoryIndex::new();
        let result = index.add(&["only".to_string()], &[]).await;
        assert!(matches!(result, Err(StoreError::Request(_))));
        assert!(index.is_empty());
    }
}
