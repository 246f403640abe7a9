//! Exact k-nearest-neighbor index over one collection's embeddings.
//!
//! Vectors are kept in insertion order and ranked by a full linear scan under
//! cosine distance. Equal distances keep insertion order, so results are
//! deterministic. The index is never persisted; it is rebuilt from the
//! repository when a collection is opened.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::error::{Error, Result};

struct IndexEntry {
    id: String,
    vector: Vec<f32>,
    norm: f32,
}

/// Restore point taken before a multi-step write. See [`SimilarityIndex::rollback`].
#[derive(Debug, Clone, Copy)]
pub struct IndexMark {
    len: usize,
    dimension: Option<usize>,
}

pub struct SimilarityIndex {
    collection: String,
    dimension: Option<usize>,
    entries: Vec<IndexEntry>,
    ids: HashSet<String>,
}

impl SimilarityIndex {
    /// An empty index. `dimension` is the collection's established D, if any.
    pub fn new(collection: &str, dimension: Option<usize>) -> Self {
        Self {
            collection: collection.to_string(),
            dimension,
            entries: Vec::new(),
            ids: HashSet::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Ids in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.id.as_str())
    }

    /// Add a vector keyed by `id`. The first vector added to an index with no
    /// established dimension fixes it.
    pub fn add(&mut self, id: &str, embedding: &[f32]) -> Result<()> {
        if let Some(expected) = self.dimension {
            if expected != embedding.len() {
                return Err(Error::DimensionMismatch {
                    expected,
                    actual: embedding.len(),
                });
            }
        }
        if embedding.is_empty() {
            return Err(Error::validation("embedding must not be empty"));
        }
        if embedding.iter().any(|x| !x.is_finite()) {
            return Err(Error::validation("embedding contains non-finite values"));
        }
        if self.ids.contains(id) {
            return Err(Error::consistency(format!(
                "note {id} is already indexed in collection '{}'",
                self.collection
            )));
        }

        self.dimension = Some(embedding.len());
        self.ids.insert(id.to_string());
        self.entries.push(IndexEntry {
            id: id.to_string(),
            norm: norm(embedding),
            vector: embedding.to_vec(),
        });
        Ok(())
    }

    /// The `k` nearest vectors to `embedding` as `(id, distance)`, closest first.
    ///
    /// Fails with [`Error::EmptyCollection`] when nothing is indexed.
    pub fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<(String, f32)>> {
        if self.entries.is_empty() {
            return Err(Error::EmptyCollection {
                collection: self.collection.clone(),
            });
        }
        if let Some(expected) = self.dimension {
            if expected != embedding.len() {
                return Err(Error::DimensionMismatch {
                    expected,
                    actual: embedding.len(),
                });
            }
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_norm = norm(embedding);
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(pos, e)| (pos, distance_with_norms(embedding, query_norm, &e.vector, e.norm)))
            .collect();

        // (distance, insertion position) is a total order, so partial selection stays deterministic
        let by_rank = |a: &(usize, f32), b: &(usize, f32)| -> Ordering {
            a.1.total_cmp(&b.1).then(a.0.cmp(&b.0))
        };
        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, by_rank);
            scored.truncate(k);
        }
        scored.sort_by(by_rank);

        Ok(scored
            .into_iter()
            .map(|(pos, distance)| (self.entries[pos].id.clone(), distance))
            .collect())
    }

    /// Remove every entry whose id is in `ids`. Returns how many were removed.
    pub fn remove(&mut self, ids: &[String]) -> usize {
        let doomed: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let before = self.entries.len();
        self.entries.retain(|e| !doomed.contains(e.id.as_str()));
        for id in ids {
            self.ids.remove(id);
        }
        before - self.entries.len()
    }

    pub fn mark(&self) -> IndexMark {
        IndexMark {
            len: self.entries.len(),
            dimension: self.dimension,
        }
    }

    /// Drop everything added since `mark` was taken.
    pub fn rollback(&mut self, mark: IndexMark) {
        if mark.len < self.entries.len() {
            for entry in self.entries.drain(mark.len..) {
                self.ids.remove(&entry.id);
            }
        }
        self.dimension = mark.dimension;
    }
}

fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn distance_with_norms(a: &[f32], norm_a: f32, b: &[f32], norm_b: f32) -> f32 {
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    (1.0 - dot / (norm_a * norm_b)).clamp(0.0, 2.0)
}

/// Cosine distance `1 - (a·b)/(‖a‖‖b‖)`, in `[0, 2]`. A zero-magnitude vector
/// is at distance 1 from everything.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    distance_with_norms(a, norm(a), b, norm(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Unit vector in the plane with cosine `cos` to `[1, 0]`.
    fn at_cosine(cos: f32) -> Vec<f32> {
        vec![cos, (1.0 - cos * cos).sqrt()]
    }

    #[test]
    fn cosine_distance_basics() {
        assert!((cosine_distance(&[1.0, 0.0], &[2.0, 0.0])).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_is_maximally_dissimilar() {
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
        assert_eq!(cosine_distance(&[1.0, 0.0], &[0.0, 0.0]), 1.0);
        assert_eq!(cosine_distance(&[0.0, 0.0], &[0.0, 0.0]), 1.0);
    }

    #[test]
    fn query_orders_by_ascending_distance() {
        let mut index = SimilarityIndex::new("c", None);
        index.add("C", &at_cosine(0.1)).unwrap();
        index.add("A", &at_cosine(0.9)).unwrap();
        index.add("B", &at_cosine(0.5)).unwrap();

        let hits = index.query(&[1.0, 0.0], 2).unwrap();
        let ids: Vec<&str> = hits.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);
        assert!((hits[0].1 - 0.1).abs() < 1e-5);
        assert!((hits[1].1 - 0.5).abs() < 1e-5);
    }

    #[test]
    fn ties_keep_insertion_order() {
        let mut index = SimilarityIndex::new("c", None);
        index.add("far", &[0.0, 1.0]).unwrap();
        index.add("first", &[1.0, 0.0]).unwrap();
        index.add("second", &[1.0, 0.0]).unwrap();
        index.add("third", &[3.0, 0.0]).unwrap();

        let hits = index.query(&[1.0, 0.0], 3).unwrap();
        let ids: Vec<&str> = hits.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn fewer_than_k_returns_all() {
        let mut index = SimilarityIndex::new("c", None);
        index.add("a", &[1.0, 0.0]).unwrap();
        index.add("b", &[0.0, 1.0]).unwrap();
        assert_eq!(index.query(&[1.0, 0.0], 10).unwrap().len(), 2);
    }

    #[test]
    fn empty_index_is_an_error() {
        let index = SimilarityIndex::new("c", Some(2));
        let err = index.query(&[1.0, 0.0], 5).unwrap_err();
        assert!(matches!(err, Error::EmptyCollection { .. }));
    }

    #[test]
    fn dimension_fixed_by_first_add() {
        let mut index = SimilarityIndex::new("c", None);
        index.add("a", &[1.0, 0.0, 0.0]).unwrap();
        let err = index.add("b", &[1.0, 0.0]).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 3, actual: 2 }));
        assert_eq!(index.len(), 1);

        let err = index.query(&[1.0], 1).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
    }

    #[test]
    fn duplicate_id_rejected() {
        let mut index = SimilarityIndex::new("c", None);
        index.add("a", &[1.0]).unwrap();
        assert_eq!(index.add("a", &[1.0]).unwrap_err().kind(), "consistency_error");
    }

    #[test]
    fn non_finite_rejected() {
        let mut index = SimilarityIndex::new("c", None);
        assert!(index.add("a", &[f32::NAN, 1.0]).is_err());
        assert!(index.is_empty());
        assert_eq!(index.dimension(), None);
    }

    #[test]
    fn rollback_restores_mark() {
        let mut index = SimilarityIndex::new("c", None);
        let mark = index.mark();
        index.add("a", &[1.0, 0.0]).unwrap();
        index.add("b", &[0.0, 1.0]).unwrap();
        index.rollback(mark);
        assert!(index.is_empty());
        assert!(!index.contains("a"));
        assert_eq!(index.dimension(), None);
        index.add("c", &[1.0, 0.0, 0.0]).unwrap();
    }

    #[test]
    fn remove_drops_entries() {
        let mut index = SimilarityIndex::new("c", None);
        index.add("a", &[1.0, 0.0]).unwrap();
        index.add("b", &[0.0, 1.0]).unwrap();
        assert_eq!(index.remove(&["a".to_string()]), 1);
        let hits = index.query(&[1.0, 0.0], 5).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, "b");
        assert_eq!(index.dimension(), Some(2));
    }

    #[test]
    fn k_zero_is_empty() {
        let mut index = SimilarityIndex::new("c", None);
        index.add("a", &[1.0]).unwrap();
        assert!(index.query(&[1.0], 0).unwrap().is_empty());
    }
}
