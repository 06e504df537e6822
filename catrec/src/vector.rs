use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::TermId;

/// Sparse weighted-term vector over the index's term dimensions.
///
/// Stored as parallel arrays sorted by dimension id. Dimensions absent from
/// `dims` are implicitly zero and never materialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    dims: Vec<TermId>,
    weights: Vec<f64>,
}

impl SparseVector {
    /// Build from (dimension, weight) pairs; zero weights are skipped.
    pub fn from_map(map: &BTreeMap<TermId, f64>) -> Self {
        let mut dims = Vec::with_capacity(map.len());
        let mut weights = Vec::with_capacity(map.len());
        for (&dim, &w) in map {
            if w != 0.0 {
                dims.push(dim);
                weights.push(w);
            }
        }
        Self { dims, weights }
    }

    pub fn len(&self) -> usize {
        self.dims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dims.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TermId, f64)> + '_ {
        self.dims.iter().copied().zip(self.weights.iter().copied())
    }

    pub fn get(&self, dim: TermId) -> f64 {
        match self.dims.binary_search(&dim) {
            Ok(i) => self.weights[i],
            Err(_) => 0.0,
        }
    }

    pub fn l2_norm(&self) -> f64 {
        self.weights.iter().map(|w| w * w).sum::<f64>().sqrt()
    }

    /// Dot product restricted to the intersection of non-zero dimensions.
    pub fn dot(&self, other: &Self) -> f64 {
        let mut dot = 0.0;
        let (mut i, mut j) = (0, 0);
        while i < self.dims.len() && j < other.dims.len() {
            match self.dims[i].cmp(&other.dims[j]) {
                Ordering::Equal => {
                    dot += self.weights[i] * other.weights[j];
                    i += 1;
                    j += 1;
                }
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
            }
        }
        dot
    }

    /// Cosine similarity in `[0, 1]` (all weights are non-negative TF-IDF
    /// products). Returns exactly `0.0` when the non-zero dimensions are
    /// disjoint, short-circuiting before any division so zero vectors are
    /// never a division hazard.
    pub fn cosine(&self, other: &Self) -> f64 {
        let dot = self.dot(other);
        if dot == 0.0 {
            return 0.0;
        }
        dot / (self.l2_norm() * other.l2_norm())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vec_of(pairs: &[(TermId, f64)]) -> SparseVector {
        SparseVector::from_map(&pairs.iter().copied().collect())
    }

    #[test]
    fn dot_over_intersection() {
        let a = vec_of(&[(0, 1.0), (1, 2.0), (2, 3.0)]);
        let b = vec_of(&[(1, 1.0), (2, 1.0), (3, 1.0)]);
        assert_eq!(a.dot(&b), 5.0);
    }

    #[test]
    fn cosine_self_is_one() {
        let a = vec_of(&[(3, 0.4), (17, 1.2), (40, 0.01)]);
        assert!((a.cosine(&a) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn cosine_bounds() {
        let a = vec_of(&[(0, 0.9), (5, 0.1)]);
        let b = vec_of(&[(0, 0.2), (9, 2.0)]);
        let sim = a.cosine(&b);
        assert!(sim >= 0.0);
        assert!(sim <= 1.0001);
    }

    #[test]
    fn disjoint_dimensions_are_exactly_zero() {
        let a = vec_of(&[(0, 1.0), (2, 1.0)]);
        let b = vec_of(&[(1, 1.0), (3, 1.0)]);
        assert_eq!(a.cosine(&b), 0.0);
    }

    #[test]
    fn empty_vector_is_zero_similarity() {
        let a = SparseVector::default();
        let b = vec_of(&[(1, 1.0)]);
        assert_eq!(a.cosine(&b), 0.0);
        assert_eq!(a.cosine(&a), 0.0);
    }

    #[test]
    fn norm_includes_non_intersecting_dimensions() {
        // cos = dot / (|a||b|) where the norms cover every dimension, not
        // just the shared ones.
        let a = vec_of(&[(0, 3.0), (1, 4.0)]);
        let b = vec_of(&[(0, 1.0)]);
        assert!((a.cosine(&b) - 3.0 / 5.0).abs() < 1e-12);
    }

    #[test]
    fn zero_weights_never_materialize() {
        let a = vec_of(&[(0, 0.0), (1, 1.0)]);
        assert_eq!(a.len(), 1);
        assert_eq!(a.get(0), 0.0);
        assert_eq!(a.get(1), 1.0);
    }
}
