use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::{RecError, Result};
use crate::index::IndexSnapshot;
use crate::store::CategoryStore;
use crate::vector::SparseVector;
use crate::{DocId, TermId};

/// A category's centroid: the size-normalized sum of its member documents'
/// TF-IDF vectors, plus the member count the normalization used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Centroid {
    pub vector: SparseVector,
    pub members: u32,
}

/// Centroid vectors for every qualifying category, tied to the index
/// snapshot they were derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentroidSet {
    centroids: BTreeMap<String, Centroid>,
    index_fingerprint: u64,
    min_pages: u32,
}

impl CentroidSet {
    pub fn len(&self) -> usize {
        self.centroids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centroids.is_empty()
    }

    pub fn min_pages(&self) -> u32 {
        self.min_pages
    }

    /// Fingerprint of the index snapshot this set was derived from.
    pub fn index_fingerprint(&self) -> u64 {
        self.index_fingerprint
    }

    pub fn get(&self, category: &str) -> Result<&Centroid> {
        self.centroids
            .get(category)
            .ok_or_else(|| RecError::UnknownCategory(category.to_string()))
    }

    /// Iterate `(category, centroid)` in category-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Centroid)> {
        self.centroids.iter().map(|(c, v)| (c.as_str(), v))
    }

    /// Drop every category whose recorded member count is below `threshold`,
    /// using externally supplied corpus-wide counts. Categories absent from
    /// `counts` are dropped too. Used by the threshold sweep to shrink a set
    /// built at a lower threshold without rebuilding.
    pub fn retain_at_least(&mut self, threshold: u32, counts: &BTreeMap<String, u32>) {
        self.centroids
            .retain(|cat, _| counts.get(cat).copied().unwrap_or(0) >= threshold);
        self.min_pages = self.min_pages.max(threshold);
    }

    /// Guard against scoring vectors from a foreign dimension space.
    pub fn check_snapshot(&self, snapshot: &IndexSnapshot) -> Result<()> {
        if self.index_fingerprint != snapshot.fingerprint() {
            return Err(RecError::SnapshotMismatch {
                index: snapshot.fingerprint(),
                centroids: self.index_fingerprint,
            });
        }
        Ok(())
    }
}

/// Build per-category centroids from the snapshot and the store's
/// page→category assignments.
///
/// Only categories with at least `min_pages` member pages qualify. Documents
/// in `excluded` (the held-out set) contribute nothing, and the per-category
/// normalization denominator is the member count of the mapping that remains
/// after the exclusion, so held-out evaluation never leaks the excluded
/// documents into the centroids. Deterministic for a fixed
/// `(snapshot, min_pages, excluded)` triple.
pub fn build_centroids<S: CategoryStore>(
    snapshot: &IndexSnapshot,
    store: &S,
    min_pages: u32,
    excluded: &BTreeSet<DocId>,
) -> CentroidSet {
    let mut page_cats = store.page_category_map(min_pages);
    for doc in excluded {
        page_cats.remove(doc);
    }

    // Normalization denominators come from the filtered mapping, not the
    // store's full category sizes.
    let mut member_counts: HashMap<&str, u32> = HashMap::new();
    for cats in page_cats.values() {
        for cat in cats {
            *member_counts.entry(cat.as_str()).or_insert(0) += 1;
        }
    }

    let mut acc: HashMap<&str, BTreeMap<TermId, f64>> = HashMap::new();
    for (dim, entry) in snapshot.entries() {
        for posting in &entry.postings {
            let Some(cats) = page_cats.get(&posting.doc) else {
                continue;
            };
            let weight = posting.tf * entry.idf;
            for cat in cats {
                let Some(&members) = member_counts.get(cat.as_str()) else {
                    continue;
                };
                *acc.entry(cat.as_str())
                    .or_default()
                    .entry(dim)
                    .or_insert(0.0) += weight / members as f64;
            }
        }
    }

    // Every qualifying category gets a centroid, even one whose members
    // carry no postings (its vector is empty and scores zero everywhere).
    let centroids: BTreeMap<String, Centroid> = member_counts
        .iter()
        .map(|(&cat, &members)| {
            let dims = acc.remove(cat).unwrap_or_default();
            (
                cat.to_string(),
                Centroid { vector: SparseVector::from_map(&dims), members },
            )
        })
        .collect();

    tracing::info!(
        categories = centroids.len(),
        min_pages,
        excluded = excluded.len(),
        "built centroid set"
    );

    CentroidSet {
        centroids,
        index_fingerprint: snapshot.fingerprint(),
        min_pages,
    }
}
