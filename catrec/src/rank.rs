use std::cmp::Ordering;

use crate::centroid::CentroidSet;
use crate::error::Result;
use crate::index::IndexSnapshot;
use crate::vector::SparseVector;
use crate::DocId;

/// What to recommend categories for: a corpus page or ad hoc text.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    Doc(DocId),
    Text(&'a str),
}

/// Score every centroid against the target vector, descending by cosine
/// similarity. Ties break on category name ascending so rankings are
/// reproducible across runs and implementations.
pub fn rank(target: &SparseVector, centroids: &CentroidSet) -> Vec<(String, f64)> {
    let mut ranking: Vec<(String, f64)> = centroids
        .iter()
        .map(|(cat, centroid)| (cat.to_string(), target.cosine(&centroid.vector)))
        .collect();
    ranking.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    ranking
}

/// Default suggestion count: `min(candidate categories, actual categories)`.
pub fn default_top_n(candidates: usize, actual: usize) -> usize {
    candidates.min(actual)
}

pub fn top_n(mut ranking: Vec<(String, f64)>, n: usize) -> Vec<(String, f64)> {
    ranking.truncate(n);
    ranking
}

/// Rank all centroids against a target document or text.
///
/// Fails with `SnapshotMismatch` when the centroid set was derived from a
/// different index snapshot; the dimension spaces would not line up and every
/// score would be silently wrong. `top` of `None` returns the full ranking.
pub fn recommend(
    snapshot: &IndexSnapshot,
    centroids: &CentroidSet,
    target: Target<'_>,
    top: Option<usize>,
) -> Result<Vec<(String, f64)>> {
    centroids.check_snapshot(snapshot)?;
    let vector = match target {
        Target::Doc(doc) => snapshot.vectorize_doc(doc),
        Target::Text(text) => snapshot.vectorize_text(text),
    };
    let ranking = rank(&vector, centroids);
    Ok(match top {
        Some(n) => top_n(ranking, n),
        None => ranking,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::centroid::build_centroids;
    use crate::store::MemoryStore;
    use crate::tokenizer::frequency_distribution;
    use std::collections::{BTreeMap, BTreeSet};

    fn fixture() -> (IndexSnapshot, CentroidSet, MemoryStore) {
        let mut store = MemoryStore::new();
        let docs = [
            ("p0", "whale ocean water", vec!["Marine"]),
            ("p1", "shark ocean predator", vec!["Marine"]),
            ("p2", "desert sand dune", vec!["Arid"]),
            ("p3", "cactus desert sand", vec!["Arid"]),
        ];
        let mut tables = BTreeMap::new();
        for (title, text, cats) in docs {
            let id = store.add_page(title, cats);
            tables.insert(id, frequency_distribution(text));
        }
        let idx = IndexSnapshot::build(&tables).unwrap();
        let set = build_centroids(&idx, &store, 1, &BTreeSet::new());
        (idx, set, store)
    }

    #[test]
    fn ranks_matching_category_first() {
        let (idx, set, _) = fixture();
        let ranking = recommend(&idx, &set, Target::Text("ocean whale shark"), None).unwrap();
        assert_eq!(ranking[0].0, "Marine");
        assert!(ranking[0].1 > ranking[1].1);
    }

    #[test]
    fn in_corpus_doc_ranks_its_own_category_first() {
        let (idx, set, store) = fixture();
        let doc = store.doc_id("p2").unwrap();
        let ranking = recommend(&idx, &set, Target::Doc(doc), None).unwrap();
        assert_eq!(ranking[0].0, "Arid");
    }

    #[test]
    fn ties_break_on_category_name() {
        let (idx, set, _) = fixture();
        // No overlap with either category: every score is exactly zero.
        let ranking = recommend(&idx, &set, Target::Text("violin sonata"), None).unwrap();
        let names: Vec<&str> = ranking.iter().map(|(c, _)| c.as_str()).collect();
        assert_eq!(names, vec!["Arid", "Marine"]);
        assert!(ranking.iter().all(|&(_, s)| s == 0.0));
    }

    #[test]
    fn top_n_truncates() {
        let (idx, set, _) = fixture();
        let ranking = recommend(&idx, &set, Target::Text("ocean"), Some(1)).unwrap();
        assert_eq!(ranking.len(), 1);
        assert_eq!(default_top_n(5, 2), 2);
        assert_eq!(default_top_n(1, 2), 1);
    }

    #[test]
    fn foreign_snapshot_is_rejected() {
        let (_, set, _) = fixture();
        let other_tables = BTreeMap::from([(0, frequency_distribution("lone document"))]);
        let other = IndexSnapshot::build(&other_tables).unwrap();
        assert!(recommend(&other, &set, Target::Text("lone"), None).is_err());
    }
}
