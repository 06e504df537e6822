use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};

use crate::error::{RecError, Result};
use crate::tokenizer;
use crate::vector::SparseVector;

pub type TermId = u32;
pub type DocId = u32;

/// One posting: the length-normalized term frequency of a term in a document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub doc: DocId,
    pub tf: f64,
}

/// Per-term entry: inverse document frequency plus the posting list,
/// sorted by document id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermEntry {
    pub idf: f64,
    pub postings: Vec<Posting>,
}

/// Immutable inverted-index snapshot: `term -> (idf, {doc -> tf})`.
///
/// The sorted `terms` list is the canonical term-to-dimension mapping; every
/// vector produced from this snapshot shares it, so vectors and centroids
/// built from the same snapshot are always dimension-compatible. Rebuilding
/// from new frequency tables produces a new snapshot with a new fingerprint;
/// snapshots are never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    terms: Vec<String>,
    entries: Vec<TermEntry>,
    term_ids: HashMap<String, TermId>,
    num_docs: u32,
    fingerprint: u64,
}

impl IndexSnapshot {
    /// Build the snapshot from per-document `term -> raw count` frequency
    /// tables (already tokenized, stemmed, stopword-filtered).
    ///
    /// `tf = count / total tokens of the document`, `idf = ln(N / df)` where
    /// `N` counts every table, including empty ones.
    pub fn build(tables: &BTreeMap<DocId, HashMap<String, u32>>) -> Result<Self> {
        if tables.is_empty() {
            return Err(RecError::EmptyCorpus);
        }
        let num_docs = tables.len() as u32;

        let mut postings: BTreeMap<&str, Vec<Posting>> = BTreeMap::new();
        for (&doc, table) in tables {
            let total: u64 = table.values().map(|&c| c as u64).sum();
            if total == 0 {
                // An empty document still counts toward N but has no terms.
                continue;
            }
            for (term, &count) in table {
                postings
                    .entry(term.as_str())
                    .or_default()
                    .push(Posting { doc, tf: count as f64 / total as f64 });
            }
        }

        let n = num_docs as f64;
        let mut terms = Vec::with_capacity(postings.len());
        let mut entries = Vec::with_capacity(postings.len());
        for (term, mut plist) in postings {
            plist.sort_by_key(|p| p.doc);
            let idf = (n / plist.len() as f64).ln();
            terms.push(term.to_string());
            entries.push(TermEntry { idf, postings: plist });
        }

        let term_ids = terms
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i as TermId))
            .collect();
        let fingerprint = fingerprint(&terms, num_docs);

        tracing::info!(num_docs, num_terms = terms.len(), "built index snapshot");

        Ok(Self { terms, entries, term_ids, num_docs, fingerprint })
    }

    pub fn num_docs(&self) -> u32 {
        self.num_docs
    }

    pub fn num_terms(&self) -> usize {
        self.terms.len()
    }

    /// Identity of the dimension mapping; centroid sets record it so that a
    /// snapshot can refuse to score vectors from a foreign dimension space.
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    pub fn term_id(&self, term: &str) -> Option<TermId> {
        self.term_ids.get(term).copied()
    }

    pub fn term(&self, id: TermId) -> Option<&str> {
        self.terms.get(id as usize).map(String::as_str)
    }

    pub fn idf(&self, term: &str) -> Option<f64> {
        self.term_id(term).map(|id| self.entries[id as usize].idf)
    }

    /// Iterate `(dimension, entry)` in dimension order.
    pub fn entries(&self) -> impl Iterator<Item = (TermId, &TermEntry)> {
        self.entries.iter().enumerate().map(|(i, e)| (i as TermId, e))
    }

    /// Every document id that contributed at least one posting, ascending.
    pub fn doc_ids(&self) -> Vec<DocId> {
        let mut ids: std::collections::BTreeSet<DocId> = std::collections::BTreeSet::new();
        for entry in &self.entries {
            ids.extend(entry.postings.iter().map(|p| p.doc));
        }
        ids.into_iter().collect()
    }

    /// Whether the document contributed at least one posting.
    pub fn contains_doc(&self, doc: DocId) -> bool {
        self.entries
            .iter()
            .any(|e| e.postings.binary_search_by_key(&doc, |p| p.doc).is_ok())
    }

    /// Vector representation of an in-corpus document: `idf * tf` at every
    /// dimension whose posting list contains the document. A document absent
    /// from every posting list yields the empty vector; that is a normal
    /// outcome (zero similarity to everything), not an error.
    pub fn vectorize_doc(&self, doc: DocId) -> SparseVector {
        let mut map = BTreeMap::new();
        for (dim, entry) in self.entries() {
            if let Ok(i) = entry.postings.binary_search_by_key(&doc, |p| p.doc) {
                map.insert(dim, entry.idf * entry.postings[i].tf);
            }
        }
        SparseVector::from_map(&map)
    }

    /// Vector representation of out-of-corpus text: run the corpus
    /// normalization pipeline, keep only terms already in the index, weight
    /// by `idf * raw count`.
    ///
    /// The raw-count weighting (instead of the length-normalized tf used for
    /// corpus documents) is intentional and load-bearing for comparability
    /// with historical results; do not normalize here. Terms unseen during
    /// index construction contribute nothing.
    pub fn vectorize_text(&self, text: &str) -> SparseVector {
        let dist = tokenizer::frequency_distribution(text);
        let mut map = BTreeMap::new();
        for (term, count) in dist {
            if let Some(dim) = self.term_id(&term) {
                map.insert(dim, self.entries[dim as usize].idf * count as f64);
            }
        }
        SparseVector::from_map(&map)
    }
}

fn fingerprint(terms: &[String], num_docs: u32) -> u64 {
    let mut h = DefaultHasher::new();
    num_docs.hash(&mut h);
    for t in terms {
        t.hash(&mut h);
    }
    h.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::frequency_distribution;

    pub(crate) fn tables_from(docs: &[(DocId, &str)]) -> BTreeMap<DocId, HashMap<String, u32>> {
        docs.iter()
            .map(|&(id, text)| (id, frequency_distribution(text)))
            .collect()
    }

    #[test]
    fn empty_corpus_is_an_error() {
        let tables = BTreeMap::new();
        assert!(matches!(
            IndexSnapshot::build(&tables),
            Err(RecError::EmptyCorpus)
        ));
    }

    #[test]
    fn build_is_idempotent() {
        let tables = tables_from(&[(1, "cat fish cat"), (2, "dog fish")]);
        let a = IndexSnapshot::build(&tables).unwrap();
        let b = IndexSnapshot::build(&tables).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn idf_is_non_negative_and_zero_only_for_ubiquitous_terms() {
        let tables = tables_from(&[(1, "cat fish cat"), (2, "dog fish")]);
        let idx = IndexSnapshot::build(&tables).unwrap();
        for (_, entry) in idx.entries() {
            assert!(entry.idf >= 0.0);
        }
        // fish appears in both docs, so ln(2/2) = 0
        assert_eq!(idx.idf("fish"), Some(0.0));
        assert!(idx.idf("cat").unwrap() > 0.0);
    }

    #[test]
    fn two_document_corpus_statistics() {
        // doc1 = "cat fish cat", doc2 = "dog fish"
        let tables = tables_from(&[(1, "cat fish cat"), (2, "dog fish")]);
        let idx = IndexSnapshot::build(&tables).unwrap();

        let ln2 = 2.0_f64.ln();
        assert!((idx.idf("cat").unwrap() - ln2).abs() < 1e-12);
        assert!((idx.idf("dog").unwrap() - ln2).abs() < 1e-12);
        assert_eq!(idx.idf("fish"), Some(0.0));

        // fish carries zero weight on both sides, cat/dog do not overlap,
        // so the documents are orthogonal.
        let v1 = idx.vectorize_doc(1);
        let v2 = idx.vectorize_doc(2);
        assert_eq!(v1.cosine(&v2), 0.0);

        // cat: tf = 2/3, weighted by ln 2
        let cat_dim = idx.term_id("cat").unwrap();
        assert!((v1.get(cat_dim) - ln2 * 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn unknown_doc_vectorizes_to_empty() {
        let tables = tables_from(&[(1, "cat fish cat")]);
        let idx = IndexSnapshot::build(&tables).unwrap();
        assert!(idx.vectorize_doc(99).is_empty());
        assert!(!idx.contains_doc(99));
        assert!(idx.contains_doc(1));
    }

    #[test]
    fn text_vectorization_uses_raw_counts_and_index_vocabulary() {
        let tables = tables_from(&[(1, "cat fish cat"), (2, "dog fish")]);
        let idx = IndexSnapshot::build(&tables).unwrap();

        let v = idx.vectorize_text("cat cat cat parrot");
        let cat_dim = idx.term_id("cat").unwrap();
        // raw count 3, not 3/4: the out-of-corpus path is unnormalized
        assert!((v.get(cat_dim) - 2.0_f64.ln() * 3.0).abs() < 1e-12);
        // parrot never entered the index, so it has no dimension
        assert_eq!(v.len(), 1);
    }

    #[test]
    fn empty_document_counts_toward_n() {
        let mut tables = tables_from(&[(1, "cat fish cat"), (2, "dog fish")]);
        tables.insert(3, HashMap::new());
        let idx = IndexSnapshot::build(&tables).unwrap();
        assert_eq!(idx.num_docs(), 3);
        // fish now appears in 2 of 3 docs
        assert!((idx.idf("fish").unwrap() - (3.0_f64 / 2.0).ln()).abs() < 1e-12);
    }
}
