use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::hierarchy::CategoryHierarchy;
use crate::DocId;

/// Read-only category/page queries the engine consumes from storage.
///
/// Centroid construction and evaluation go through this seam so the engine
/// never assumes where the page-to-category assignments live.
pub trait CategoryStore {
    /// Pages mapped to their categories, restricted to categories with at
    /// least `min_pages` member pages.
    fn page_category_map(&self, min_pages: u32) -> BTreeMap<DocId, BTreeSet<String>>;

    /// Member-page counts for categories with at least `min_pages` members.
    fn category_member_counts(&self, min_pages: u32) -> BTreeMap<String, u32>;

    /// Ground-truth categories of one page (empty set if unknown).
    fn categories_for_page(&self, doc: DocId) -> BTreeSet<String>;

    /// Every page id, ascending.
    fn all_page_ids(&self) -> Vec<DocId>;
}

/// In-memory, serializable corpus store: the title↔id mapping, the
/// page→category assignments, and the raw hierarchy edge list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryStore {
    doc_ids: BTreeMap<String, DocId>,
    titles: BTreeMap<DocId, String>,
    page_categories: BTreeMap<DocId, BTreeSet<String>>,
    edges: Vec<(String, String)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a page and its category assignments, allocating the next
    /// document id. Re-registering a title replaces its categories.
    pub fn add_page<I, S>(&mut self, title: &str, categories: I) -> DocId
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id = match self.doc_ids.get(title) {
            Some(&id) => id,
            None => {
                let id = self.doc_ids.len() as DocId;
                self.doc_ids.insert(title.to_string(), id);
                self.titles.insert(id, title.to_string());
                id
            }
        };
        self.page_categories
            .insert(id, categories.into_iter().map(Into::into).collect());
        id
    }

    pub fn add_edge(&mut self, parent: impl Into<String>, child: impl Into<String>) {
        self.edges.push((parent.into(), child.into()));
    }

    pub fn doc_id(&self, title: &str) -> Option<DocId> {
        self.doc_ids.get(title).copied()
    }

    pub fn title(&self, doc: DocId) -> Option<&str> {
        self.titles.get(&doc).map(String::as_str)
    }

    pub fn num_pages(&self) -> usize {
        self.page_categories.len()
    }

    /// Adjacency structure over the stored edge list.
    pub fn hierarchy(&self) -> CategoryHierarchy {
        CategoryHierarchy::from_edges(self.edges.iter().cloned())
    }

    fn raw_counts(&self) -> HashMap<&str, u32> {
        let mut counts: HashMap<&str, u32> = HashMap::new();
        for cats in self.page_categories.values() {
            for cat in cats {
                *counts.entry(cat.as_str()).or_insert(0) += 1;
            }
        }
        counts
    }
}

impl CategoryStore for MemoryStore {
    fn page_category_map(&self, min_pages: u32) -> BTreeMap<DocId, BTreeSet<String>> {
        let counts = self.raw_counts();
        let mut map = BTreeMap::new();
        for (&doc, cats) in &self.page_categories {
            let kept: BTreeSet<String> = cats
                .iter()
                .filter(|c| counts.get(c.as_str()).copied().unwrap_or(0) >= min_pages)
                .cloned()
                .collect();
            if !kept.is_empty() {
                map.insert(doc, kept);
            }
        }
        map
    }

    fn category_member_counts(&self, min_pages: u32) -> BTreeMap<String, u32> {
        self.raw_counts()
            .into_iter()
            .filter(|&(_, n)| n >= min_pages)
            .map(|(c, n)| (c.to_string(), n))
            .collect()
    }

    fn categories_for_page(&self, doc: DocId) -> BTreeSet<String> {
        self.page_categories.get(&doc).cloned().unwrap_or_default()
    }

    fn all_page_ids(&self) -> Vec<DocId> {
        self.page_categories.keys().copied().collect()
    }
}
