use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Category hierarchy as a precomputed adjacency structure.
///
/// Built once from the `(parent, child)` edge list; direct-edge queries are
/// O(1) and sibling queries are O(degree). Edges are asymmetric; self-loops
/// in the input are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryHierarchy {
    children: HashMap<String, HashSet<String>>,
    parents: HashMap<String, HashSet<String>>,
}

impl CategoryHierarchy {
    pub fn from_edges<I, S>(edges: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        let mut h = Self::default();
        for (parent, child) in edges {
            h.add_edge(parent.into(), child.into());
        }
        h
    }

    pub fn add_edge(&mut self, parent: String, child: String) {
        if parent == child {
            return;
        }
        self.children
            .entry(parent.clone())
            .or_default()
            .insert(child.clone());
        self.parents.entry(child).or_default().insert(parent);
    }

    /// Direct parent/child edge between the two categories, in either
    /// direction (the father/son relation).
    pub fn has_edge(&self, a: &str, b: &str) -> bool {
        self.children.get(a).is_some_and(|c| c.contains(b))
            || self.children.get(b).is_some_and(|c| c.contains(a))
    }

    /// Whether the two categories share at least one common parent.
    pub fn are_siblings(&self, a: &str, b: &str) -> bool {
        let (Some(pa), Some(pb)) = (self.parents.get(a), self.parents.get(b)) else {
            return false;
        };
        // Probe the smaller parent set against the larger one.
        let (small, large) = if pa.len() <= pb.len() { (pa, pb) } else { (pb, pa) };
        small.iter().any(|p| large.contains(p))
    }

    pub fn edge_count(&self) -> usize {
        self.children.values().map(HashSet::len).sum()
    }
}
