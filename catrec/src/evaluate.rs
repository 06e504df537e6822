use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Instant;

use crate::centroid::{build_centroids, CentroidSet};
use crate::error::Result;
use crate::hierarchy::CategoryHierarchy;
use crate::index::IndexSnapshot;
use crate::rank::{default_top_n, rank, top_n};
use crate::sample::{sample, SplitMix64};
use crate::score::score_against_ground_truth;
use crate::store::CategoryStore;
use crate::DocId;

/// Mean and population standard deviation of one measure across a sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub mean: f64,
    pub std: f64,
}

fn stats(values: &[f64]) -> Stats {
    if values.is_empty() {
        return Stats::default();
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    Stats { mean, std: var.sqrt() }
}

/// Aggregate outcome of one evaluation batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EvalSummary {
    pub evaluated: usize,
    pub skipped: usize,
    pub boolean: Stats,
    pub fractional: Stats,
    pub hierarchical: Stats,
}

/// Evaluate recommendation quality over a sample of corpus documents.
///
/// Each sampled document is vectorized, ranked against the centroids, and
/// scored against its ground-truth categories with
/// `n = min(centroid count, actual count)`. A document that cannot be scored
/// (no ground truth) is logged and skipped rather than aborting the batch;
/// multi-hour sweeps must survive individual bad samples.
pub fn evaluate<S: CategoryStore>(
    docs: &[DocId],
    snapshot: &IndexSnapshot,
    centroids: &CentroidSet,
    store: &S,
    hierarchy: &CategoryHierarchy,
) -> Result<EvalSummary> {
    centroids.check_snapshot(snapshot)?;

    let mut booleans = Vec::with_capacity(docs.len());
    let mut fractionals = Vec::with_capacity(docs.len());
    let mut hierarchicals = Vec::with_capacity(docs.len());
    let mut skipped = 0usize;

    for &doc in docs {
        let actual = store.categories_for_page(doc);
        let vector = snapshot.vectorize_doc(doc);
        let ranking = rank(&vector, centroids);
        let n = default_top_n(ranking.len(), actual.len());
        let suggestions = top_n(ranking, n);
        match score_against_ground_truth(&actual, &suggestions, n, hierarchy) {
            Ok(m) => {
                tracing::debug!(doc, n, fractional = m.fractional, "scored sample");
                booleans.push(if m.boolean { 1.0 } else { 0.0 });
                fractionals.push(m.fractional);
                hierarchicals.push(m.hierarchical);
            }
            Err(err) => {
                tracing::warn!(doc, %err, "skipping unscorable sample");
                skipped += 1;
            }
        }
    }

    Ok(EvalSummary {
        evaluated: booleans.len(),
        skipped,
        boolean: stats(&booleans),
        fractional: stats(&fractionals),
        hierarchical: stats(&hierarchicals),
    })
}

/// Parameters of the min-pages sensitivity sweep.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SweepConfig {
    pub min_pages: u32,
    pub max_pages: u32,
    /// Documents scored per threshold step.
    pub sample_size: usize,
    /// Fraction of the corpus held out of centroid construction.
    pub held_out_fraction: f64,
    pub seed: u64,
}

/// One row of the sensitivity curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub min_pages: u32,
    pub centroid_count: usize,
    pub elapsed_secs: f64,
    pub summary: EvalSummary,
}

/// Sweep the min-pages threshold and measure recommendation quality at each
/// step on a fixed held-out split.
///
/// Centroids are built once at the lowest threshold with the held-out
/// documents excluded; each step then drops the categories whose corpus-wide
/// member count falls below the rising threshold and evaluates a fresh
/// seeded sample of the held-out set. Fully deterministic for a fixed
/// config, so the resulting curve is comparable across runs.
pub fn sweep<S: CategoryStore>(
    snapshot: &IndexSnapshot,
    store: &S,
    hierarchy: &CategoryHierarchy,
    cfg: &SweepConfig,
) -> Result<Vec<SweepPoint>> {
    if cfg.max_pages < cfg.min_pages {
        return Ok(Vec::new());
    }
    let all = store.all_page_ids();
    let mut rng = SplitMix64::new(cfg.seed);
    let held_count = (all.len() as f64 * cfg.held_out_fraction) as usize;
    let held = sample(&all, held_count, &mut rng);
    let excluded: BTreeSet<DocId> = held.iter().copied().collect();

    let mut centroids = build_centroids(snapshot, store, cfg.min_pages, &excluded);
    let mut points = Vec::with_capacity((cfg.max_pages - cfg.min_pages + 1) as usize);

    for threshold in cfg.min_pages..=cfg.max_pages {
        let counts = store.category_member_counts(threshold);
        centroids.retain_at_least(threshold, &counts);

        let batch = sample(&held, cfg.sample_size, &mut rng);
        let start = Instant::now();
        let summary = evaluate(&batch, snapshot, &centroids, store, hierarchy)?;
        let elapsed_secs = start.elapsed().as_secs_f64();

        tracing::info!(
            threshold,
            centroids = centroids.len(),
            evaluated = summary.evaluated,
            skipped = summary.skipped,
            "sweep step complete"
        );
        points.push(SweepPoint {
            min_pages: threshold,
            centroid_count: centroids.len(),
            elapsed_secs,
            summary,
        });
    }
    Ok(points)
}

/// Symmetric all-pairs cosine-similarity matrix over the corpus documents,
/// row-major with a unit diagonal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityMatrix {
    pub docs: Vec<DocId>,
    data: Vec<f64>,
}

impl SimilarityMatrix {
    pub fn at(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.docs.len() + j]
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

/// Compute pairwise similarities between every pair of corpus documents.
///
/// Quadratic in the corpus size; runs for hours on a full dump. Progress is
/// reported per row so operators can see it moving.
pub fn pairwise_similarities(snapshot: &IndexSnapshot) -> SimilarityMatrix {
    let docs = snapshot.doc_ids();
    let n = docs.len();
    let vectors: Vec<_> = docs.iter().map(|&d| snapshot.vectorize_doc(d)).collect();

    let mut data = vec![0.0; n * n];
    for i in 0..n {
        data[i * n + i] = 1.0;
        for j in (i + 1)..n {
            let sim = vectors[i].cosine(&vectors[j]);
            data[i * n + j] = sim;
            data[j * n + i] = sim;
        }
        tracing::debug!(row = i + 1, total = n, "similarity matrix progress");
    }
    SimilarityMatrix { docs, data }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::tokenizer::frequency_distribution;
    use std::collections::BTreeMap;

    fn fixture() -> (IndexSnapshot, MemoryStore, CategoryHierarchy) {
        let mut store = MemoryStore::new();
        let docs = [
            ("p0", "whale ocean water current", vec!["Marine"]),
            ("p1", "shark ocean predator water", vec!["Marine"]),
            ("p2", "kelp ocean water forest", vec!["Marine"]),
            ("p3", "desert sand dune heat", vec!["Arid"]),
            ("p4", "cactus desert sand spine", vec!["Arid"]),
            ("p5", "oasis desert sand water", vec!["Arid"]),
        ];
        let mut tables = BTreeMap::new();
        for (title, text, cats) in docs {
            let id = store.add_page(title, cats);
            tables.insert(id, frequency_distribution(text));
        }
        store.add_edge("Nature", "Marine");
        store.add_edge("Nature", "Arid");
        let hierarchy = store.hierarchy();
        (IndexSnapshot::build(&tables).unwrap(), store, hierarchy)
    }

    #[test]
    fn evaluation_scores_in_corpus_documents() {
        let (idx, store, h) = fixture();
        let centroids = build_centroids(&idx, &store, 1, &BTreeSet::new());
        let summary = evaluate(&[0, 3], &idx, &centroids, &store, &h).unwrap();
        assert_eq!(summary.evaluated, 2);
        assert_eq!(summary.skipped, 0);
        // Each document sits inside its own category's centroid.
        assert_eq!(summary.boolean.mean, 1.0);
        assert_eq!(summary.fractional.mean, 1.0);
        assert_eq!(summary.boolean.std, 0.0);
    }

    #[test]
    fn unknown_documents_are_skipped_not_fatal() {
        let (idx, store, h) = fixture();
        let centroids = build_centroids(&idx, &store, 1, &BTreeSet::new());
        // 99 has no ground-truth categories: EmptyGroundTruth, skipped.
        let summary = evaluate(&[0, 99], &idx, &centroids, &store, &h).unwrap();
        assert_eq!(summary.evaluated, 1);
        assert_eq!(summary.skipped, 1);
    }

    #[test]
    fn stats_mean_and_population_std() {
        let s = stats(&[1.0, 1.0, 0.0, 0.0]);
        assert!((s.mean - 0.5).abs() < 1e-12);
        assert!((s.std - 0.5).abs() < 1e-12);
        assert_eq!(stats(&[]), Stats::default());
    }

    #[test]
    fn sweep_is_deterministic_and_counts_shrink() {
        let (idx, store, h) = fixture();
        let cfg = SweepConfig {
            min_pages: 1,
            max_pages: 4,
            sample_size: 2,
            held_out_fraction: 0.3,
            seed: 11,
        };
        let a = sweep(&idx, &store, &h, &cfg).unwrap();
        let b = sweep(&idx, &store, &h, &cfg).unwrap();
        assert_eq!(a.len(), 4);
        for (pa, pb) in a.iter().zip(&b) {
            assert_eq!(pa.min_pages, pb.min_pages);
            assert_eq!(pa.centroid_count, pb.centroid_count);
            assert_eq!(pa.summary, pb.summary);
        }
        // Raising the threshold never adds centroids.
        for w in a.windows(2) {
            assert!(w[1].centroid_count <= w[0].centroid_count);
        }
        // Both categories have 3 corpus members: gone once threshold hits 4.
        assert_eq!(a.last().unwrap().centroid_count, 0);
    }

    #[test]
    fn similarity_matrix_is_symmetric_with_unit_diagonal() {
        let (idx, _, _) = fixture();
        let m = pairwise_similarities(&idx);
        assert_eq!(m.len(), 6);
        for i in 0..m.len() {
            assert_eq!(m.at(i, i), 1.0);
            for j in 0..m.len() {
                assert_eq!(m.at(i, j), m.at(j, i));
            }
        }
        // p0 and p1 share ocean/water vocabulary; p0 and p3 share nothing.
        assert!(m.at(0, 1) > m.at(0, 3));
    }
}
