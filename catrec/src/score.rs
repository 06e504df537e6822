use std::collections::BTreeSet;

use crate::error::{RecError, Result};
use crate::hierarchy::CategoryHierarchy;

/// The three recommendation-quality measures for one evaluated document.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Measures {
    /// At least one suggestion is an exact match.
    pub boolean: bool,
    /// Exact matches over suggestion count.
    pub fractional: f64,
    /// Fractional measure plus hierarchy partial credit.
    pub hierarchical: f64,
}

/// Score the top-`n` suggestions against the ground-truth categories.
///
/// A suggestion that matches exactly counts toward the fractional measure
/// only. A non-matching suggestion earns 0.5 per actual category it has a
/// direct parent/child edge with, else 0.25 per actual category it shares a
/// parent with, each actual category scored independently with no
/// deduplication. After each non-matching suggestion the running bonus
/// accumulator is divided by `|actual|`; the final accumulator is divided by
/// `n` and added to the fractional measure. This accumulation order (the
/// re-division of earlier contributions included) is the historical
/// definition of the measure and must not be rearranged.
pub fn score_against_ground_truth(
    actual: &BTreeSet<String>,
    suggested: &[(String, f64)],
    n: usize,
    hierarchy: &CategoryHierarchy,
) -> Result<Measures> {
    if actual.is_empty() {
        return Err(RecError::EmptyGroundTruth);
    }
    if n == 0 {
        // Nothing was suggested (e.g. an empty centroid set); no credit, but
        // not a divide-by-zero.
        return Ok(Measures::default());
    }

    let mut fractional = 0.0;
    let mut bonus = 0.0;
    for (suggestion, _) in suggested.iter().take(n) {
        if actual.contains(suggestion) {
            fractional += 1.0;
        } else {
            for real in actual {
                if hierarchy.has_edge(real, suggestion) {
                    bonus += 0.5;
                } else if hierarchy.are_siblings(real, suggestion) {
                    bonus += 0.25;
                }
            }
            bonus /= actual.len() as f64;
        }
    }
    fractional /= n as f64;
    let hierarchical = fractional + bonus / n as f64;

    Ok(Measures {
        boolean: fractional > 0.0,
        fractional,
        hierarchical,
    })
}
