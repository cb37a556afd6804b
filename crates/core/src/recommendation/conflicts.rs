//! Pairwise schedule-conflict detection
//!
//! Annotates only. Conflicting sessions stay in the result.

use eventkit_domain::Session;

/// Index pairs `(i, j)`, `i < j`, whose `[start, end)` intervals overlap.
pub fn conflicting_pairs(sessions: &[Session]) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    for (i, a) in sessions.iter().enumerate() {
        for (j, b) in sessions.iter().enumerate().skip(i + 1) {
            if a.overlaps(b) {
                pairs.push((i, j));
            }
        }
    }
    pairs
}

/// Number of overlapping pairs in `sessions`.
pub fn count_conflicts(sessions: &[Session]) -> usize {
    conflicting_pairs(sessions).len()
}
