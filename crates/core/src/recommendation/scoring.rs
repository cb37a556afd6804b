//! Linear session scoring and greedy top-N selection
//!
//! `score = w.interest * interest_match + w.popularity * popularity + w.diversity * diversity_bonus`
//!
//! `interest_match` and `diversity_bonus` are ratios in `[0, 1]`, so the
//! weights alone set the scale. The diversity term depends on what has
//! already been picked, which is why selection is greedy and sequential.

use std::collections::BTreeSet;

use eventkit_domain::{
    InterestSet, Result, ScoreContributions, ScoredSession, ScoringWeights, Session,
};
use tracing::trace;

/// `|tags ∩ interests| / max(|interests|, 1)`
pub fn interest_match(tags: &BTreeSet<String>, interests: &InterestSet) -> f64 {
    let hits = matched_tags(tags, interests).len();
    hits as f64 / interests.len().max(1) as f64
}

/// `|tags \ selected| / max(|tags|, 1)`
pub fn diversity_bonus(tags: &BTreeSet<String>, selected: &BTreeSet<String>) -> f64 {
    let novel = tags.iter().filter(|t| !selected.contains(t.to_lowercase().as_str())).count();
    novel as f64 / tags.len().max(1) as f64
}

fn matched_tags(tags: &BTreeSet<String>, interests: &InterestSet) -> BTreeSet<String> {
    tags.iter().map(|t| t.to_lowercase()).filter(|t| interests.contains(t)).collect()
}

/// Weighted linear scorer over validated [`ScoringWeights`].
#[derive(Debug, Clone, Copy)]
pub struct ScoringEngine {
    weights: ScoringWeights,
}

impl ScoringEngine {
    /// Engine for `weights`.
    ///
    /// # Errors
    /// `EventKitError::Config` when the weights are negative, non-finite or
    /// all zero.
    pub fn new(weights: ScoringWeights) -> Result<Self> {
        weights.validate()?;
        Ok(Self { weights })
    }

    /// Weights the engine was built with.
    pub const fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Score one session given the tags already selected.
    pub fn score(
        &self,
        session: &Session,
        interests: &InterestSet,
        selected_tags: &BTreeSet<String>,
    ) -> ScoredSession {
        let matched = matched_tags(&session.tags, interests);
        let contributions = ScoreContributions {
            interest_match: self.weights.interest * interest_match(&session.tags, interests),
            popularity: self.weights.popularity * session.popularity,
            diversity: self.weights.diversity * diversity_bonus(&session.tags, selected_tags),
        };
        ScoredSession {
            session: session.clone(),
            score: contributions.total(),
            contributions,
            matched_tags: matched,
        }
    }

    /// Greedy selection of up to `top` sessions.
    ///
    /// Each round rescores the remaining candidates against the tag union of
    /// the picks so far and takes the maximum. Equal scores go to the
    /// candidate that came first in `candidates`.
    pub fn select(
        &self,
        candidates: &[Session],
        interests: &InterestSet,
        top: usize,
    ) -> Vec<ScoredSession> {
        let mut remaining: Vec<usize> = (0..candidates.len()).collect();
        let mut selected_tags = BTreeSet::new();
        let mut picks = Vec::with_capacity(top.min(candidates.len()));

        while picks.len() < top && !remaining.is_empty() {
            let mut best: Option<(usize, ScoredSession)> = None;
            for (slot, &idx) in remaining.iter().enumerate() {
                let scored = self.score(&candidates[idx], interests, &selected_tags);
                let better = best.as_ref().map_or(true, |(_, b)| scored.score > b.score);
                if better {
                    best = Some((slot, scored));
                }
            }
            let Some((slot, scored)) = best else { break };
            remaining.remove(slot);
            trace!(id = %scored.session.id, score = scored.score, "selected session");
            selected_tags.extend(scored.session.tags.iter().map(|t| t.to_lowercase()));
            picks.push(scored);
        }
        picks
    }
}
