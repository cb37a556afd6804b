use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::session::Session;
use crate::constants::{
    DEFAULT_DIVERSITY_WEIGHT, DEFAULT_INTEREST_WEIGHT, DEFAULT_POPULARITY_WEIGHT,
};
use crate::errors::{EventKitError, Result};

/// Linear scoring weights, read from the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub interest: f64,
    pub popularity: f64,
    pub diversity: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            interest: DEFAULT_INTEREST_WEIGHT,
            popularity: DEFAULT_POPULARITY_WEIGHT,
            diversity: DEFAULT_DIVERSITY_WEIGHT,
        }
    }
}

impl ScoringWeights {
    /// All weights finite and non-negative, at least one nonzero.
    pub fn validate(&self) -> Result<()> {
        let named = [
            ("interest", self.interest),
            ("popularity", self.popularity),
            ("diversity", self.diversity),
        ];
        for (name, value) in named {
            if !value.is_finite() || value < 0.0 {
                return Err(EventKitError::Config(format!(
                    "weight '{name}' must be a finite non-negative number, got {value}"
                )));
            }
        }
        if named.iter().all(|(_, v)| *v == 0.0) {
            return Err(EventKitError::Config("at least one scoring weight must be nonzero".into()));
        }
        Ok(())
    }
}

/// Weighted score terms. They sum to the session's score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreContributions {
    pub interest_match: f64,
    pub popularity: f64,
    pub diversity: f64,
}

impl ScoreContributions {
    pub fn total(&self) -> f64 {
        self.interest_match + self.popularity + self.diversity
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredSession {
    pub session: Session,
    pub score: f64,
    pub contributions: ScoreContributions,
    /// Session tags that matched a requested interest.
    #[serde(default)]
    pub matched_tags: BTreeSet<String>,
}
