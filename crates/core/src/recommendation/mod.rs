//! Session recommendation domain

pub mod conflicts;
pub mod itinerary;
pub mod scoring;
pub mod service;
pub mod source;

use eventkit_domain::InterestSet;

pub use conflicts::{conflicting_pairs, count_conflicts};
pub use itinerary::render_itinerary;
pub use scoring::{diversity_bonus, interest_match, ScoringEngine};
pub use service::RecommendationService;
pub use source::{EventSource, ManifestSource};

/// Parse a free-text interest list such as `"AI, agents; safety"`.
pub fn parse_interests(raw: &str) -> InterestSet {
    InterestSet::parse(raw)
}
