//! Domain types and models

pub mod interest;
pub mod recommendation;
pub mod scoring;
pub mod session;
pub mod token;

pub use interest::InterestSet;
pub use recommendation::{
    DateRange, Explanation, RecommendationRequest, RecommendationResult, SourceKind,
};
pub use scoring::{ScoreContributions, ScoredSession, ScoringWeights};
pub use session::{session_id, Session, SessionTime};
pub use token::CachedToken;
