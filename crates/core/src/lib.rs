//! # EventKit Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port/adapter interfaces (traits) for tokens and remote calendars
//! - Scoring, greedy selection and conflict detection
//! - The recommendation orchestrator
//!
//! ## Architecture Principles
//! - Only depends on `eventkit-common` and `eventkit-domain`
//! - No filesystem, HTTP, or platform code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod auth;
pub mod recommendation;

// Infrastructure ports
pub mod calendar_ports;

pub use auth::ports::{AccessTokenProvider, CredentialStore};
pub use calendar_ports::CalendarEventProvider;
pub use recommendation::{
    parse_interests, render_itinerary, EventSource, ManifestSource, RecommendationService,
    ScoringEngine,
};
