//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! recommendation core.

// Recommendation limits
pub const MIN_TOP_N: usize = 1;
pub const MAX_TOP_N: usize = 100;
pub const DEFAULT_TOP_N: usize = 5;

/// Popularity assigned to a remote event that carries no attendee data.
///
/// Fixed value, not derived from history. Changing it shifts every remote
/// ranking, so it stays a named constant.
pub const DEFAULT_POPULARITY: f64 = 0.5;

/// Attendee count at which popularity saturates at 1.0.
pub const POPULARITY_ATTENDEE_SATURATION: f64 = 100.0;

// Default scoring weights
pub const DEFAULT_INTEREST_WEIGHT: f64 = 2.0;
pub const DEFAULT_POPULARITY_WEIGHT: f64 = 0.5;
pub const DEFAULT_DIVERSITY_WEIGHT: f64 = 0.3;

// Token lifecycle
pub const TOKEN_REFRESH_SKEW_SECS: i64 = 300;
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;
/// Upper bound on an identity-service `expires_in`; longer lifetimes are clamped.
pub const MAX_TOKEN_LIFETIME_SECS: i64 = 86_400;
pub const DEFAULT_TOKEN_CACHE_FILE: &str = ".eventkit_token_cache.json";

// Remote calendar
pub const RESPONSE_CACHE_TTL_SECS: u64 = 300;
pub const HTTP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_DATE_RANGE_DAYS: i64 = 7;
pub const CALENDAR_PAGE_SIZE: u32 = 50;
pub const CALENDAR_MAX_PAGES: usize = 10;
pub const RATE_LIMIT_MAX_RETRIES: u32 = 3;
pub const RATE_LIMIT_INITIAL_BACKOFF_MS: u64 = 1_000;
pub const RATE_LIMIT_MAX_BACKOFF_SECS: u64 = 30;
pub const TOKEN_ACQUIRE_ATTEMPTS: u32 = 3;
pub const TOKEN_ACQUIRE_BACKOFF_MS: u64 = 500;

pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
pub const GRAPH_DEFAULT_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Hex characters kept from the blake3 digest for synthesized session ids.
pub const SESSION_ID_HEX_LEN: usize = 16;

/// Keywords recognised in remote event subjects.
pub const TAG_VOCABULARY: &[&str] = &[
    "ai",
    "agents",
    "safety",
    "ml",
    "llm",
    "devops",
    "security",
    "cloud",
    "data",
    "rag",
    "copilot",
    "azure",
    "python",
    "rust",
    "governance",
    "evaluation",
];
