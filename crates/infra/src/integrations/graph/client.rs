//! Remote calendar source backed by Microsoft Graph `calendarView`
//!
//! Per request: response cache lookup, then one bearer token, then up to
//! [`CALENDAR_MAX_PAGES`] pages following `@odata.nextLink`. Each page runs
//! under the shared retry combinator:
//!
//! - 429: wait `Retry-After` (seconds or HTTP date), else exponential backoff
//!   from 1s capped at 30s; after the budget the error is tagged rate-limited
//! - transport failures and timeouts: retried on the same budget
//! - 401: the token is invalidated and the whole fetch repeats once
//! - anything else: surfaced immediately

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use eventkit_common::resilience::{policies::ClassifyRetry, with_retry, RetryConfig, RetryDecision};
use eventkit_common::time::{Clock, SystemClock};
use eventkit_core::{AccessTokenProvider, CalendarEventProvider, CredentialStore};
use eventkit_domain::constants::{
    CALENDAR_MAX_PAGES, CALENDAR_PAGE_SIZE, RATE_LIMIT_INITIAL_BACKOFF_MS,
    RATE_LIMIT_MAX_BACKOFF_SECS, RATE_LIMIT_MAX_RETRIES,
};
use eventkit_domain::{DateRange, EventKitError, GraphSettings, Result, Session};
use reqwest::header::{HeaderValue, ACCEPT, RETRY_AFTER};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use super::cache::ResponseCache;
use super::transform::EventTransformer;
use super::types::{CalendarPage, GraphErrorBody};
use crate::auth::{ClientCredentialsTokenProvider, FileCredentialStore, InMemoryCredentialStore};
use crate::errors::InfraError;
use crate::http::HttpClient;

const PREFER_UTC: &str = "outlook.timezone=\"UTC\"";

/// Outcome of one page request that did not produce a page.
#[derive(Debug)]
enum PageFailure {
    RateLimited { retry_after: Option<Duration> },
    Unauthorized,
    Transport(reqwest::Error),
    Status { status: u16, message: String },
    Malformed(String),
}

fn classify_page(failure: &PageFailure, _attempt: u32) -> RetryDecision {
    match failure {
        PageFailure::RateLimited { retry_after: Some(delay) } => RetryDecision::RetryAfter(*delay),
        PageFailure::RateLimited { retry_after: None } | PageFailure::Transport(_) => {
            RetryDecision::Retry
        }
        PageFailure::Unauthorized | PageFailure::Status { .. } | PageFailure::Malformed(_) => {
            RetryDecision::Stop
        }
    }
}

/// Outcome of one full fetch (all pages).
enum FetchFailure {
    Unauthorized,
    Failed(EventKitError),
}

impl From<EventKitError> for FetchFailure {
    fn from(value: EventKitError) -> Self {
        Self::Failed(value)
    }
}

/// Default retry budget for calendar pages.
pub fn default_page_retry() -> RetryConfig {
    RetryConfig::builder()
        .max_attempts(RATE_LIMIT_MAX_RETRIES + 1)
        .exponential_backoff(
            Duration::from_millis(RATE_LIMIT_INITIAL_BACKOFF_MS),
            2.0,
            Duration::from_secs(RATE_LIMIT_MAX_BACKOFF_SECS),
        )
        .no_jitter()
        .build()
        .unwrap_or_default()
}

pub struct GraphCalendarSource {
    http: HttpClient,
    base_url: String,
    default_user_id: Option<String>,
    tokens: Arc<dyn AccessTokenProvider>,
    cache: Arc<ResponseCache>,
    transformer: EventTransformer,
    retry: RetryConfig,
    clock: Arc<dyn Clock>,
}

impl GraphCalendarSource {
    pub fn new(
        settings: &GraphSettings,
        http: HttpClient,
        tokens: Arc<dyn AccessTokenProvider>,
    ) -> Self {
        Self {
            http,
            base_url: settings.graph_base_url.clone(),
            default_user_id: settings
                .default_user_id
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            tokens,
            cache: Arc::new(ResponseCache::new(Duration::from_secs(settings.cache_ttl_seconds))),
            transformer: EventTransformer::default(),
            retry: default_page_retry(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Wire the production stack: timeout-bound HTTP client, file token cache
    /// (in-memory when no path is configured) and client-credential provider.
    ///
    /// # Errors
    /// `Config` when the HTTP client cannot be built.
    pub fn from_settings(settings: &GraphSettings) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(settings.request_timeout_seconds))
            .build()?;
        let store: Arc<dyn CredentialStore> = match &settings.token_cache_path {
            Some(path) => Arc::new(FileCredentialStore::new(path.clone())),
            None => Arc::new(InMemoryCredentialStore::new()),
        };
        let tokens = ClientCredentialsTokenProvider::new(settings.clone(), http.clone(), store);
        Ok(Self::new(settings, http, Arc::new(tokens)))
    }

    /// Share a cache between sources, or inject one with a mock clock.
    pub fn with_cache(mut self, cache: Arc<ResponseCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_transformer(mut self, transformer: EventTransformer) -> Self {
        self.transformer = transformer;
        self
    }

    /// Clock used to resolve HTTP-date `Retry-After` values.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    fn resolve_user<'a>(&'a self, requested: Option<&'a str>) -> Result<&'a str> {
        requested
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or(self.default_user_id.as_deref())
            .ok_or_else(|| {
                EventKitError::Auth(
                    "no calendar user given and GRAPH_DEFAULT_USER_ID is not set".into(),
                )
            })
    }

    fn first_page_url(&self, user_id: &str, range: &DateRange) -> Result<Url> {
        let base = &self.base_url;
        let mut url = Url::parse(base)
            .map_err(|e| EventKitError::Config(format!("invalid Graph base URL '{base}': {e}")))?;
        url.path_segments_mut()
            .map_err(|()| {
                EventKitError::Config(format!("Graph base URL '{base}' cannot take a path"))
            })?
            .pop_if_empty()
            .extend(["users", user_id, "calendarView"]);
        url.query_pairs_mut()
            .append_pair("startDateTime", &range.start.to_rfc3339_opts(SecondsFormat::Secs, true))
            .append_pair("endDateTime", &range.end.to_rfc3339_opts(SecondsFormat::Secs, true))
            .append_pair("$top", &CALENDAR_PAGE_SIZE.to_string())
            .append_pair("$orderby", "start/dateTime");
        Ok(url)
    }

    async fn fetch_page(
        &self,
        url: &Url,
        token: &str,
    ) -> std::result::Result<CalendarPage, PageFailure> {
        let request = self
            .http
            .request(Method::GET, url.clone())
            .bearer_auth(token)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .header("Prefer", HeaderValue::from_static(PREFER_UTC));

        let response = self.http.send(request).await.map_err(PageFailure::Transport)?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| parse_retry_after(v, self.clock.utc_now()));
            warn!(?retry_after, "Calendar request rate limited");
            return Err(PageFailure::RateLimited { retry_after });
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(PageFailure::Unauthorized);
        }

        let body = response.text().await.map_err(PageFailure::Transport)?;
        if !status.is_success() {
            let message = serde_json::from_str::<GraphErrorBody>(&body)
                .ok()
                .and_then(|b| b.summary())
                .unwrap_or_else(|| body.chars().take(200).collect());
            return Err(PageFailure::Status { status: status.as_u16(), message });
        }

        serde_json::from_str(&body).map_err(|e| PageFailure::Malformed(e.to_string()))
    }

    async fn fetch_all_pages(
        &self,
        user_id: &str,
        range: &DateRange,
    ) -> std::result::Result<Vec<Value>, FetchFailure> {
        let token = self.tokens.access_token().await?;
        let mut next = Some(self.first_page_url(user_id, range)?);
        let mut events = Vec::new();
        let mut pages = 0usize;

        while let Some(url) = next.take() {
            if pages == CALENDAR_MAX_PAGES {
                warn!(pages, "Calendar page limit reached; remaining events dropped");
                break;
            }
            pages += 1;

            let page = with_retry(self.retry.clone(), ClassifyRetry::new(classify_page), || {
                self.fetch_page(&url, &token)
            })
            .await
            .map_err(|err| {
                let attempts = err.attempts();
                page_failure_into(err.into_inner(), attempts)
            })?;

            debug!(page = pages, events = page.value.len(), "Fetched calendar page");
            events.extend(page.value);
            next = match page.next_link {
                Some(link) => Some(Url::parse(&link).map_err(|e| {
                    let message = format!("invalid nextLink: {e}");
                    FetchFailure::Failed(EventKitError::remote(None, message))
                })?),
                None => None,
            };
        }

        Ok(events)
    }

    /// Raw events for `(user, range)`, from cache when live.
    async fn raw_events(&self, user_id: &str, range: &DateRange) -> Result<Arc<Vec<Value>>> {
        let key = ResponseCache::key(user_id, range);
        if let Some(events) = self.cache.get(&key) {
            return Ok(events);
        }

        let events = match self.fetch_all_pages(user_id, range).await {
            Ok(events) => events,
            Err(FetchFailure::Failed(err)) => return Err(err),
            Err(FetchFailure::Unauthorized) => {
                warn!("Calendar rejected token; invalidating and retrying once");
                self.tokens.invalidate().await?;
                match self.fetch_all_pages(user_id, range).await {
                    Ok(events) => events,
                    Err(FetchFailure::Failed(err)) => return Err(err),
                    Err(FetchFailure::Unauthorized) => {
                        error!("Calendar rejected a freshly acquired token");
                        return Err(EventKitError::Auth(
                            "remote calendar rejected the access token after refresh".into(),
                        ));
                    }
                }
            }
        };

        Ok(self.cache.insert(key, events))
    }
}

fn page_failure_into(failure: PageFailure, attempts: u32) -> FetchFailure {
    let err = match failure {
        PageFailure::Unauthorized => return FetchFailure::Unauthorized,
        PageFailure::RateLimited { .. } => {
            error!(attempts, "Calendar rate limit retry budget exhausted");
            EventKitError::rate_limited(format!(
                "calendar still rate limited after {attempts} attempts"
            ))
        }
        PageFailure::Transport(err) => EventKitError::from(InfraError::from(err)),
        PageFailure::Status { status: 403, message } => {
            EventKitError::Auth(format!("calendar access forbidden: {message}"))
        }
        PageFailure::Status { status, message } => EventKitError::remote(Some(status), message),
        PageFailure::Malformed(message) => {
            EventKitError::remote(None, format!("malformed calendar response: {message}"))
        }
    };
    FetchFailure::Failed(err)
}

/// `Retry-After` as delta seconds or an HTTP date relative to `now`.
pub(crate) fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    let delay = if let Ok(seconds) = value.parse::<u64>() {
        Duration::from_secs(seconds)
    } else {
        let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
        (at - now).to_std().unwrap_or(Duration::ZERO)
    };
    Some(delay.min(Duration::from_secs(RATE_LIMIT_MAX_BACKOFF_SECS)))
}

#[async_trait]
impl CalendarEventProvider for GraphCalendarSource {
    #[instrument(skip(self), fields(start = %range.start, end = %range.end))]
    async fn fetch_events(&self, user_id: Option<&str>, range: DateRange) -> Result<Vec<Session>> {
        let user_id = self.resolve_user(user_id)?;
        let raw = self.raw_events(user_id, &range).await?;
        let sessions = self.transformer.transform_all(&raw);
        info!(
            user_id = %user_id,
            raw = raw.len(),
            sessions = sessions.len(),
            "Loaded remote calendar"
        );
        Ok(sessions)
    }
}

impl std::fmt::Debug for GraphCalendarSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphCalendarSource")
            .field("base_url", &self.base_url)
            .field("default_user_id", &self.default_user_id)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
