//! Client-credential token provider for the remote calendar
//!
//! Tokens come from the cache while `now < expires_at - skew`. Otherwise one
//! caller at a time performs the client-credential exchange; callers queued
//! behind it re-check the cache and reuse the fresh token.
//!
//! Transport failures, timeouts and 5xx responses from the identity service
//! are retried with backoff. Rejections (400/401) are fatal.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use eventkit_common::resilience::{
    policies::ClassifyRetry, with_retry, RetryConfig, RetryDecision, RetryError,
};
use eventkit_common::time::{Clock, SystemClock};
use eventkit_core::{AccessTokenProvider, CredentialStore};
use eventkit_domain::constants::{
    DEFAULT_TOKEN_LIFETIME_SECS, GRAPH_DEFAULT_SCOPE, MAX_TOKEN_LIFETIME_SECS,
    TOKEN_ACQUIRE_ATTEMPTS, TOKEN_ACQUIRE_BACKOFF_MS, TOKEN_REFRESH_SKEW_SECS,
};
use eventkit_domain::{CachedToken, EventKitError, GraphSettings, Result};
use reqwest::Method;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::http::HttpClient;

/// Why a single token request failed.
#[derive(Debug)]
enum TokenFailure {
    Transport(String),
    Server { status: u16, body: String },
    Rejected { status: u16, detail: String },
    Malformed(String),
}

impl TokenFailure {
    fn describe(&self) -> String {
        match self {
            Self::Transport(msg) => format!("identity service unreachable: {msg}"),
            Self::Server { status, body } => format!("identity service error {status}: {body}"),
            Self::Rejected { status, detail } => {
                format!("identity service rejected credentials ({status}): {detail}")
            }
            Self::Malformed(msg) => format!("unexpected token response: {msg}"),
        }
    }
}

fn classify(failure: &TokenFailure, _attempt: u32) -> RetryDecision {
    match failure {
        TokenFailure::Transport(_) | TokenFailure::Server { .. } => RetryDecision::Retry,
        TokenFailure::Rejected { .. } | TokenFailure::Malformed(_) => RetryDecision::Stop,
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<Lifetime>,
}

/// `expires_in` arrives as a number from most tenants and as a string from some.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Lifetime {
    Seconds(i64),
    Text(String),
}

impl Lifetime {
    fn seconds(&self) -> Option<i64> {
        match self {
            Self::Seconds(s) => Some(*s),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct TokenErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

struct Credentials<'a> {
    token_url: String,
    client_id: &'a str,
    client_secret: &'a str,
}

/// Acquires app-only tokens with the OAuth2 client-credential grant.
pub struct ClientCredentialsTokenProvider {
    http: HttpClient,
    settings: GraphSettings,
    scope: String,
    store: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
    skew: chrono::Duration,
    retry: RetryConfig,
    refresh_lock: Mutex<()>,
}

impl ClientCredentialsTokenProvider {
    pub fn new(settings: GraphSettings, http: HttpClient, store: Arc<dyn CredentialStore>) -> Self {
        let retry = RetryConfig::builder()
            .max_attempts(TOKEN_ACQUIRE_ATTEMPTS)
            .exponential_backoff(
                Duration::from_millis(TOKEN_ACQUIRE_BACKOFF_MS),
                2.0,
                Duration::from_secs(30),
            )
            .no_jitter()
            .build()
            .unwrap_or_default();
        Self {
            http,
            settings,
            scope: GRAPH_DEFAULT_SCOPE.to_string(),
            store,
            clock: Arc::new(SystemClock),
            skew: chrono::Duration::seconds(TOKEN_REFRESH_SKEW_SECS),
            retry,
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    fn credentials(&self) -> Result<Credentials<'_>> {
        let missing = self.settings.missing_fields();
        if !missing.is_empty() {
            return Err(EventKitError::Auth(format!(
                "missing Graph credentials: {}",
                missing.join(", ")
            )));
        }
        Ok(Credentials {
            token_url: format!(
                "{}/{}/oauth2/v2.0/token",
                self.settings.authority_host.trim_end_matches('/'),
                field(&self.settings.tenant_id)
            ),
            client_id: field(&self.settings.client_id),
            client_secret: field(&self.settings.client_secret),
        })
    }

    async fn fresh_cached(&self) -> Option<CachedToken> {
        let token = self.store.load().await?;
        if token.is_fresh_at(self.clock.utc_now(), self.skew) {
            Some(token)
        } else {
            debug!(expires_at = %token.expires_at, "Cached token expired or expiring soon");
            None
        }
    }

    async fn request_token(
        &self,
        creds: &Credentials<'_>,
    ) -> std::result::Result<TokenResponse, TokenFailure> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", creds.client_id),
            ("client_secret", creds.client_secret),
            ("scope", self.scope.as_str()),
        ];
        let request = self.http.request(Method::POST, &creds.token_url).form(&form);
        let response = self
            .http
            .send(request)
            .await
            .map_err(|e| TokenFailure::Transport(e.to_string()))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| TokenFailure::Transport(e.to_string()))?;

        if status.is_success() {
            return serde_json::from_str::<TokenResponse>(&body)
                .map_err(|e| TokenFailure::Malformed(e.to_string()));
        }

        let code = status.as_u16();
        if status.is_server_error() || code == 429 {
            return Err(TokenFailure::Server { status: code, body: truncate(&body, 200) });
        }

        let parsed: TokenErrorBody = serde_json::from_str(&body).unwrap_or_default();
        let detail = match (parsed.error, parsed.error_description) {
            (Some(error), Some(description)) => format!("{error}: {}", truncate(&description, 200)),
            (Some(error), None) => error,
            _ => truncate(&body, 200),
        };
        Err(TokenFailure::Rejected { status: code, detail })
    }

    async fn acquire(&self) -> Result<CachedToken> {
        let creds = self.credentials()?;
        info!("Acquiring new access token");

        let policy = ClassifyRetry::new(classify);
        let response = with_retry(self.retry.clone(), policy, || self.request_token(&creds))
            .await
            .map_err(|err: RetryError<TokenFailure>| {
                let attempts = err.attempts();
                let message = err.into_inner().describe();
                warn!(attempts, error = %message, "Token acquisition failed");
                EventKitError::Auth(message)
            })?;

        let lifetime = response
            .expires_in
            .as_ref()
            .and_then(Lifetime::seconds)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        if !(1..=MAX_TOKEN_LIFETIME_SECS).contains(&lifetime) {
            warn!(expires_in_seconds = lifetime, "Clamping out-of-range token lifetime");
        }
        let token =
            CachedToken::from_lifetime(response.access_token, self.clock.utc_now(), lifetime);
        info!(expires_in_seconds = lifetime, "Acquired access token");
        Ok(token)
    }
}

fn field(value: &Option<String>) -> &str {
    value.as_deref().map(str::trim).unwrap_or_default()
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[async_trait]
impl AccessTokenProvider for ClientCredentialsTokenProvider {
    #[instrument(skip(self))]
    async fn access_token(&self) -> Result<String> {
        if let Some(token) = self.fresh_cached().await {
            debug!("Using cached access token");
            return Ok(token.value);
        }

        let _guard = self.refresh_lock.lock().await;
        if let Some(token) = self.fresh_cached().await {
            debug!("Token refreshed by a concurrent caller");
            return Ok(token.value);
        }

        let token = self.acquire().await?;
        if let Err(err) = self.store.store(&token).await {
            warn!(error = %err, "Failed to persist access token; continuing with in-memory value");
        }
        Ok(token.value)
    }

    async fn invalidate(&self) -> Result<()> {
        info!("Invalidating cached access token");
        self.store.clear().await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use eventkit_common::time::MockClock;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::auth::InMemoryCredentialStore;

    const TOKEN_PATH: &str = "/tenant-1/oauth2/v2.0/token";

    fn settings(server: &MockServer) -> GraphSettings {
        GraphSettings {
            tenant_id: Some("tenant-1".into()),
            client_id: Some("client-1".into()),
            client_secret: Some("secret-1".into()),
            authority_host: server.uri(),
            ..GraphSettings::default()
        }
    }

    fn fast_retry() -> RetryConfig {
        RetryConfig::builder()
            .max_attempts(3)
            .fixed_backoff(Duration::from_millis(5))
            .no_jitter()
            .build()
            .unwrap()
    }

    fn clock() -> Arc<MockClock> {
        Arc::new(MockClock::starting_at(Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()))
    }

    fn provider(
        server: &MockServer,
        store: Arc<InMemoryCredentialStore>,
        clock: Arc<MockClock>,
    ) -> ClientCredentialsTokenProvider {
        ClientCredentialsTokenProvider::new(settings(server), HttpClient::new().unwrap(), store)
            .with_clock(clock)
            .with_retry_config(fast_retry())
    }

    fn token_ok(value: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "expires_in": 3600,
            "access_token": value
        }))
    }

    #[tokio::test]
    async fn fresh_cached_token_skips_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).respond_with(token_ok("new")).expect(0).mount(&server).await;

        let clock = clock();
        let cached = CachedToken::from_lifetime("cached", clock.utc_now(), 3600);
        let store = Arc::new(InMemoryCredentialStore::with_token(cached));
        let provider = provider(&server, store, clock);

        assert_eq!(provider.access_token().await.unwrap(), "cached");
        assert_eq!(provider.access_token().await.unwrap(), "cached");
    }

    #[tokio::test]
    async fn acquires_and_stores_when_cache_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .and(body_string_contains("grant_type=client_credentials"))
            .and(body_string_contains("client_id=client-1"))
            .respond_with(token_ok("fresh"))
            .expect(1)
            .mount(&server)
            .await;

        let clock = clock();
        let store = Arc::new(InMemoryCredentialStore::new());
        let provider = provider(&server, store.clone(), clock.clone());

        assert_eq!(provider.access_token().await.unwrap(), "fresh");
        let stored = store.current().unwrap();
        assert_eq!(stored.value, "fresh");
        assert_eq!(stored.acquired_at, clock.utc_now());
        assert_eq!(stored.expires_at, clock.utc_now() + chrono::Duration::seconds(3600));

        // Second call is served from the store
        assert_eq!(provider.access_token().await.unwrap(), "fresh");
    }

    #[tokio::test]
    async fn token_inside_skew_window_is_refreshed() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).respond_with(token_ok("renewed")).expect(1).mount(&server).await;

        let clock = clock();
        // Expires in 4 minutes, inside the 5 minute skew
        let cached = CachedToken::from_lifetime("stale", clock.utc_now(), 240);
        let store = Arc::new(InMemoryCredentialStore::with_token(cached));
        let provider = provider(&server, store, clock);

        assert_eq!(provider.access_token().await.unwrap(), "renewed");
    }

    #[tokio::test]
    async fn cached_token_expires_as_clock_advances() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).respond_with(token_ok("later")).expect(1).mount(&server).await;

        let clock = clock();
        let cached = CachedToken::from_lifetime("early", clock.utc_now(), 3600);
        let store = Arc::new(InMemoryCredentialStore::with_token(cached));
        let provider = provider(&server, store, clock.clone());

        assert_eq!(provider.access_token().await.unwrap(), "early");
        clock.advance(Duration::from_secs(3301));
        assert_eq!(provider.access_token().await.unwrap(), "later");
    }

    #[tokio::test]
    async fn rejected_credentials_are_fatal_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": "invalid_client",
                "error_description": "AADSTS7000215: Invalid client secret provided."
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider(&server, Arc::new(InMemoryCredentialStore::new()), clock());
        let err = provider.access_token().await.unwrap_err();

        match err {
            EventKitError::Auth(msg) => assert!(msg.contains("invalid_client")),
            other => panic!("expected auth error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn server_errors_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST")).respond_with(token_ok("third-time")).expect(1).mount(&server).await;

        let provider = provider(&server, Arc::new(InMemoryCredentialStore::new()), clock());
        assert_eq!(provider.access_token().await.unwrap(), "third-time");
    }

    #[tokio::test]
    async fn persistent_server_errors_surface_as_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).respond_with(ResponseTemplate::new(500)).expect(3).mount(&server).await;

        let provider = provider(&server, Arc::new(InMemoryCredentialStore::new()), clock());
        let err = provider.access_token().await.unwrap_err();
        assert!(matches!(err, EventKitError::Auth(_)));
    }

    #[tokio::test]
    async fn missing_credentials_fail_before_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).respond_with(token_ok("x")).expect(0).mount(&server).await;

        let mut incomplete = settings(&server);
        incomplete.client_secret = None;
        let provider = ClientCredentialsTokenProvider::new(
            incomplete,
            HttpClient::new().unwrap(),
            Arc::new(InMemoryCredentialStore::new()),
        );

        let err = provider.access_token().await.unwrap_err();
        match err {
            EventKitError::Auth(msg) => assert!(msg.contains("client_secret")),
            other => panic!("expected auth error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(token_ok("shared").set_delay(Duration::from_millis(150)))
            .expect(1)
            .mount(&server)
            .await;

        let provider = Arc::new(provider(&server, Arc::new(InMemoryCredentialStore::new()), clock()));
        let handles: Vec<_> = (0..5)
            .map(|_| {
                let provider = provider.clone();
                tokio::spawn(async move { provider.access_token().await })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "shared");
        }
    }

    #[tokio::test]
    async fn invalidate_clears_store() {
        let server = MockServer::start().await;
        let clock = clock();
        let store = Arc::new(InMemoryCredentialStore::with_token(CachedToken::from_lifetime(
            "cached",
            clock.utc_now(),
            3600,
        )));
        let provider = provider(&server, store.clone(), clock);

        provider.invalidate().await.unwrap();
        assert!(store.current().is_none());
    }

    #[tokio::test]
    async fn out_of_range_lifetimes_are_clamped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "forever",
                "expires_in": 9_000_000_000_000_000_000_i64
            })))
            .expect(1)
            .mount(&server)
            .await;

        let clock = clock();
        let store = Arc::new(InMemoryCredentialStore::new());
        let provider = provider(&server, store.clone(), clock.clone());

        assert_eq!(provider.access_token().await.unwrap(), "forever");
        let stored = store.current().unwrap();
        assert_eq!(stored.expires_at, clock.utc_now() + chrono::Duration::seconds(MAX_TOKEN_LIFETIME_SECS));
    }

    #[tokio::test]
    async fn negative_lifetime_yields_short_lived_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "brief",
                "expires_in": "-5"
            })))
            .expect(2)
            .mount(&server)
            .await;

        let clock = clock();
        let store = Arc::new(InMemoryCredentialStore::new());
        let provider = provider(&server, store.clone(), clock.clone());

        // Stored but already inside the skew window, so the next call refreshes
        assert_eq!(provider.access_token().await.unwrap(), "brief");
        assert_eq!(store.current().unwrap().expires_at, clock.utc_now() + chrono::Duration::seconds(1));
        assert_eq!(provider.access_token().await.unwrap(), "brief");
    }

    #[tokio::test]
    async fn cached_token_at_calendar_start_is_refreshed() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).respond_with(token_ok("recovered")).expect(1).mount(&server).await;

        let ancient = CachedToken {
            value: "ancient".into(),
            acquired_at: chrono::DateTime::<Utc>::MIN_UTC,
            expires_at: chrono::DateTime::<Utc>::MIN_UTC,
        };
        let store = Arc::new(InMemoryCredentialStore::with_token(ancient));
        let provider = provider(&server, store, clock());

        assert_eq!(provider.access_token().await.unwrap(), "recovered");
    }

    #[test]
    fn lifetime_accepts_numbers_and_strings() {
        let numeric: TokenResponse = serde_json::from_str(r#"{"access_token":"a","expires_in":3599}"#).unwrap();
        let text: TokenResponse = serde_json::from_str(r#"{"access_token":"a","expires_in":"3599"}"#).unwrap();
        assert_eq!(numeric.expires_in.and_then(|l| l.seconds()), Some(3599));
        assert_eq!(text.expires_in.and_then(|l| l.seconds()), Some(3599));
    }
}
