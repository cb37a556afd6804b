//! Shared fixtures for infra integration tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use eventkit_common::resilience::RetryConfig;
use eventkit_core::AccessTokenProvider;
use eventkit_domain::{DateRange, GraphSettings, Result};
use eventkit_infra::auth::InMemoryCredentialStore;
use eventkit_infra::{ClientCredentialsTokenProvider, GraphCalendarSource, HttpClient};
use serde_json::{json, Value};
use wiremock::MockServer;

pub const USER: &str = "ada";
pub const CALENDAR_PATH: &str = "/v1.0/users/ada/calendarView";
pub const TOKEN_PATH: &str = "/tenant-1/oauth2/v2.0/token";

/// Token provider that always hands out the same value and counts invalidations.
#[derive(Debug)]
pub struct StaticTokenProvider {
    token: String,
    invalidations: AtomicUsize,
}

impl StaticTokenProvider {
    pub fn new(token: &str) -> Self {
        Self { token: token.to_string(), invalidations: AtomicUsize::new(0) }
    }

    pub fn invalidations(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccessTokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }

    async fn invalidate(&self) -> Result<()> {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Settings pointing both the identity service and Graph at `server`.
pub fn graph_settings(server: &MockServer) -> GraphSettings {
    GraphSettings {
        tenant_id: Some("tenant-1".into()),
        client_id: Some("client-1".into()),
        client_secret: Some("secret-1".into()),
        default_user_id: Some(USER.into()),
        authority_host: server.uri(),
        graph_base_url: format!("{}/v1.0", server.uri()),
        ..GraphSettings::default()
    }
}

/// Millisecond backoff so retry paths stay fast.
pub fn fast_retry(max_attempts: u32) -> RetryConfig {
    RetryConfig::builder()
        .max_attempts(max_attempts)
        .fixed_backoff(Duration::from_millis(5))
        .no_jitter()
        .build()
        .unwrap()
}

pub fn week_of_march() -> DateRange {
    DateRange::days_from(Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap(), 7)
}

pub fn static_source(server: &MockServer, tokens: Arc<StaticTokenProvider>) -> GraphCalendarSource {
    GraphCalendarSource::new(&graph_settings(server), HttpClient::new().unwrap(), tokens)
}

pub fn token_provider(
    server: &MockServer,
    store: Arc<InMemoryCredentialStore>,
) -> Arc<ClientCredentialsTokenProvider> {
    Arc::new(
        ClientCredentialsTokenProvider::new(graph_settings(server), HttpClient::new().unwrap(), store)
            .with_retry_config(fast_retry(3)),
    )
}

pub fn graph_event(subject: &str, start: &str, end: &str) -> Value {
    json!({
        "id": format!("native-{subject}"),
        "subject": subject,
        "start": {"dateTime": start, "timeZone": "UTC"},
        "end": {"dateTime": end, "timeZone": "UTC"},
        "location": {"displayName": "Hall A"},
        "categories": [],
        "isCancelled": false
    })
}

pub fn page(events: Vec<Value>) -> Value {
    json!({ "value": events })
}

pub fn token_body(value: &str) -> Value {
    json!({ "token_type": "Bearer", "expires_in": 3600, "access_token": value })
}
