//! Conversions from external infrastructure errors into domain errors.

use eventkit_domain::EventKitError;
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct InfraError(pub EventKitError);

impl From<InfraError> for EventKitError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<EventKitError> for InfraError {
    fn from(value: EventKitError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoEventKitError {
    fn into_eventkit(self) -> EventKitError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → EventKitError */
/* -------------------------------------------------------------------------- */

impl IntoEventKitError for HttpError {
    fn into_eventkit(self) -> EventKitError {
        if self.is_timeout() {
            return EventKitError::remote(None, "HTTP request timed out");
        }

        if self.is_connect() {
            return EventKitError::remote(None, "HTTP connection failure");
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                401 | 403 => EventKitError::Auth(message),
                429 => EventKitError::rate_limited(message),
                _ => EventKitError::remote(Some(code), message),
            };
        }

        EventKitError::remote(None, self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_eventkit())
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error → EventKitError */
/* -------------------------------------------------------------------------- */

// JSON only crosses this boundary as remote response bodies; manifest parsing
// maps its own errors to `Config`.
impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(EventKitError::remote(None, format!("malformed response body: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* toml / io → EventKitError */
/* -------------------------------------------------------------------------- */

impl From<toml::de::Error> for InfraError {
    fn from(value: toml::de::Error) -> Self {
        InfraError(EventKitError::Config(format!("Invalid TOML format: {value}")))
    }
}

impl From<std::io::Error> for InfraError {
    fn from(value: std::io::Error) -> Self {
        InfraError(EventKitError::Config(format!("I/O error: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
