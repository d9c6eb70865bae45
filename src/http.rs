//! HTTP client abstraction shared by every network-facing component
//!
//! Providers, the geocoder and the weather service depend on [`HttpClient`]
//! rather than on reqwest directly so they can run against
//! [`crate::mock::MockHttpClient`] in tests.

use async_trait::async_trait;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::config::ProvidersConfig;
use crate::{DashboardError, Result};

/// Query parameters whose values are never written to logs
const SECRET_PARAMS: [&str; 4] = ["token", "appid", "api_key", "apikey"];

/// Failure of a single HTTP exchange
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HttpError {
    #[error("transport error: {message}")]
    Transport { message: String },

    #[error("request timed out")]
    Timeout,

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid JSON body: {message}")]
    Decode { message: String },
}

impl HttpError {
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn decode<S: Into<String>>(message: S) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}

/// Minimal JSON-over-HTTP capability
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Issue a GET request and parse the body as JSON.
    ///
    /// Non-2xx responses are returned as [`HttpError::Status`].
    async fn get_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> std::result::Result<serde_json::Value, HttpError>;
}

/// reqwest-backed client with per-request timeout and transient-error retries
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: ClientWithMiddleware,
}

impl ReqwestHttpClient {
    /// Build a client from the provider settings
    pub fn from_config(config: &ProvidersConfig) -> Result<Self> {
        Self::new(
            Duration::from_secs(config.timeout_seconds.into()),
            config.max_retries,
        )
    }

    pub fn new(timeout: Duration, max_retries: u32) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(format!("CityDash/{}", crate::VERSION))
            .build()
            .map_err(|e| DashboardError::config(format!("Failed to create HTTP client: {e}")))?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(max_retries);
        let client = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    #[instrument(skip(self, url, headers), fields(url = %redact_url(url)))]
    async fn get_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> std::result::Result<serde_json::Value, HttpError> {
        let start_time = Instant::now();
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send().await.map_err(|e| match e {
            reqwest_middleware::Error::Reqwest(err) if err.is_timeout() => HttpError::Timeout,
            other => HttpError::transport(other.to_string()),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("HTTP {} from {}", status.as_u16(), redact_url(url));
            return Err(HttpError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                HttpError::Timeout
            } else {
                HttpError::transport(e.to_string())
            }
        })?;

        debug!(
            "GET {} completed in {:?}",
            redact_url(url),
            start_time.elapsed()
        );

        serde_json::from_str(&body).map_err(|e| HttpError::decode(e.to_string()))
    }
}

/// Replace secret query parameter values with `***`
#[must_use]
pub fn redact_url(url: &str) -> String {
    let Some((base, query)) = url.split_once('?') else {
        return url.to_string();
    };

    let redacted: Vec<String> = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) if SECRET_PARAMS.contains(&key.to_lowercase().as_str()) => {
                format!("{key}=***")
            }
            _ => pair.to_string(),
        })
        .collect();

    format!("{base}?{}", redacted.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_url_hides_tokens() {
        assert_eq!(
            redact_url("https://api.waqi.info/feed/Delhi/?token=secret"),
            "https://api.waqi.info/feed/Delhi/?token=***"
        );
        assert_eq!(
            redact_url("https://x.test/forecast?lat=1&lon=2&appid=abc&units=metric"),
            "https://x.test/forecast?lat=1&lon=2&appid=***&units=metric"
        );
    }

    #[test]
    fn test_redact_url_without_query() {
        assert_eq!(redact_url("https://x.test/a"), "https://x.test/a");
    }

    #[test]
    fn test_client_builds_from_defaults() {
        let config = ProvidersConfig::default();
        assert!(ReqwestHttpClient::from_config(&config).is_ok());
    }
}
