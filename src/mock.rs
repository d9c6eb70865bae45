//! Canned-response HTTP client for testing.
//!
//! [`MockHttpClient`] implements [`HttpClient`] by matching each requested URL
//! against registered substrings. Routes can answer with JSON, an error, or a
//! delayed response to exercise timeouts. Every request is recorded so tests
//! can assert which endpoints were hit and in what order.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::http::{HttpClient, HttpError};

/// How a route answers
#[derive(Debug, Clone)]
pub enum MockResponse {
    Json(Value),
    Error(HttpError),
    /// Sleep before answering with the inner response
    Delayed(Duration, Box<MockResponse>),
}

/// A request seen by the mock
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

/// HTTP fake keyed by URL substring; the first matching route wins
#[derive(Debug, Default)]
pub struct MockHttpClient {
    routes: Mutex<Vec<(String, MockResponse)>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockHttpClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer URLs containing `pattern` with `body`
    #[must_use]
    pub fn with_json(self, pattern: &str, body: Value) -> Self {
        self.set_response(pattern, MockResponse::Json(body));
        self
    }

    /// Fail URLs containing `pattern` with `error`
    #[must_use]
    pub fn with_error(self, pattern: &str, error: HttpError) -> Self {
        self.set_response(pattern, MockResponse::Error(error));
        self
    }

    /// Answer URLs containing `pattern` with `body` after `delay`
    #[must_use]
    pub fn with_delayed_json(self, pattern: &str, delay: Duration, body: Value) -> Self {
        self.set_response(
            pattern,
            MockResponse::Delayed(delay, Box::new(MockResponse::Json(body))),
        );
        self
    }

    /// Replace the response of an existing route, or add a new one
    pub fn set_response(&self, pattern: &str, response: MockResponse) {
        let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(route) = routes.iter_mut().find(|(p, _)| p == pattern) {
            route.1 = response;
        } else {
            routes.push((pattern.to_string(), response));
        }
    }

    /// All requests in the order they were issued
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Requested URLs in order
    #[must_use]
    pub fn urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.url).collect()
    }

    /// Number of requests whose URL contains `pattern`
    #[must_use]
    pub fn call_count(&self, pattern: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.url.contains(pattern))
            .count()
    }

    fn lookup(&self, url: &str) -> Option<MockResponse> {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|(pattern, _)| url.contains(pattern.as_str()))
            .map(|(_, response)| response.clone())
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn get_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<Value, HttpError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedRequest {
                url: url.to_string(),
                headers: headers
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                    .collect(),
            });

        let mut response = self.lookup(url).ok_or_else(|| HttpError::Status {
            status: 404,
            body: format!("no mock route for {url}"),
        })?;

        loop {
            match response {
                MockResponse::Json(body) => return Ok(body),
                MockResponse::Error(error) => return Err(error),
                MockResponse::Delayed(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    response = *inner;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_routes_by_substring() {
        let mock = MockHttpClient::new()
            .with_json("waqi", json!({"status": "ok"}))
            .with_error("openaq", HttpError::Timeout);

        let body = mock
            .get_json("https://api.waqi.info/feed/x", &[])
            .await
            .unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(
            mock.get_json("https://api.openaq.org/v2", &[]).await,
            Err(HttpError::Timeout)
        );
        assert_eq!(mock.call_count("waqi"), 1);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let mock = MockHttpClient::new();
        let err = mock.get_json("https://nowhere.test", &[]).await.unwrap_err();
        assert!(matches!(err, HttpError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_records_headers() {
        let mock = MockHttpClient::new().with_json("ninjas", json!({}));
        mock.get_json("https://api.api-ninjas.com", &[("X-Api-Key", "k")])
            .await
            .unwrap();
        let requests = mock.requests();
        assert_eq!(
            requests[0].headers,
            vec![("X-Api-Key".to_string(), "k".to_string())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_response() {
        let mock = MockHttpClient::new().with_delayed_json(
            "slow",
            Duration::from_secs(3),
            json!({"ok": true}),
        );
        let start = tokio::time::Instant::now();
        let body = mock.get_json("https://slow.test", &[]).await.unwrap();
        assert_eq!(body["ok"], true);
        assert!(start.elapsed() >= Duration::from_secs(3));
    }
}
