//! REST side of the gateway
//!
//! Staff resources live behind plain REST endpoints that speak vendor media
//! types (`application/vnd.memento.*+json`). A [`RestTransport`] returns the
//! response whatever its status so callers can accept specific warnings;
//! [`RestResponse::into_success`] turns the rest into [`SalonError::Http`].

use crate::result::{SalonError, SalonResult};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Mutex;

/// One REST POST
#[derive(Debug, Clone, PartialEq)]
pub struct RestRequest {
    /// Label used in errors and logs
    pub operation: String,
    /// Absolute URL
    pub url: String,
    /// `Content-Type`
    pub content_type: &'static str,
    /// `Accept`; `None` means same as `content_type`
    pub accept: Option<&'static str>,
    /// JSON body
    pub body: Value,
}

impl RestRequest {
    /// POST `body` to `url` as `content_type`
    pub fn post(
        operation: impl Into<String>,
        url: impl Into<String>,
        content_type: &'static str,
        body: Value,
    ) -> Self {
        Self {
            operation: operation.into(),
            url: url.into(),
            content_type,
            accept: None,
            body,
        }
    }

    /// Override `Accept`
    #[must_use]
    pub const fn with_accept(mut self, accept: &'static str) -> Self {
        self.accept = Some(accept);
        self
    }
}

/// Status and body of a REST response
#[derive(Debug, Clone, PartialEq)]
pub struct RestResponse {
    /// HTTP status
    pub status: u16,
    /// Parsed body, `Null` when empty
    pub body: Value,
}

impl RestResponse {
    /// Response with status `status` and body `body`
    pub const fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// True for 2xx
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// The body of a 2xx response.
    ///
    /// # Errors
    ///
    /// [`SalonError::Http`] for any other status, body truncated.
    pub fn into_success(self, operation: &str) -> SalonResult<Value> {
        if self.is_success() {
            return Ok(self.body);
        }
        let body = if self.body.is_null() {
            String::new()
        } else {
            self.body.to_string()
        };
        Err(SalonError::http(operation, self.status, &body))
    }
}

/// Sends REST requests through the gateway
#[async_trait]
pub trait RestTransport: Send + Sync {
    /// Send `request`; non-2xx statuses are returned, not raised
    async fn send(&self, request: &RestRequest) -> SalonResult<RestResponse>;
}

// =============================================================================
// MOCK
// =============================================================================

type Handler = Box<dyn Fn(&RestRequest) -> SalonResult<RestResponse> + Send + Sync>;

/// REST transport answering from a closure and recording every request
pub struct MockRestTransport {
    handler: Handler,
    requests: Mutex<Vec<RestRequest>>,
}

impl std::fmt::Debug for MockRestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockRestTransport")
            .field("requests", &self.requests().len())
            .finish_non_exhaustive()
    }
}

impl MockRestTransport {
    /// Answer every request with `handler`
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&RestRequest) -> SalonResult<RestResponse> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far
    #[must_use]
    pub fn requests(&self) -> Vec<RestRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Operations in the order they were received
    #[must_use]
    pub fn operations(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.operation).collect()
    }
}

#[async_trait]
impl RestTransport for MockRestTransport {
    async fn send(&self, request: &RestRequest) -> SalonResult<RestResponse> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        (self.handler)(request)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_returns_body() {
        let body = RestResponse::new(201, json!({"ok": true}))
            .into_success("create")
            .unwrap();
        assert_eq!(body["ok"], true);
    }

    #[test]
    fn test_failure_is_http_error_with_body() {
        let err = RestResponse::new(409, json!({"code": "DUPLICATE"}))
            .into_success("create")
            .unwrap_err();
        match err {
            SalonError::Http {
                operation,
                status,
                body,
            } => {
                assert_eq!(operation, "create");
                assert_eq!(status, 409);
                assert!(body.contains("DUPLICATE"));
            }
            other => panic!("expected Http, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_failure_body() {
        let err = RestResponse::new(500, Value::Null)
            .into_success("archive")
            .unwrap_err();
        assert!(err.to_string().contains("<empty>"));
    }

    #[test]
    fn test_accept_override() {
        let req = RestRequest::post("op", "https://gw/x", "a/b", json!({})).with_accept("a/b, c/d");
        assert_eq!(req.accept, Some("a/b, c/d"));
    }
}
