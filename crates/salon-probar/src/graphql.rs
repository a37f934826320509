//! GraphQL gateway client
//!
//! [`GraphqlTransport`] is the seam between the flows and the network:
//! [`HttpTransport`] talks to the real gateway, [`MockTransport`] answers
//! from a closure in tests. Responses are decoded into explicit types at
//! this boundary; a missing field becomes [`SalonError::MissingField`]
//! instead of travelling on as a null.

use crate::result::{SalonError, SalonResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Mutex;

/// One GraphQL operation
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GraphqlRequest {
    /// Operation name, also used to label errors
    pub operation_name: String,
    /// Variables object
    pub variables: Value,
    /// Query document
    pub query: &'static str,
}

impl GraphqlRequest {
    /// Create a request
    pub fn new(operation_name: impl Into<String>, query: &'static str, variables: Value) -> Self {
        Self {
            operation_name: operation_name.into(),
            variables,
            query,
        }
    }
}

/// Executes GraphQL requests and returns the raw response envelope
#[async_trait]
pub trait GraphqlTransport: Send + Sync {
    /// Send `request`; returns `{ "data": ..., "errors": ... }` as received
    async fn execute(&self, request: &GraphqlRequest) -> SalonResult<Value>;
}

/// Execute `request` and decode `data.<field>` into `T`.
///
/// # Errors
///
/// - transport errors from `transport`, unchanged
/// - [`SalonError::GraphQl`] when the envelope has a non-empty `errors` array
/// - [`SalonError::MissingField`] when `data.<field>` is absent or malformed
pub async fn fetch_data<T, R>(transport: &R, request: &GraphqlRequest, field: &str) -> SalonResult<T>
where
    T: DeserializeOwned,
    R: GraphqlTransport + ?Sized,
{
    let envelope = transport.execute(request).await?;
    decode_envelope(&request.operation_name, envelope, field)
}

/// Decode `data.<field>` from a response envelope
pub fn decode_envelope<T: DeserializeOwned>(
    operation: &str,
    mut envelope: Value,
    field: &str,
) -> SalonResult<T> {
    if let Some(errors) = envelope.get("errors").and_then(Value::as_array) {
        if !errors.is_empty() {
            let messages = errors
                .iter()
                .map(|e| {
                    e.get("message")
                        .and_then(Value::as_str)
                        .map_or_else(|| e.to_string(), str::to_string)
                })
                .collect();
            return Err(SalonError::GraphQl {
                operation: operation.to_string(),
                messages,
            });
        }
    }

    let path = format!("data.{field}");
    let value = envelope
        .get_mut("data")
        .and_then(|data| data.get_mut(field))
        .map(Value::take)
        .filter(|v| !v.is_null())
        .ok_or_else(|| SalonError::missing_field(operation, &path))?;

    serde_json::from_value(value)
        .map_err(|e| SalonError::missing_field(operation, format!("{path} ({e})")))
}

// =============================================================================
// HTTP TRANSPORT
// =============================================================================

#[cfg(feature = "http")]
pub use http::HttpTransport;

#[cfg(feature = "http")]
mod http {
    use super::{GraphqlRequest, GraphqlTransport};
    use crate::context::RunContext;
    use crate::rest::{RestRequest, RestResponse, RestTransport};
    use crate::result::{SalonError, SalonResult};
    use async_trait::async_trait;
    use serde_json::Value;
    use tracing::debug;

    /// Gateway transport over `reqwest`, for GraphQL and REST calls
    #[derive(Debug, Clone)]
    pub struct HttpTransport {
        client: reqwest::Client,
        ctx: RunContext,
    }

    impl HttpTransport {
        /// Build a transport with the context's `API_CALL` timeout
        pub fn new(ctx: RunContext) -> SalonResult<Self> {
            let client = reqwest::Client::builder()
                .timeout(ctx.timeouts().get("API_CALL"))
                .build()
                .map_err(|e| SalonError::config(format!("HTTP client: {e}")))?;
            Ok(Self { client, ctx })
        }

        /// Use a preconfigured client
        pub fn with_client(ctx: RunContext, client: reqwest::Client) -> Self {
            Self { client, ctx }
        }

        /// Run context
        pub const fn context(&self) -> &RunContext {
            &self.ctx
        }
    }

    #[async_trait]
    impl GraphqlTransport for HttpTransport {
        async fn execute(&self, request: &GraphqlRequest) -> SalonResult<Value> {
            let url = self.ctx.env().graphql_url();
            let operation = request.operation_name.as_str();
            debug!(%url, operation, "POST");

            let mut builder = self.client.post(&url).json(request);
            for (name, value) in self.ctx.graphql_headers() {
                builder = builder.header(name, value);
            }

            let transport = |e: reqwest::Error| SalonError::Transport {
                operation: operation.to_string(),
                message: e.to_string(),
            };

            let response = builder.send().await.map_err(transport)?;
            let status = response.status();
            debug!(operation, status = status.as_u16(), "response");

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(SalonError::http(operation, status.as_u16(), &body));
            }
            response.json::<Value>().await.map_err(transport)
        }
    }

    #[async_trait]
    impl RestTransport for HttpTransport {
        async fn send(&self, request: &RestRequest) -> SalonResult<RestResponse> {
            let operation = request.operation.as_str();
            debug!(url = %request.url, operation, "POST");

            let body = serde_json::to_vec(&request.body)?;
            let mut builder = self.client.post(&request.url).body(body);
            for (name, value) in self.ctx.rest_headers(request.content_type, request.accept) {
                builder = builder.header(name, value);
            }

            let transport = |e: reqwest::Error| SalonError::Transport {
                operation: operation.to_string(),
                message: e.to_string(),
            };

            let response = builder.send().await.map_err(transport)?;
            let status = response.status().as_u16();
            let trace_id = response
                .headers()
                .get("x-phorest-trace-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("N/A")
                .to_string();
            debug!(operation, status, trace_id = %trace_id, "response");

            let text = response.text().await.map_err(transport)?;
            let body = if text.trim().is_empty() {
                Value::Null
            } else {
                serde_json::from_str(&text).unwrap_or(Value::String(text))
            };
            Ok(RestResponse::new(status, body))
        }
    }
}

// =============================================================================
// MOCK TRANSPORT
// =============================================================================

type Handler = Box<dyn Fn(&GraphqlRequest) -> SalonResult<Value> + Send + Sync>;

/// Transport answering from a closure and recording every request
pub struct MockTransport {
    handler: Handler,
    requests: Mutex<Vec<GraphqlRequest>>,
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("requests", &self.request_count())
            .finish_non_exhaustive()
    }
}

impl MockTransport {
    /// Answer every request with `handler`
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&GraphqlRequest) -> SalonResult<Value> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far
    #[must_use]
    pub fn requests(&self) -> Vec<GraphqlRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Number of requests received so far
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }

    /// Operation names in the order they were received
    #[must_use]
    pub fn operations(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .map(|r| r.operation_name)
            .collect()
    }
}

#[async_trait]
impl GraphqlTransport for MockTransport {
    async fn execute(&self, request: &GraphqlRequest) -> SalonResult<Value> {
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
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Membership {
        id: String,
        status: String,
    }

    #[test]
    fn test_request_serializes_camel_case() {
        let req = GraphqlRequest::new("Courses", "query Courses { x }", json!({"first": 100}));
        let body = serde_json::to_value(&req).unwrap();
        assert_eq!(body["operationName"], "Courses");
        assert_eq!(body["variables"]["first"], 100);
        assert_eq!(body["query"], "query Courses { x }");
    }

    #[test]
    fn test_decode_ok() {
        let envelope = json!({"data": {"membership": {"id": "m1", "status": "ACTIVE"}}});
        let m: Membership = decode_envelope("Op", envelope, "membership").unwrap();
        assert_eq!(
            m,
            Membership {
                id: "m1".into(),
                status: "ACTIVE".into()
            }
        );
    }

    #[test]
    fn test_decode_errors_array() {
        let envelope = json!({"errors": [{"message": "Not authorised"}], "data": null});
        let err = decode_envelope::<Membership>("Op", envelope, "membership").unwrap_err();
        match err {
            SalonError::GraphQl { operation, messages } => {
                assert_eq!(operation, "Op");
                assert_eq!(messages, vec!["Not authorised".to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_decode_empty_errors_array_is_fine() {
        let envelope = json!({"errors": [], "data": {"membership": {"id": "m", "status": "S"}}});
        assert!(decode_envelope::<Membership>("Op", envelope, "membership").is_ok());
    }

    #[test]
    fn test_decode_missing_field() {
        let envelope = json!({"data": {}});
        let err = decode_envelope::<Membership>("Op", envelope, "membership").unwrap_err();
        assert!(matches!(err, SalonError::MissingField { ref path, .. } if path == "data.membership"));
    }

    #[test]
    fn test_decode_null_field_is_missing() {
        let envelope = json!({"data": {"membership": null}});
        let err = decode_envelope::<Membership>("Op", envelope, "membership").unwrap_err();
        assert!(matches!(err, SalonError::MissingField { .. }));
    }

    #[test]
    fn test_decode_malformed_shape() {
        let envelope = json!({"data": {"membership": {"id": "m1"}}});
        let err = decode_envelope::<Membership>("Op", envelope, "membership").unwrap_err();
        match err {
            SalonError::MissingField { path, .. } => {
                assert!(path.starts_with("data.membership ("));
                assert!(path.contains("status"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_mock_transport_records() {
        let transport = MockTransport::new(|req| {
            Ok(json!({"data": {"echo": req.operation_name}}))
        });
        let req = GraphqlRequest::new("Echo", "query Echo { echo }", json!({}));
        let echoed: String = fetch_data(&transport, &req, "echo").await.unwrap();
        assert_eq!(echoed, "Echo");
        assert_eq!(transport.operations(), vec!["Echo".to_string()]);
    }
}
