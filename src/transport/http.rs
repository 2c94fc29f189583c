//! reqwest-backed transport.
//!
//! # Responsibilities
//! - Issue requests with a per-attempt deadline
//! - Present the configured `Origin` and enforce the response's
//!   `Access-Control-Allow-Origin`, the way a browser would
//! - Map reqwest failures onto [`TransportErrorKind`]

use std::collections::BTreeMap;
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use reqwest::header::{HeaderMap, ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE, ORIGIN};
use reqwest::Client;

use crate::client::types::{Method, RequestMode};
use crate::transport::{OutboundRequest, RawResponse, Transport, TransportError, TransportErrorKind};

/// Message reported when a response withholds access from our origin.
pub const CORS_DENIED_MESSAGE: &str =
    "CORS policy: No 'Access-Control-Allow-Origin' header is present on the requested resource";

/// HTTP transport with optional cross-origin enforcement.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    origin: Option<String>,
    timeout: Duration,
}

impl HttpTransport {
    /// Create a transport. `origin` enables cross-origin enforcement.
    pub fn new(timeout: Duration, origin: Option<String>) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::new(TransportErrorKind::Other, e.to_string()))?;
        Ok(Self {
            client,
            origin,
            timeout,
        })
    }

    /// A transport that presents no origin and never enforces CORS.
    pub fn without_origin(timeout: Duration) -> Result<Self, TransportError> {
        Self::new(timeout, None)
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    fn method(method: Method) -> reqwest::Method {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }

    fn map_error(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::new(
                TransportErrorKind::Timeout,
                format!("request timed out after {}s", self.timeout.as_secs()),
            )
        } else if err.is_connect() {
            TransportError::new(TransportErrorKind::Connect, format!("connection failed: {}", err))
        } else {
            TransportError::new(TransportErrorKind::Other, err.to_string())
        }
    }

    async fn execute(&self, request: OutboundRequest) -> Result<RawResponse, TransportError> {
        let enforce_origin = match (&self.origin, request.mode) {
            (Some(origin), RequestMode::Cors) => Some(origin.as_str()),
            _ => None,
        };

        let mut builder = self.client.request(Self::method(request.method), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(origin) = enforce_origin {
            builder = builder.header(ORIGIN, origin);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| self.map_error(e))?;

        if let Some(origin) = enforce_origin {
            let allowed = response
                .headers()
                .get(ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|v| v.to_str().ok())
                .map(|v| v == "*" || v.trim_end_matches('/') == origin.trim_end_matches('/'))
                .unwrap_or(false);
            if !allowed {
                return Err(TransportError::new(TransportErrorKind::OriginDenied, CORS_DENIED_MESSAGE));
            }
        }

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let headers = collect_headers(response.headers());
        let bytes = response.bytes().await.map_err(|e| self.map_error(e))?;

        Ok(RawResponse {
            status,
            content_type,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

fn collect_headers(map: &HeaderMap) -> BTreeMap<String, String> {
    let mut headers: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in map {
        let Ok(value) = value.to_str() else {
            continue;
        };
        headers
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    headers
}

impl Transport for HttpTransport {
    fn send(&self, request: OutboundRequest) -> BoxFuture<'_, Result<RawResponse, TransportError>> {
        self.execute(request).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_failure_is_classified() {
        // Port 9 (discard) is closed on test hosts.
        let transport = HttpTransport::without_origin(Duration::from_secs(2)).unwrap();
        let err = transport
            .send(OutboundRequest::new(Method::Get, "http://127.0.0.1:9/"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, TransportErrorKind::Connect);
    }

    #[tokio::test]
    async fn test_response_headers_are_kept() {
        let addr = crate::testing::serve_raw(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nX-Trace: abc\r\n\
             Vary: Origin\r\nVary: Accept\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{}",
        )
        .await;
        let transport = HttpTransport::without_origin(Duration::from_secs(2)).unwrap();

        let raw = transport
            .send(OutboundRequest::new(Method::Get, format!("http://{}/items", addr)))
            .await
            .unwrap();

        assert_eq!(raw.status, 200);
        assert_eq!(raw.content_type.as_deref(), Some("application/json"));
        assert_eq!(raw.headers.get("x-trace").map(String::as_str), Some("abc"));
        assert_eq!(raw.headers.get("vary").map(String::as_str), Some("Origin, Accept"));
        assert_eq!(raw.body, "{}");
    }

    #[tokio::test]
    async fn test_missing_allow_origin_is_denied() {
        let addr = crate::testing::serve_raw(
            "HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok",
        )
        .await;
        let transport = HttpTransport::new(Duration::from_secs(2), Some("https://app.example.org".into())).unwrap();

        let err = transport
            .send(OutboundRequest::new(Method::Get, format!("http://{}/", addr)))
            .await
            .unwrap_err();
        assert_eq!(err.kind, TransportErrorKind::OriginDenied);
    }

    #[test]
    fn test_origin_accessor() {
        let transport =
            HttpTransport::new(Duration::from_secs(1), Some("https://app.example.org".into())).unwrap();
        assert_eq!(transport.origin(), Some("https://app.example.org"));
    }
}
