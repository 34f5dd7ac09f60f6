//! RequestTransport port - one HTTP call against the control-plane API.
//!
//! The transport itself lives outside this crate. Tasks own timeout policy:
//! a request carries its own timeout, and `ApiCallTask` enforces it.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::NetworkError;

/// Timeout applied to requests unless the caller opts out.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Delete,
}

/// A single control-plane request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<serde_json::Value>,

    /// `None` disables the timeout (long-running singleton requests such as
    /// device registration).
    pub timeout: Option<Duration>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            timeout: Some(DEFAULT_REQUEST_TIMEOUT),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        let mut request = Self::new(Method::Post, path);
        request.body = Some(body);
        request
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn without_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

impl ApiResponse {
    pub fn ok(body: serde_json::Value) -> Self {
        Self { status: 200, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs one request and resolves once it has a response or failed.
///
/// Any status code is returned as `Ok`; interpreting it is up to the task.
#[async_trait]
pub trait RequestTransport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, NetworkError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn requests_default_to_a_timeout() {
        let request = ApiRequest::get("/api/v1/vpn/account");
        assert_eq!(request.timeout, Some(DEFAULT_REQUEST_TIMEOUT));
        assert!(request.body.is_none());

        let request = request.without_timeout();
        assert_eq!(request.timeout, None);
    }

    #[test]
    fn post_carries_body() {
        let request = ApiRequest::post("/api/v1/vpn/device", serde_json::json!({"name": "laptop"}));
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.body, Some(serde_json::json!({"name": "laptop"})));
    }

    #[rstest]
    #[case(200, true)]
    #[case(204, true)]
    #[case(299, true)]
    #[case(301, false)]
    #[case(401, false)]
    #[case(503, false)]
    fn success_status_range(#[case] status: u16, #[case] expected: bool) {
        let response = ApiResponse {
            status,
            body: serde_json::Value::Null,
        };
        assert_eq!(response.is_success(), expected);
    }
}
