//! ApiCallTask - one control-plane request
//!
//! タイムアウトはスケジューラではなくタスク側の責任。リクエストに付いた
//! timeout をここで適用する。失敗しても必ず完了するので、キューは止まらない。

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{Task, TaskContext};
use crate::domain::DeletePolicy;
use crate::error::NetworkError;
use crate::ports::{ApiRequest, ApiResponse, ErrorSink, RequestTransport};

/// Called with the response of a successful request.
pub type SuccessCallback = Box<dyn FnOnce(ApiResponse) + Send>;

pub struct ApiCallTask {
    name: String,
    policy: DeletePolicy,
    request: ApiRequest,
    transport: Arc<dyn RequestTransport>,
    error_sink: Arc<dyn ErrorSink>,
    on_success: Option<SuccessCallback>,
}

impl ApiCallTask {
    pub fn new(
        name: impl Into<String>,
        request: ApiRequest,
        transport: Arc<dyn RequestTransport>,
        error_sink: Arc<dyn ErrorSink>,
    ) -> Self {
        Self {
            name: name.into(),
            policy: DeletePolicy::Deletable,
            request,
            transport,
            error_sink,
            on_success: None,
        }
    }

    pub fn with_policy(mut self, policy: DeletePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn on_success(mut self, callback: impl FnOnce(ApiResponse) + Send + 'static) -> Self {
        self.on_success = Some(Box::new(callback));
        self
    }

    pub fn request(&self) -> &ApiRequest {
        &self.request
    }
}

/// Send `request`, enforcing its timeout. Non-2xx is an error.
async fn call(
    transport: &dyn RequestTransport,
    request: ApiRequest,
) -> Result<ApiResponse, NetworkError> {
    let limit = request.timeout;
    let send = transport.send(request);
    let response = match limit {
        Some(limit) => tokio::time::timeout(limit, send)
            .await
            .map_err(|_| NetworkError::Timeout(limit))??,
        None => send.await?,
    };

    if !response.is_success() {
        return Err(NetworkError::Status(response.status));
    }
    Ok(response)
}

#[async_trait]
impl Task for ApiCallTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn delete_policy(&self) -> DeletePolicy {
        self.policy
    }

    async fn run(self: Box<Self>, _ctx: TaskContext) {
        let Self {
            name,
            request,
            transport,
            error_sink,
            on_success,
            ..
        } = *self;
        let path = request.path.clone();

        match call(transport.as_ref(), request).await {
            Ok(response) => {
                debug!(%path, status = response.status, "request succeeded");
                if let Some(callback) = on_success {
                    callback(response);
                }
            }
            Err(error) => error_sink.report(&name, &error),
        }
    }
}
