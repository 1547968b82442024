//! Device registration over the REST API

use async_trait::async_trait;
use kindred_common::{ApiConfig, ClientError, ClientResult};
use kindred_core::{
    AuthProvider, DeviceId, DeviceRegistration, DeviceRegistrationApi, DomainError, PortResult,
    RegisteredDevice,
};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UnregisterBody<'a> {
    device_id: &'a DeviceId,
    fcm_token: &'a str,
}

/// Server failures worth another attempt: network errors and 5xx
fn should_retry(error: &DomainError) -> bool {
    match error {
        DomainError::Network(_) => true,
        DomainError::Remote { status, .. } => *status >= 500,
        _ => false,
    }
}

/// Delay before attempt `attempt + 1`, doubling from `base`
fn retry_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(1 << attempt.saturating_sub(1).min(16))
}

fn status_error(status: StatusCode, body: &Value) -> DomainError {
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        return DomainError::Unauthorized;
    }
    let message = body
        .get("message")
        .or_else(|| body.get("error"))
        .and_then(Value::as_str)
        .map_or_else(
            || status.canonical_reason().unwrap_or("request failed").to_string(),
            str::to_string,
        );
    DomainError::Remote {
        status: status.as_u16(),
        message,
    }
}

fn network_error(error: &reqwest::Error) -> DomainError {
    DomainError::Network(error.to_string())
}

/// Accepts `{devices}`, `{data: {devices}}`, `{data: [...]}` or a bare array
fn parse_devices(body: Value) -> PortResult<Vec<RegisteredDevice>> {
    let list = match body {
        Value::Array(_) => body,
        Value::Object(mut map) => match map.remove("devices") {
            Some(devices) => devices,
            None => match map.remove("data") {
                Some(Value::Object(mut data)) => data.remove("devices").unwrap_or(Value::Null),
                Some(data @ Value::Array(_)) => data,
                _ => Value::Null,
            },
        },
        _ => Value::Null,
    };
    if list.is_null() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_value(list)?)
}

/// [`DeviceRegistrationApi`] backed by `reqwest`
///
/// Network errors and 5xx responses are retried with exponential delay; other failures
/// return immediately.
pub struct RestDeviceApi {
    http: Client,
    base_url: String,
    auth: Arc<dyn AuthProvider>,
    max_attempts: u32,
    retry_base_delay: Duration,
}

impl std::fmt::Debug for RestDeviceApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestDeviceApi")
            .field("base_url", &self.base_url)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl RestDeviceApi {
    /// # Errors
    /// Returns [`ClientError::Config`] if the HTTP client cannot be built
    pub fn new(config: &ApiConfig, auth: Arc<dyn AuthProvider>) -> ClientResult<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ClientError::Config(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth,
            max_attempts: config.max_attempts.max(1),
            retry_base_delay: config.retry_base_delay(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match self.auth.credential().await {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request and decode the JSON body; an empty body decodes to `Null`
    async fn execute(&self, request: RequestBuilder) -> PortResult<Value> {
        let response = request.send().await.map_err(|e| network_error(&e))?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| network_error(&e))?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        if status.is_success() {
            Ok(body)
        } else {
            Err(status_error(status, &body))
        }
    }

    async fn with_retry<F, Fut, T>(&self, operation: &str, mut call: F) -> PortResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = PortResult<T>>,
    {
        let mut attempt = 1;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if should_retry(&e) && attempt < self.max_attempts => {
                    let delay = retry_delay(self.retry_base_delay, attempt);
                    warn!(operation, attempt, delay = ?delay, error = %e, "Retrying device request");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl DeviceRegistrationApi for RestDeviceApi {
    async fn register(&self, registration: &DeviceRegistration) -> PortResult<()> {
        self.with_retry("register", || async move {
            let request = self
                .request(Method::POST, "/notifications/devices/register")
                .await
                .json(registration);
            self.execute(request).await
        })
        .await?;
        debug!(device_id = %registration.device_id, "Device registration accepted");
        Ok(())
    }

    async fn unregister(&self, device_id: &DeviceId, push_token: &str) -> PortResult<()> {
        let body = UnregisterBody {
            device_id,
            fcm_token: push_token,
        };
        let body = &body;
        self.with_retry("unregister", || async move {
            let request = self
                .request(Method::POST, "/notifications/devices/unregister")
                .await
                .json(body);
            self.execute(request).await
        })
        .await?;
        Ok(())
    }

    async fn list_devices(&self) -> PortResult<Vec<RegisteredDevice>> {
        let body = self
            .with_retry("list_devices", || async move {
                let request = self.request(Method::GET, "/notifications/devices").await;
                self.execute(request).await
            })
            .await?;
        parse_devices(body)
    }
}
