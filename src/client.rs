//! # Integration Client
//!
//! Typed wrappers around the integration service's HTTP endpoints. Each
//! method issues exactly one request and either decodes the JSON body or
//! propagates a [`TransportError`]; every failure is logged with the
//! operation name and target identifier before it leaves this module.
//!
//! The client never retries and configures no request timeout: a hung call
//! stays in flight until the backend answers or the connection drops, and the
//! owning flow keeps its submitting state for that long.

use std::collections::HashMap;

use metrics::counter;
use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};
use url::Url;

use crate::error::TransportError;
use crate::models::{Adapter, Connection, RegistrationReceipt, WebhookEvent, WebhookRegistration};

/// Client for the integration service.
#[derive(Debug, Clone)]
pub struct IntegrationClient {
    http: reqwest::Client,
    /// Base URL with any trailing slash trimmed
    base: String,
    api_token: Option<String>,
}

impl IntegrationClient {
    /// Build a client for the service rooted at `base_url`. When a token is
    /// provided it is attached as a bearer `Authorization` header on every
    /// call.
    pub fn new(base_url: Url, api_token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: base_url.as_str().trim_end_matches('/').to_string(),
            api_token,
        }
    }

    /// GET /adapters: the catalog of connectable systems.
    pub async fn list_adapters(&self) -> Result<Vec<Adapter>, TransportError> {
        let url = format!("{}/adapters", self.base);
        self.execute("list_adapters", "adapters", self.request(Method::GET, url))
            .await
    }

    /// GET /connections: every connection currently known to the backend.
    pub async fn list_connections(&self) -> Result<Vec<Connection>, TransportError> {
        let url = format!("{}/connections", self.base);
        self.execute(
            "list_connections",
            "connections",
            self.request(Method::GET, url),
        )
        .await
    }

    /// POST /connect/{system}: establish a connection using the entered
    /// credential map. Credential values travel only in the request body and
    /// are never logged.
    pub async fn connect(
        &self,
        system: &str,
        credentials: &HashMap<String, String>,
    ) -> Result<Connection, TransportError> {
        let url = format!("{}/connect/{}", self.base, system);
        self.execute(
            "connect",
            system,
            self.request(Method::POST, url).json(credentials),
        )
        .await
    }

    /// POST /disconnect/{connectionId}: tear down a connection. The body of
    /// the acknowledgement is opaque.
    pub async fn disconnect(&self, connection_id: &str) -> Result<Value, TransportError> {
        let url = format!("{}/disconnect/{}", self.base, connection_id);
        self.execute("disconnect", connection_id, self.request(Method::POST, url))
            .await
    }

    /// POST /send/{system}/{endpoint}: forward a payload to an adapter
    /// endpoint. The response body is returned as-is for the caller to
    /// interpret.
    pub async fn send<B>(
        &self,
        system: &str,
        endpoint: &str,
        data: &B,
    ) -> Result<Value, TransportError>
    where
        B: Serialize + ?Sized,
    {
        let url = format!("{}/send/{}/{}", self.base, system, endpoint);
        let target = format!("{}/{}", system, endpoint);
        self.execute("send", &target, self.request(Method::POST, url).json(data))
            .await
    }

    /// GET /webhooks: the current snapshot of captured webhook events.
    pub async fn list_webhooks(&self) -> Result<Vec<WebhookEvent>, TransportError> {
        let url = format!("{}/webhooks", self.base);
        self.execute("list_webhooks", "webhooks", self.request(Method::GET, url))
            .await
    }

    /// POST /webhooks/register: register an inbound webhook route.
    pub async fn register_webhook(
        &self,
        registration: &WebhookRegistration,
    ) -> Result<RegistrationReceipt, TransportError> {
        let url = format!("{}/webhooks/register", self.base);
        self.execute(
            "register_webhook",
            &registration.path,
            self.request(Method::POST, url).json(registration),
        )
        .await
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        let mut builder = self.http.request(method, url);
        if let Some(token) = &self.api_token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        builder
    }

    /// Send one request and decode the success body, classifying anything
    /// else into a [`TransportError`]. A structured `message` field in a
    /// non-success body is captured so callers can surface the backend's own
    /// wording.
    async fn execute<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        target: &str,
        builder: RequestBuilder,
    ) -> Result<T, TransportError> {
        counter!("integration_requests_total", "operation" => operation).increment(1);
        debug!(operation, target, "integration request");

        let response = match builder.send().await {
            Ok(response) => response,
            Err(source) => {
                return Err(self.fail(TransportError::Request { operation, source }, target));
            }
        };

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            let message = extract_error_message(&body);
            return Err(self.fail(
                TransportError::Status {
                    operation,
                    status,
                    message,
                },
                target,
            ));
        }

        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(source) => {
                return Err(self.fail(TransportError::Request { operation, source }, target));
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(decoded) => Ok(decoded),
            Err(source) => Err(self.fail(TransportError::Decode { operation, source }, target)),
        }
    }

    fn fail(&self, error: TransportError, target: &str) -> TransportError {
        counter!("integration_request_failures_total", "operation" => error.operation())
            .increment(1);
        error!(
            operation = error.operation(),
            target,
            error = %error,
            "integration request failed"
        );
        error
    }
}

/// Pull the `message` field out of a structured error body, if there is one.
fn extract_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let message = value.get("message")?.as_str()?.trim();
    if message.is_empty() {
        None
    } else {
        Some(message.to_string())
    }
}
