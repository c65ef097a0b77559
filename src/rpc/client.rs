use crate::config::Config;
use crate::feed::{ConfigEntry, FeedItem};
use crate::rpc::api::{AppendRequest, RemoteApi, RpcError};
use crate::util::validate_server_url;
use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use url::Url;

const MAX_RETRIES: u32 = 3;
const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024; // 10MB
const RETRY_BASE_DELAY_MS: u64 = 250;

#[derive(Serialize)]
struct RpcRequest<'a> {
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcFault {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcFault>,
}

/// JSON-RPC client for the download server.
///
/// Every call is a `POST {server_url}/jsonrpc` with `{"method", "params"}`.
/// Read-only methods are retried on transient failures with exponential
/// backoff; `appendurl` is never retried, since a lost acknowledgement does
/// not mean the item was not enqueued.
pub struct JsonRpcClient {
    http: reqwest::Client,
    endpoint: Url,
    username: Option<String>,
    password: Option<SecretString>,
    timeout: Duration,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(config: &Config) -> Result<Self, RpcError> {
        let mut base = validate_server_url(&config.server_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base
            .join("jsonrpc")
            .map_err(|e| RpcError::InvalidUrl(e.into()))?;

        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(2)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;

        tracing::debug!(endpoint = %endpoint, "JSON-RPC client ready");

        Ok(Self {
            http,
            endpoint,
            username: config.username.clone(),
            password: config.password.clone().map(SecretString::from),
            timeout: Duration::from_secs(config.request_timeout_secs.max(1)),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &'static str,
        params: Value,
        idempotent: bool,
    ) -> Result<T, RpcError> {
        let mut retry_count = 0;
        loop {
            match self.call_once(method, &params).await {
                Err(e) if idempotent && e.is_retryable() && retry_count < MAX_RETRIES => {
                    let delay_ms = RETRY_BASE_DELAY_MS * 2u64.pow(retry_count);
                    tracing::warn!(
                        method,
                        error = %e,
                        retry = retry_count,
                        delay_ms,
                        "RPC call failed, retrying after delay"
                    );
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    retry_count += 1;
                }
                other => return other,
            }
        }
    }

    async fn call_once<T: DeserializeOwned>(
        &self,
        method: &'static str,
        params: &Value,
    ) -> Result<T, RpcError> {
        let body = RpcRequest {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params: params.clone(),
        };

        let mut request = self.http.post(self.endpoint.clone()).json(&body);
        if let Some(user) = &self.username {
            request = request.basic_auth(
                user,
                self.password.as_ref().map(|p| p.expose_secret().to_owned()),
            );
        }

        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| RpcError::Timeout)??;

        if !response.status().is_success() {
            return Err(RpcError::HttpStatus(response.status().as_u16()));
        }

        let bytes = read_limited_bytes(response, MAX_RESPONSE_SIZE).await?;
        let envelope: RpcResponse<T> = serde_json::from_slice(&bytes)?;

        if let Some(fault) = envelope.error {
            tracing::debug!(method, code = fault.code, message = %fault.message, "RPC fault");
            return Err(RpcError::Remote {
                code: fault.code,
                message: fault.message,
            });
        }

        match envelope.result {
            Some(result) => Ok(result),
            // `null` result is a valid answer only when T accepts it
            None => Ok(serde_json::from_value(Value::Null)?),
        }
    }
}

impl std::fmt::Debug for JsonRpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonRpcClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl RemoteApi for JsonRpcClient {
    async fn fetch_feeds(&self) -> Result<(), RpcError> {
        let _: Value = self.call("fetchfeeds", json!([]), false).await?;
        Ok(())
    }

    async fn view_feed(&self, id: u32) -> Result<Vec<FeedItem>, RpcError> {
        self.call("viewfeed", json!([id]), true).await
    }

    async fn preview_feed(
        &self,
        name: &str,
        url: &str,
        filter: &str,
    ) -> Result<Vec<FeedItem>, RpcError> {
        self.call("previewfeed", json!([name, url, filter]), true)
            .await
    }

    async fn append_url(&self, request: &AppendRequest) -> Result<bool, RpcError> {
        self.call(
            "appendurl",
            json!([
                request.name,
                request.category,
                request.priority,
                request.paused,
                request.url
            ]),
            false,
        )
        .await
    }

    async fn load_config(&self) -> Result<Vec<ConfigEntry>, RpcError> {
        self.call("config", json!([]), true).await
    }
}

async fn read_limited_bytes(response: reqwest::Response, limit: usize) -> Result<Vec<u8>, RpcError> {
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(RpcError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(RpcError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
