//! Engine API client over HTTP JSON-RPC.
//!
//! Every request carries a freshly issued HS256 bearer token.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use shared_crypto::JwtSecret;
use shared_types::{
    ExecutionPayloadV1, ForkchoiceStateV1, ForkchoiceUpdatedResult, JsonRpcRequest,
    JsonRpcResponse, PayloadAttributesV1, PayloadId, PayloadStatusV1,
    ENGINE_FORKCHOICE_UPDATED_V1, ENGINE_GET_PAYLOAD_V1, ENGINE_NEW_PAYLOAD_V1,
};
use tracing::debug;

use crate::error::ClientError;
use crate::ports::EngineApi;

pub struct HttpEngineClient {
    http: reqwest::Client,
    url: String,
    secret: JwtSecret,
    request_id: AtomicU64,
}

impl HttpEngineClient {
    pub fn new(url: impl Into<String>, secret: JwtSecret, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: url.into(),
            secret,
            request_id: AtomicU64::new(1),
        })
    }

    async fn call<R: DeserializeOwned>(&self, method: &str, params: Value) -> Result<R, ClientError> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        let token = self
            .secret
            .issue_token()
            .map_err(|e| ClientError::Http(e.to_string()))?;

        let response = self
            .http
            .post(&self.url)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .json(&JsonRpcRequest::new(id, method, params))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let rpc: JsonRpcResponse = response.json().await?;
        if let Some(error) = rpc.error {
            return Err(ClientError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        let result = rpc
            .result
            .ok_or_else(|| ClientError::Decode(format!("{method}: response without result")))?;
        debug!(method, id, "Engine call completed");
        serde_json::from_value(result).map_err(|e| ClientError::Decode(format!("{method}: {e}")))
    }
}

#[async_trait]
impl EngineApi for HttpEngineClient {
    async fn new_payload(
        &self,
        payload: &ExecutionPayloadV1,
    ) -> Result<PayloadStatusV1, ClientError> {
        self.call(ENGINE_NEW_PAYLOAD_V1, json!([payload])).await
    }

    async fn forkchoice_updated(
        &self,
        state: ForkchoiceStateV1,
        attributes: Option<PayloadAttributesV1>,
    ) -> Result<ForkchoiceUpdatedResult, ClientError> {
        self.call(ENGINE_FORKCHOICE_UPDATED_V1, json!([state, attributes]))
            .await
    }

    async fn get_payload(&self, payload_id: PayloadId) -> Result<ExecutionPayloadV1, ClientError> {
        self.call(ENGINE_GET_PAYLOAD_V1, json!([payload_id])).await
    }
}
