//! Builder relay client over the REST builder API.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use shared_types::{
    BlsPublicKeyBytes, ExecutionPayloadRest, ExecutionPayloadV1, Hash, SignedBlindedBeaconBlock,
    SignedBuilderBid, VersionedResponse,
};
use tracing::info;

use crate::error::ClientError;
use crate::ports::BuilderApi;

pub struct HttpBuilderClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpBuilderClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl BuilderApi for HttpBuilderClient {
    async fn get_header(
        &self,
        slot: u64,
        parent_hash: Hash,
        pubkey: BlsPublicKeyBytes,
    ) -> Result<SignedBuilderBid, ClientError> {
        let url = format!(
            "{}/eth/v1/builder/header/{slot}/{parent_hash:?}/{pubkey}",
            self.base_url
        );
        let response = self.http.get(&url).send().await?;
        let bid: VersionedResponse<SignedBuilderBid> = Self::decode(response).await?;
        info!(
            slot,
            block_hash = ?bid.data.message.header.block_hash,
            version = %bid.version,
            "Received builder bid"
        );
        Ok(bid.data)
    }

    async fn get_payload(
        &self,
        block: &SignedBlindedBeaconBlock,
    ) -> Result<ExecutionPayloadV1, ClientError> {
        let url = format!("{}/eth/v1/builder/blinded_blocks", self.base_url);
        let response = self.http.post(&url).json(block).send().await?;
        let payload: VersionedResponse<ExecutionPayloadRest> = Self::decode(response).await?;
        info!(block_hash = ?payload.data.block_hash, "Received payload from builder");
        Ok(ExecutionPayloadV1::from(&payload.data))
    }
}
