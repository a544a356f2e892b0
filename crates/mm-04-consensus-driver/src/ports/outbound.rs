//! Outbound ports (driven side - SPI)

use std::sync::Arc;

use async_trait::async_trait;
use mm_02_mock_chain::{Block, BlockTemplate, ChainError, Header};
use parking_lot::Mutex;
use shared_types::{
    Address, BlsPublicKeyBytes, ExecutionPayloadV1, ForkchoiceStateV1, ForkchoiceUpdatedResult,
    Hash, PayloadAttributesV1, PayloadId, PayloadStatusV1, SignedBlindedBeaconBlock,
    SignedBuilderBid, U256,
};

use crate::error::ClientError;

/// Port: execution engine API (V1)
#[async_trait]
pub trait EngineApi: Send + Sync {
    async fn new_payload(&self, payload: &ExecutionPayloadV1)
        -> Result<PayloadStatusV1, ClientError>;

    async fn forkchoice_updated(
        &self,
        state: ForkchoiceStateV1,
        attributes: Option<PayloadAttributesV1>,
    ) -> Result<ForkchoiceUpdatedResult, ClientError>;

    async fn get_payload(&self, payload_id: PayloadId) -> Result<ExecutionPayloadV1, ClientError>;
}

/// Port: builder relay, consumed as a proposer
#[async_trait]
pub trait BuilderApi: Send + Sync {
    async fn get_header(
        &self,
        slot: u64,
        parent_hash: Hash,
        pubkey: BlsPublicKeyBytes,
    ) -> Result<SignedBuilderBid, ClientError>;

    async fn get_payload(
        &self,
        block: &SignedBlindedBeaconBlock,
    ) -> Result<ExecutionPayloadV1, ClientError>;
}

/// Port: the local execution chain
///
/// Headers are returned by value; callers hold the chain lock only for the
/// duration of one call.
pub trait ChainBackend: Send {
    fn chain_id(&self) -> u64;

    fn current_header(&self) -> Header;

    fn current_td(&self) -> U256;

    fn terminal_total_difficulty(&self) -> U256;

    fn header_by_hash(&self, hash: &Hash) -> Option<Header>;

    /// Canonical header at `number`.
    fn header_by_number(&self, number: u64) -> Option<Header>;

    fn nonce_at(&self, at: &Hash, address: &Address) -> Result<u64, ChainError>;

    /// Build on `parent`, import, and make the block the head.
    fn mine_block(&mut self, parent: Hash, template: BlockTemplate) -> Result<Block, ChainError>;

    /// Import an externally built payload and make it the head.
    fn process_payload(&mut self, payload: &ExecutionPayloadV1) -> Result<Block, ChainError>;

    fn close(&self) -> Result<(), ChainError>;
}

/// The local chain as shared between the slot loop and background steps.
pub type SharedChain = Arc<Mutex<dyn ChainBackend>>;

/// Port: a pre-merge peer fed during the proof-of-work prologue
#[async_trait]
pub trait LegacyPeer: Send {
    /// Announce `block` with the chain's total difficulty after it.
    async fn announce_block(
        &mut self,
        block: &Block,
        total_difficulty: U256,
    ) -> Result<(), ClientError>;
}
