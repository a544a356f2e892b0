//! # Mock Execution Engine
//!
//! A minimal engine API served next to the relay and backed by an in-memory
//! chain. A forkchoice update with payload attributes builds a payload on the
//! new head and publishes it to the relay's cache under its parent hash, which
//! is where get-header looks for it.

pub mod auth;
pub mod rpc;

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use lru::LruCache;
use mm_02_mock_chain::{BlockTemplate, ChainError, MockChain};
use parking_lot::Mutex;
use shared_types::{
    CachedPayload, ExecutionPayloadV1, ExecutionStatus, ForkchoiceStateV1,
    ForkchoiceUpdatedResult, HexBytes, JsonRpcError, PayloadAttributesV1, PayloadId,
    PayloadStatusV1,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::PayloadCache;

pub use auth::JwtVerifier;
pub use rpc::engine_router;

const ENGINE_EXTRA_DATA: &[u8] = b"mergemock";
const BUILT_PAYLOADS: usize = 10;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown payload {0}")]
    UnknownPayload(PayloadId),

    #[error("invalid payload attributes: {0}")]
    InvalidAttributes(String),
}

impl EngineError {
    pub fn code(&self) -> i64 {
        match self {
            Self::UnknownPayload(_) => JsonRpcError::UNKNOWN_PAYLOAD,
            Self::InvalidAttributes(_) => JsonRpcError::INVALID_PARAMS,
        }
    }
}

pub struct MockEngine {
    chain: Arc<Mutex<MockChain>>,
    cache: Arc<PayloadCache>,
    built: Mutex<LruCache<PayloadId, ExecutionPayloadV1>>,
    next_id: AtomicU64,
}

impl MockEngine {
    pub fn new(chain: MockChain, cache: Arc<PayloadCache>) -> Self {
        Self {
            chain: Arc::new(Mutex::new(chain)),
            cache,
            built: Mutex::new(LruCache::new(
                NonZeroUsize::new(BUILT_PAYLOADS).unwrap_or(NonZeroUsize::MIN),
            )),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn chain(&self) -> &Arc<Mutex<MockChain>> {
        &self.chain
    }

    pub fn new_payload(&self, payload: &ExecutionPayloadV1) -> PayloadStatusV1 {
        let result = self.chain.lock().insert_payload(payload);
        let status = match result {
            Ok(block) => PayloadStatusV1::valid(block.hash()),
            Err(ChainError::BlockHashMismatch { declared, computed }) => PayloadStatusV1::rejected(
                ExecutionStatus::InvalidBlockHash,
                format!("declared {declared:?}, computed {computed:?}"),
            ),
            Err(ChainError::UnknownParent(_)) => PayloadStatusV1 {
                status: ExecutionStatus::Syncing,
                latest_valid_hash: None,
                validation_error: None,
            },
            Err(err) => PayloadStatusV1 {
                latest_valid_hash: Some(payload.parent_hash),
                ..PayloadStatusV1::rejected(ExecutionStatus::Invalid, err.to_string())
            },
        };
        debug!(
            block_hash = ?payload.block_hash,
            number = payload.block_number,
            status = %status.status,
            "newPayload"
        );
        status
    }

    pub fn forkchoice_updated(
        &self,
        state: &ForkchoiceStateV1,
        attributes: Option<&PayloadAttributesV1>,
    ) -> Result<ForkchoiceUpdatedResult, EngineError> {
        let head = state.head_block_hash;
        let mut chain = self.chain.lock();
        if chain.set_head(head).is_err() {
            warn!(head = ?head, "Forkchoice head unknown, syncing");
            return Ok(ForkchoiceUpdatedResult {
                payload_status: PayloadStatusV1 {
                    status: ExecutionStatus::Syncing,
                    latest_valid_hash: None,
                    validation_error: None,
                },
                payload_id: None,
            });
        }

        let payload_id = match attributes {
            None => None,
            Some(attributes) => {
                let head_header = chain.current_header();
                if attributes.timestamp < head_header.timestamp {
                    return Err(EngineError::InvalidAttributes(format!(
                        "timestamp {} before head timestamp {}",
                        attributes.timestamp, head_header.timestamp
                    )));
                }
                let template = BlockTemplate {
                    coinbase: attributes.suggested_fee_recipient,
                    timestamp: attributes.timestamp,
                    gas_limit: head_header.gas_limit,
                    extra_data: HexBytes(ENGINE_EXTRA_DATA.to_vec()),
                    mix_hash: attributes.prev_randao,
                    transactions: vec![],
                };
                let block = chain
                    .build_block(head, template)
                    .map_err(|e| EngineError::InvalidAttributes(e.to_string()))?;
                let payload = block.to_payload();

                let id = PayloadId(self.next_id.fetch_add(1, Ordering::Relaxed).to_be_bytes());
                info!(
                    payload_id = %id,
                    parent_hash = ?head,
                    block_hash = ?payload.block_hash,
                    timestamp = payload.timestamp,
                    "Built payload"
                );
                self.cache.put(head, CachedPayload::Engine(payload.clone()));
                self.built.lock().put(id, payload);
                Some(id)
            }
        };

        Ok(ForkchoiceUpdatedResult {
            payload_status: PayloadStatusV1::valid(head),
            payload_id,
        })
    }

    pub fn get_payload(&self, id: &PayloadId) -> Result<ExecutionPayloadV1, EngineError> {
        self.built
            .lock()
            .get(id)
            .cloned()
            .ok_or(EngineError::UnknownPayload(*id))
    }

    /// Persist the chain snapshot, if any.
    pub fn close(&self) -> Result<(), ChainError> {
        self.chain.lock().close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mm_02_mock_chain::GenesisSpec;
    use shared_types::{Address, Hash};

    fn engine() -> MockEngine {
        MockEngine::new(
            MockChain::new(GenesisSpec::default()),
            Arc::new(PayloadCache::default()),
        )
    }

    fn attributes(timestamp: u64) -> PayloadAttributesV1 {
        PayloadAttributesV1 {
            timestamp,
            prev_randao: Hash::repeat_byte(7),
            suggested_fee_recipient: Address::from_low_u64_be(0x1337),
        }
    }

    fn forkchoice(head: Hash) -> ForkchoiceStateV1 {
        ForkchoiceStateV1 {
            head_block_hash: head,
            safe_block_hash: head,
            finalized_block_hash: Hash::zero(),
        }
    }

    #[test]
    fn test_attributes_publish_payload_under_parent_hash() {
        let engine = engine();
        let genesis = engine.chain().lock().head_hash();

        let result = engine
            .forkchoice_updated(&forkchoice(genesis), Some(&attributes(12)))
            .unwrap();
        assert_eq!(result.payload_status.status, ExecutionStatus::Valid);
        let id = result.payload_id.unwrap();

        let payload = engine.get_payload(&id).unwrap();
        assert_eq!(payload.parent_hash, genesis);
        assert_eq!(payload.timestamp, 12);
        assert_eq!(payload.prev_randao, Hash::repeat_byte(7));
        assert_eq!(
            engine.cache.get(&genesis),
            Some(CachedPayload::Engine(payload))
        );
    }

    #[test]
    fn test_new_payload_statuses() {
        let engine = engine();
        let genesis = engine.chain().lock().head_hash();
        let id = engine
            .forkchoice_updated(&forkchoice(genesis), Some(&attributes(12)))
            .unwrap()
            .payload_id
            .unwrap();
        let payload = engine.get_payload(&id).unwrap();

        assert_eq!(engine.new_payload(&payload).status, ExecutionStatus::Valid);

        let mut bad_hash = payload.clone();
        bad_hash.block_hash = Hash::from_low_u64_be(0xdeadbeef);
        assert_eq!(
            engine.new_payload(&bad_hash).status,
            ExecutionStatus::InvalidBlockHash
        );

        let mut orphan = payload;
        orphan.parent_hash = Hash::repeat_byte(0x55);
        let status = engine.new_payload(&orphan);
        assert!(matches!(
            status.status,
            ExecutionStatus::Syncing | ExecutionStatus::InvalidBlockHash
        ));
    }

    #[test]
    fn test_unknown_head_is_syncing() {
        let engine = engine();
        let result = engine
            .forkchoice_updated(&forkchoice(Hash::repeat_byte(3)), None)
            .unwrap();
        assert_eq!(result.payload_status.status, ExecutionStatus::Syncing);
        assert!(result.payload_id.is_none());
    }

    #[test]
    fn test_unknown_payload_id() {
        let err = engine().get_payload(&PayloadId([9; 8])).unwrap_err();
        assert_eq!(err.code(), JsonRpcError::UNKNOWN_PAYLOAD);
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let engine = MockEngine::new(
            MockChain::new(GenesisSpec {
                timestamp: 100,
                ..GenesisSpec::default()
            }),
            Arc::new(PayloadCache::default()),
        );
        let genesis = engine.chain().lock().head_hash();
        let err = engine
            .forkchoice_updated(&forkchoice(genesis), Some(&attributes(99)))
            .unwrap_err();
        assert_eq!(err.code(), JsonRpcError::INVALID_PARAMS);
    }
}
