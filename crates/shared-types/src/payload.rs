//! # Execution Payload Renderings
//!
//! Three views of one block body:
//!
//! | Type | Wire | Used by |
//! |------|------|---------|
//! | [`ExecutionPayloadV1`] | camelCase, hex quantities | engine API |
//! | [`ExecutionPayloadRest`] | snake_case, decimal strings | builder REST API |
//! | [`ExecutionPayloadHeader`] | as REST, transactions replaced by their root | bids, blinded blocks |
//!
//! Engine form → REST form is checked (bloom and extra-data lengths); REST form
//! → engine form is total. The header is derived from the REST form.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use thiserror::Error;

use crate::commitment::{
    byte_list_root, bytes_root, container_root, transactions_root, uint256_root, uint64_root,
    CommitmentError, HashTreeRoot, Root, MAX_EXTRA_DATA_BYTES,
};
use crate::primitives::{dec_u256, quantity, Address, Bloom, Hash, HexBytes, U256};

/// Malformed input while converting between payload renderings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadConversionError {
    #[error("logs bloom must be 256 bytes, got {0}")]
    LogsBloomLength(usize),

    #[error("extra data must be at most 32 bytes, got {0}")]
    ExtraDataTooLong(usize),

    #[error("cannot commit to payload: {0}")]
    Commitment(#[from] CommitmentError),
}

/// Engine API `ExecutionPayloadV1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionPayloadV1 {
    pub parent_hash: Hash,
    pub fee_recipient: Address,
    pub state_root: Hash,
    pub receipts_root: Hash,
    pub logs_bloom: HexBytes,
    pub prev_randao: Hash,
    #[serde(with = "quantity")]
    pub block_number: u64,
    #[serde(with = "quantity")]
    pub gas_limit: u64,
    #[serde(with = "quantity")]
    pub gas_used: u64,
    #[serde(with = "quantity")]
    pub timestamp: u64,
    pub extra_data: HexBytes,
    pub base_fee_per_gas: U256,
    pub block_hash: Hash,
    pub transactions: Vec<HexBytes>,
}

/// Builder API execution payload.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPayloadRest {
    pub parent_hash: Hash,
    pub fee_recipient: Address,
    pub state_root: Hash,
    pub receipts_root: Hash,
    pub logs_bloom: Bloom,
    pub prev_randao: Hash,
    #[serde_as(as = "DisplayFromStr")]
    pub block_number: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub gas_limit: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub gas_used: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub timestamp: u64,
    pub extra_data: HexBytes,
    #[serde(with = "dec_u256")]
    pub base_fee_per_gas: U256,
    pub block_hash: Hash,
    pub transactions: Vec<HexBytes>,
}

/// Commitment-level summary of a payload.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPayloadHeader {
    pub parent_hash: Hash,
    pub fee_recipient: Address,
    pub state_root: Hash,
    pub receipts_root: Hash,
    pub logs_bloom: Bloom,
    pub prev_randao: Hash,
    #[serde_as(as = "DisplayFromStr")]
    pub block_number: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub gas_limit: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub gas_used: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub timestamp: u64,
    pub extra_data: HexBytes,
    #[serde(with = "dec_u256")]
    pub base_fee_per_gas: U256,
    pub block_hash: Hash,
    pub transactions_root: Hash,
}

impl Default for ExecutionPayloadHeader {
    fn default() -> Self {
        Self {
            parent_hash: Hash::zero(),
            fee_recipient: Address::zero(),
            state_root: Hash::zero(),
            receipts_root: Hash::zero(),
            logs_bloom: Bloom::default(),
            prev_randao: Hash::zero(),
            block_number: 0,
            gas_limit: 0,
            gas_used: 0,
            timestamp: 0,
            extra_data: HexBytes::default(),
            base_fee_per_gas: U256::zero(),
            block_hash: Hash::zero(),
            transactions_root: Hash::zero(),
        }
    }
}

impl TryFrom<&ExecutionPayloadV1> for ExecutionPayloadRest {
    type Error = PayloadConversionError;

    fn try_from(payload: &ExecutionPayloadV1) -> Result<Self, Self::Error> {
        let logs_bloom = Bloom::from_slice(payload.logs_bloom.as_slice())
            .ok_or(PayloadConversionError::LogsBloomLength(payload.logs_bloom.len()))?;
        if payload.extra_data.len() > MAX_EXTRA_DATA_BYTES {
            return Err(PayloadConversionError::ExtraDataTooLong(
                payload.extra_data.len(),
            ));
        }
        Ok(Self {
            parent_hash: payload.parent_hash,
            fee_recipient: payload.fee_recipient,
            state_root: payload.state_root,
            receipts_root: payload.receipts_root,
            logs_bloom,
            prev_randao: payload.prev_randao,
            block_number: payload.block_number,
            gas_limit: payload.gas_limit,
            gas_used: payload.gas_used,
            timestamp: payload.timestamp,
            extra_data: payload.extra_data.clone(),
            base_fee_per_gas: payload.base_fee_per_gas,
            block_hash: payload.block_hash,
            transactions: payload.transactions.clone(),
        })
    }
}

impl From<&ExecutionPayloadRest> for ExecutionPayloadV1 {
    fn from(payload: &ExecutionPayloadRest) -> Self {
        Self {
            parent_hash: payload.parent_hash,
            fee_recipient: payload.fee_recipient,
            state_root: payload.state_root,
            receipts_root: payload.receipts_root,
            logs_bloom: HexBytes(payload.logs_bloom.0.to_vec()),
            prev_randao: payload.prev_randao,
            block_number: payload.block_number,
            gas_limit: payload.gas_limit,
            gas_used: payload.gas_used,
            timestamp: payload.timestamp,
            extra_data: payload.extra_data.clone(),
            base_fee_per_gas: payload.base_fee_per_gas,
            block_hash: payload.block_hash,
            transactions: payload.transactions.clone(),
        }
    }
}

impl ExecutionPayloadRest {
    /// Derives the header, committing to the transaction list.
    pub fn to_header(&self) -> Result<ExecutionPayloadHeader, PayloadConversionError> {
        let transactions_root = transactions_root(&self.transactions)?;
        Ok(ExecutionPayloadHeader {
            parent_hash: self.parent_hash,
            fee_recipient: self.fee_recipient,
            state_root: self.state_root,
            receipts_root: self.receipts_root,
            logs_bloom: self.logs_bloom,
            prev_randao: self.prev_randao,
            block_number: self.block_number,
            gas_limit: self.gas_limit,
            gas_used: self.gas_used,
            timestamp: self.timestamp,
            extra_data: self.extra_data.clone(),
            base_fee_per_gas: self.base_fee_per_gas,
            block_hash: self.block_hash,
            transactions_root: Hash::from(transactions_root),
        })
    }
}

impl HashTreeRoot for ExecutionPayloadHeader {
    fn hash_tree_root(&self) -> Result<Root, CommitmentError> {
        Ok(container_root(&[
            bytes_root(self.parent_hash.as_bytes()),
            bytes_root(self.fee_recipient.as_bytes()),
            bytes_root(self.state_root.as_bytes()),
            bytes_root(self.receipts_root.as_bytes()),
            bytes_root(self.logs_bloom.as_bytes()),
            bytes_root(self.prev_randao.as_bytes()),
            uint64_root(self.block_number),
            uint64_root(self.gas_limit),
            uint64_root(self.gas_used),
            uint64_root(self.timestamp),
            byte_list_root("extra_data", self.extra_data.as_slice(), MAX_EXTRA_DATA_BYTES)?,
            uint256_root(&self.base_fee_per_gas),
            bytes_root(self.block_hash.as_bytes()),
            bytes_root(self.transactions_root.as_bytes()),
        ]))
    }
}

/// Payload as held by the relay's cache.
///
/// The co-hosted engine publishes engine-form payloads keyed by parent hash;
/// get-header re-publishes the REST form keyed by the payload's own hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedPayload {
    Engine(ExecutionPayloadV1),
    Rest(ExecutionPayloadRest),
}

impl CachedPayload {
    pub fn block_hash(&self) -> Hash {
        match self {
            Self::Engine(p) => p.block_hash,
            Self::Rest(p) => p.block_hash,
        }
    }

    pub fn to_rest(&self) -> Result<ExecutionPayloadRest, PayloadConversionError> {
        match self {
            Self::Engine(p) => ExecutionPayloadRest::try_from(p),
            Self::Rest(p) => Ok(p.clone()),
        }
    }

    pub fn to_engine(&self) -> ExecutionPayloadV1 {
        match self {
            Self::Engine(p) => p.clone(),
            Self::Rest(p) => ExecutionPayloadV1::from(p),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_payload() -> ExecutionPayloadV1 {
        ExecutionPayloadV1 {
            parent_hash: Hash::repeat_byte(0x11),
            fee_recipient: Address::repeat_byte(0x13),
            state_root: Hash::repeat_byte(0x22),
            receipts_root: Hash::repeat_byte(0x33),
            logs_bloom: HexBytes(vec![0u8; 256]),
            prev_randao: Hash::repeat_byte(0x44),
            block_number: 7,
            gas_limit: 30_000_000,
            gas_used: 21_000,
            timestamp: 1_700_000_084,
            extra_data: HexBytes(b"proto says hi".to_vec()),
            base_fee_per_gas: U256::from(1_000_000_000u64),
            block_hash: Hash::repeat_byte(0x55),
            transactions: vec![HexBytes(vec![0x02, 0xf8, 0x01])],
        }
    }

    #[test]
    fn test_engine_to_rest_and_back_is_lossless() {
        let engine = sample_payload();
        let rest = ExecutionPayloadRest::try_from(&engine).unwrap();
        assert_eq!(ExecutionPayloadV1::from(&rest), engine);
    }

    #[test]
    fn test_short_bloom_is_rejected() {
        let mut engine = sample_payload();
        engine.logs_bloom = HexBytes(vec![0u8; 10]);
        assert_eq!(
            ExecutionPayloadRest::try_from(&engine),
            Err(PayloadConversionError::LogsBloomLength(10))
        );
    }

    #[test]
    fn test_long_extra_data_is_rejected() {
        let mut engine = sample_payload();
        engine.extra_data = HexBytes(vec![1u8; 33]);
        assert_eq!(
            ExecutionPayloadRest::try_from(&engine),
            Err(PayloadConversionError::ExtraDataTooLong(33))
        );
    }

    #[test]
    fn test_wire_formats_differ_per_api() {
        let engine = sample_payload();
        let engine_json = serde_json::to_value(&engine).unwrap();
        assert_eq!(engine_json["blockNumber"], "0x7");
        assert_eq!(engine_json["baseFeePerGas"], "0x3b9aca00");

        let rest = ExecutionPayloadRest::try_from(&engine).unwrap();
        let rest_json = serde_json::to_value(&rest).unwrap();
        assert_eq!(rest_json["block_number"], "7");
        assert_eq!(rest_json["base_fee_per_gas"], "1000000000");
    }

    #[test]
    fn test_header_commits_to_transactions() {
        let rest = ExecutionPayloadRest::try_from(&sample_payload()).unwrap();
        let header = rest.to_header().unwrap();
        assert_eq!(header.block_hash, rest.block_hash);

        let mut other = rest.clone();
        other.transactions.push(HexBytes(vec![0x02]));
        let other_header = other.to_header().unwrap();
        assert_ne!(header.transactions_root, other_header.transactions_root);
        assert_ne!(
            header.hash_tree_root().unwrap(),
            other_header.hash_tree_root().unwrap()
        );
    }

    #[test]
    fn test_cached_payload_renders_rest_from_engine() {
        let engine = sample_payload();
        let cached = CachedPayload::Engine(engine.clone());
        assert_eq!(cached.block_hash(), engine.block_hash);
        assert_eq!(cached.to_rest().unwrap().timestamp, engine.timestamp);
        assert_eq!(cached.to_engine(), engine);
    }
}
