//! # Blocks and Headers
//!
//! Headers are RLP-encoded in the London layout and identified by the
//! keccak-256 of that encoding. A block converts to the engine payload form
//! and back; converting back recomputes the hash and rejects a payload whose
//! declared hash disagrees.
//!
//! Transaction, receipt and state roots are keccak commitments over the mock
//! state rather than Merkle-Patricia tries.

use primitive_types::U256;
use rlp::RlpStream;
use serde::{Deserialize, Serialize};
use shared_crypto::keccak256;
use shared_types::{Address, Bloom, ExecutionPayloadV1, Hash, HexBytes, MAX_EXTRA_DATA_BYTES};

use crate::error::{ChainError, Result};

/// keccak256(rlp([])): the ommers hash of every block without uncles.
pub const EMPTY_OMMERS_HASH: [u8; 32] = [
    0x1d, 0xcc, 0x4d, 0xe8, 0xde, 0xc7, 0x5d, 0x7a, 0xab, 0x85, 0xb5, 0x67, 0xb6, 0xcc, 0xd4, 0x1a,
    0xd3, 0x12, 0x45, 0x1b, 0x94, 0x8a, 0x74, 0x13, 0xf0, 0xa1, 0x42, 0xfd, 0x40, 0xd4, 0x93, 0x47,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub parent_hash: Hash,
    pub ommers_hash: Hash,
    pub coinbase: Address,
    pub state_root: Hash,
    pub transactions_root: Hash,
    pub receipts_root: Hash,
    pub logs_bloom: Bloom,
    pub difficulty: U256,
    pub number: u64,
    pub gas_limit: u64,
    pub gas_used: u64,
    pub timestamp: u64,
    pub extra_data: HexBytes,
    pub mix_hash: Hash,
    pub nonce: u64,
    pub base_fee_per_gas: Option<U256>,
}

impl Header {
    pub fn rlp_bytes(&self) -> Vec<u8> {
        let fields = if self.base_fee_per_gas.is_some() { 16 } else { 15 };
        let mut stream = RlpStream::new_list(fields);
        stream
            .append(&self.parent_hash)
            .append(&self.ommers_hash)
            .append(&self.coinbase)
            .append(&self.state_root)
            .append(&self.transactions_root)
            .append(&self.receipts_root)
            .append(&self.logs_bloom.0.to_vec())
            .append(&self.difficulty)
            .append(&self.number)
            .append(&self.gas_limit)
            .append(&self.gas_used)
            .append(&self.timestamp)
            .append(&self.extra_data.0)
            .append(&self.mix_hash)
            .append(&self.nonce.to_be_bytes().to_vec());
        if let Some(base_fee) = &self.base_fee_per_gas {
            stream.append(base_fee);
        }
        stream.out().to_vec()
    }

    pub fn hash(&self) -> Hash {
        Hash::from(keccak256(&self.rlp_bytes()))
    }

    /// Post-merge blocks carry no proof-of-work difficulty.
    pub fn is_proof_of_stake(&self) -> bool {
        self.difficulty.is_zero()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: Header,
    pub transactions: Vec<HexBytes>,
}

impl Block {
    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    pub fn number(&self) -> u64 {
        self.header.number
    }

    pub fn parent_hash(&self) -> Hash {
        self.header.parent_hash
    }

    /// Render as an engine API payload.
    pub fn to_payload(&self) -> ExecutionPayloadV1 {
        let header = &self.header;
        ExecutionPayloadV1 {
            parent_hash: header.parent_hash,
            fee_recipient: header.coinbase,
            state_root: header.state_root,
            receipts_root: header.receipts_root,
            logs_bloom: HexBytes(header.logs_bloom.0.to_vec()),
            prev_randao: header.mix_hash,
            block_number: header.number,
            gas_limit: header.gas_limit,
            gas_used: header.gas_used,
            timestamp: header.timestamp,
            extra_data: header.extra_data.clone(),
            base_fee_per_gas: header.base_fee_per_gas.unwrap_or_default(),
            block_hash: self.hash(),
            transactions: self.transactions.clone(),
        }
    }

    /// Rebuild a post-merge block from an engine payload.
    pub fn from_payload(payload: &ExecutionPayloadV1) -> Result<Self> {
        let logs_bloom = Bloom::from_slice(payload.logs_bloom.as_slice()).ok_or_else(|| {
            ChainError::MalformedPayload(format!(
                "logs bloom is {} bytes",
                payload.logs_bloom.len()
            ))
        })?;
        if payload.extra_data.len() > MAX_EXTRA_DATA_BYTES {
            return Err(ChainError::MalformedPayload(format!(
                "extra data is {} bytes",
                payload.extra_data.len()
            )));
        }

        let block = Self {
            header: Header {
                parent_hash: payload.parent_hash,
                ommers_hash: Hash::from(EMPTY_OMMERS_HASH),
                coinbase: payload.fee_recipient,
                state_root: payload.state_root,
                transactions_root: transactions_root(&payload.transactions),
                receipts_root: payload.receipts_root,
                logs_bloom,
                difficulty: U256::zero(),
                number: payload.block_number,
                gas_limit: payload.gas_limit,
                gas_used: payload.gas_used,
                timestamp: payload.timestamp,
                extra_data: payload.extra_data.clone(),
                mix_hash: payload.prev_randao,
                nonce: 0,
                base_fee_per_gas: Some(payload.base_fee_per_gas),
            },
            transactions: payload.transactions.clone(),
        };

        let computed = block.hash();
        if computed != payload.block_hash {
            return Err(ChainError::BlockHashMismatch {
                declared: payload.block_hash,
                computed,
            });
        }
        Ok(block)
    }
}

/// keccak256 of the RLP list of raw transactions.
pub fn transactions_root(transactions: &[HexBytes]) -> Hash {
    let mut stream = RlpStream::new_list(transactions.len());
    for tx in transactions {
        stream.append(&tx.0);
    }
    Hash::from(keccak256(&stream.out()))
}

/// keccak256 of the RLP list of cumulative gas used after each transaction.
pub fn receipts_root(cumulative_gas: &[u64]) -> Hash {
    let mut stream = RlpStream::new_list(cumulative_gas.len());
    for gas in cumulative_gas {
        stream.append(gas);
    }
    Hash::from(keccak256(&stream.out()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos_block() -> Block {
        Block {
            header: Header {
                parent_hash: Hash::repeat_byte(1),
                ommers_hash: Hash::from(EMPTY_OMMERS_HASH),
                coinbase: Address::repeat_byte(1),
                state_root: Hash::repeat_byte(2),
                transactions_root: transactions_root(&[]),
                receipts_root: receipts_root(&[]),
                logs_bloom: Bloom::default(),
                difficulty: U256::zero(),
                number: 5,
                gas_limit: 30_000_000,
                gas_used: 0,
                timestamp: 100,
                extra_data: HexBytes(b"proto says hi".to_vec()),
                mix_hash: Hash::repeat_byte(3),
                nonce: 0,
                base_fee_per_gas: Some(U256::from(7u64)),
            },
            transactions: vec![],
        }
    }

    #[test]
    fn test_empty_ommers_constant() {
        let empty = rlp::RlpStream::new_list(0).out().to_vec();
        assert_eq!(keccak256(&empty), EMPTY_OMMERS_HASH);
    }

    #[test]
    fn test_payload_round_trip_preserves_hash() {
        let block = pos_block();
        let payload = block.to_payload();
        let restored = Block::from_payload(&payload).unwrap();
        assert_eq!(restored, block);
    }

    #[test]
    fn test_wrong_declared_hash_rejected() {
        let mut payload = pos_block().to_payload();
        payload.block_hash = Hash::from_low_u64_be(0xdeadbeef);
        assert!(matches!(
            Block::from_payload(&payload),
            Err(ChainError::BlockHashMismatch { .. })
        ));
    }

    #[test]
    fn test_hash_covers_base_fee() {
        let a = pos_block();
        let mut b = pos_block();
        b.header.base_fee_per_gas = Some(U256::from(8u64));
        assert_ne!(a.hash(), b.hash());
    }
}
