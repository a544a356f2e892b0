//! # Hash-Tree-Root Commitments
//!
//! SSZ-style merkleization of the signable objects. Every container root is
//! the merkle root of its field roots; lists mix in their length.
//!
//! Chunk packing and the zero-padded merkle tree come from `tree_hash`.

use primitive_types::U256;
use thiserror::Error;
use tree_hash::{merkle_root, mix_in_length};

use crate::primitives::HexBytes;

/// A 32-byte merkle root.
pub type Root = [u8; 32];

/// `ExecutionPayload.extra_data` limit.
pub const MAX_EXTRA_DATA_BYTES: usize = 32;
/// `ExecutionPayload.logs_bloom` length.
pub const BYTES_PER_LOGS_BLOOM: usize = 256;
/// Transactions list limit.
pub const MAX_TRANSACTIONS_PER_PAYLOAD: usize = 1 << 20;
/// Single transaction byte-list limit.
pub const MAX_BYTES_PER_TRANSACTION: usize = 1 << 30;

const BYTES_PER_CHUNK: usize = 32;

/// Failure to canonically encode an object for commitment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommitmentError {
    /// A fixed-length field had the wrong number of bytes.
    #[error("field `{field}` must be {expected} bytes, got {actual}")]
    FixedLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A bounded list exceeded its limit.
    #[error("field `{field}` exceeds limit {limit}: got {actual}")]
    LimitExceeded {
        field: &'static str,
        limit: usize,
        actual: usize,
    },
}

/// An object with a canonical hash commitment.
pub trait HashTreeRoot {
    fn hash_tree_root(&self) -> Result<Root, CommitmentError>;
}

impl HashTreeRoot for Root {
    fn hash_tree_root(&self) -> Result<Root, CommitmentError> {
        Ok(*self)
    }
}

pub(crate) fn uint64_root(value: u64) -> Root {
    let mut root = [0u8; 32];
    root[..8].copy_from_slice(&value.to_le_bytes());
    root
}

pub(crate) fn uint256_root(value: &U256) -> Root {
    let mut root = [0u8; 32];
    value.to_little_endian(&mut root);
    root
}

/// Root of a fixed-size byte vector whose length is guaranteed by its type.
pub(crate) fn bytes_root(bytes: &[u8]) -> Root {
    merkle_root(bytes, 0).0
}

/// Root of a fixed-size byte vector held in a variable-length wrapper.
pub(crate) fn fixed_bytes_root(
    field: &'static str,
    bytes: &[u8],
    expected: usize,
) -> Result<Root, CommitmentError> {
    if bytes.len() != expected {
        return Err(CommitmentError::FixedLength {
            field,
            expected,
            actual: bytes.len(),
        });
    }
    Ok(bytes_root(bytes))
}

/// Root of a `ByteList[limit]`.
pub(crate) fn byte_list_root(
    field: &'static str,
    bytes: &[u8],
    limit: usize,
) -> Result<Root, CommitmentError> {
    if bytes.len() > limit {
        return Err(CommitmentError::LimitExceeded {
            field,
            limit,
            actual: bytes.len(),
        });
    }
    let chunk_limit = limit.div_ceil(BYTES_PER_CHUNK);
    let root = merkle_root(bytes, chunk_limit);
    Ok(mix_in_length(&root, bytes.len()).0)
}

/// Root of a list of composite elements, given their roots.
pub(crate) fn composite_list_root(roots: &[Root], limit: usize) -> Root {
    let packed: Vec<u8> = roots.iter().flatten().copied().collect();
    let root = merkle_root(&packed, limit);
    mix_in_length(&root, roots.len()).0
}

/// Root of a container, given its field roots in declaration order.
pub(crate) fn container_root(fields: &[Root]) -> Root {
    let packed: Vec<u8> = fields.iter().flatten().copied().collect();
    merkle_root(&packed, 0).0
}

/// Root of `List[Transaction, MAX_TRANSACTIONS_PER_PAYLOAD]`.
pub fn transactions_root(transactions: &[HexBytes]) -> Result<Root, CommitmentError> {
    if transactions.len() > MAX_TRANSACTIONS_PER_PAYLOAD {
        return Err(CommitmentError::LimitExceeded {
            field: "transactions",
            limit: MAX_TRANSACTIONS_PER_PAYLOAD,
            actual: transactions.len(),
        });
    }
    let roots = transactions
        .iter()
        .map(|tx| byte_list_root("transaction", tx.as_slice(), MAX_BYTES_PER_TRANSACTION))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(composite_list_root(&roots, MAX_TRANSACTIONS_PER_PAYLOAD))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uint64_root_is_little_endian() {
        let root = uint64_root(0x0102);
        assert_eq!(root[0], 0x02);
        assert_eq!(root[1], 0x01);
        assert!(root[2..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_single_field_container_is_the_field() {
        let field = [7u8; 32];
        assert_eq!(container_root(&[field]), field);
    }

    #[test]
    fn test_byte_list_mixes_in_length() {
        let a = byte_list_root("extra", &[0u8; 1], 32).unwrap();
        let b = byte_list_root("extra", &[0u8; 2], 32).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_byte_list_limit_enforced() {
        let err = byte_list_root("extra_data", &[0u8; 33], MAX_EXTRA_DATA_BYTES).unwrap_err();
        assert!(matches!(err, CommitmentError::LimitExceeded { actual: 33, .. }));
    }

    #[test]
    fn test_transactions_root_depends_on_content() {
        let empty = transactions_root(&[]).unwrap();
        let one = transactions_root(&[HexBytes(vec![0x02, 0x01])]).unwrap();
        let other = transactions_root(&[HexBytes(vec![0x02, 0x02])]).unwrap();
        assert_ne!(empty, one);
        assert_ne!(one, other);
    }
}
