//! # Builder API Messages
//!
//! Request and response bodies of the builder-relay REST API, and the blinded
//! beacon block the proposer signs in place of a full block.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use crate::commitment::{
    bytes_root, composite_list_root, container_root, fixed_bytes_root, uint256_root, uint64_root,
    CommitmentError, HashTreeRoot, Root,
};
use crate::payload::ExecutionPayloadHeader;
use crate::primitives::{
    dec_u256, Address, BlsPublicKeyBytes, BlsSignatureBytes, Hash, HexBytes, SyncCommitteeBits,
    U256,
};

/// Fork label attached to every versioned builder response.
pub const BELLATRIX_VERSION: &str = "bellatrix";

/// `{version, data}` envelope of builder API responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedResponse<T> {
    pub version: String,
    pub data: T,
}

impl<T> VersionedResponse<T> {
    pub fn bellatrix(data: T) -> Self {
        Self {
            version: BELLATRIX_VERSION.to_string(),
            data,
        }
    }
}

// =============================================================================
// VALIDATOR REGISTRATION
// =============================================================================

/// Registration message. The pubkey stays variable-length on the wire so the
/// relay can reject a wrong length with its own error.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorRegistration {
    pub fee_recipient: Address,
    #[serde_as(as = "DisplayFromStr")]
    pub gas_limit: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub timestamp: u64,
    pub pubkey: HexBytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedValidatorRegistration {
    pub message: ValidatorRegistration,
    pub signature: HexBytes,
}

impl HashTreeRoot for ValidatorRegistration {
    fn hash_tree_root(&self) -> Result<Root, CommitmentError> {
        Ok(container_root(&[
            bytes_root(self.fee_recipient.as_bytes()),
            uint64_root(self.gas_limit),
            uint64_root(self.timestamp),
            fixed_bytes_root("pubkey", self.pubkey.as_slice(), BlsPublicKeyBytes::LEN)?,
        ]))
    }
}

// =============================================================================
// BUILDER BID
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderBid {
    pub header: ExecutionPayloadHeader,
    #[serde(with = "dec_u256")]
    pub value: U256,
    pub pubkey: BlsPublicKeyBytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedBuilderBid {
    pub message: BuilderBid,
    pub signature: BlsSignatureBytes,
}

impl HashTreeRoot for BuilderBid {
    fn hash_tree_root(&self) -> Result<Root, CommitmentError> {
        Ok(container_root(&[
            self.header.hash_tree_root()?,
            uint256_root(&self.value),
            bytes_root(self.pubkey.as_bytes()),
        ]))
    }
}

// =============================================================================
// BLINDED BEACON BLOCK
// =============================================================================

// Operation list limits of the beacon block body. The mock never carries any
// operations, but the empty lists still contribute their roots.
const MAX_PROPOSER_SLASHINGS: usize = 16;
const MAX_ATTESTER_SLASHINGS: usize = 2;
const MAX_ATTESTATIONS: usize = 128;
const MAX_DEPOSITS: usize = 16;
const MAX_VOLUNTARY_EXITS: usize = 16;

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eth1Data {
    pub deposit_root: Hash,
    #[serde_as(as = "DisplayFromStr")]
    pub deposit_count: u64,
    pub block_hash: Hash,
}

impl HashTreeRoot for Eth1Data {
    fn hash_tree_root(&self) -> Result<Root, CommitmentError> {
        Ok(container_root(&[
            bytes_root(self.deposit_root.as_bytes()),
            uint64_root(self.deposit_count),
            bytes_root(self.block_hash.as_bytes()),
        ]))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncAggregate {
    pub sync_committee_bits: SyncCommitteeBits,
    pub sync_committee_signature: BlsSignatureBytes,
}

impl HashTreeRoot for SyncAggregate {
    fn hash_tree_root(&self) -> Result<Root, CommitmentError> {
        Ok(container_root(&[
            bytes_root(self.sync_committee_bits.as_bytes()),
            bytes_root(self.sync_committee_signature.as_bytes()),
        ]))
    }
}

/// Bellatrix blinded body without operations (always empty in the mock).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlindedBeaconBlockBody {
    pub randao_reveal: BlsSignatureBytes,
    pub eth1_data: Eth1Data,
    pub graffiti: Hash,
    pub sync_aggregate: SyncAggregate,
    pub execution_payload_header: ExecutionPayloadHeader,
}

impl HashTreeRoot for BlindedBeaconBlockBody {
    fn hash_tree_root(&self) -> Result<Root, CommitmentError> {
        Ok(container_root(&[
            bytes_root(self.randao_reveal.as_bytes()),
            self.eth1_data.hash_tree_root()?,
            bytes_root(self.graffiti.as_bytes()),
            composite_list_root(&[], MAX_PROPOSER_SLASHINGS),
            composite_list_root(&[], MAX_ATTESTER_SLASHINGS),
            composite_list_root(&[], MAX_ATTESTATIONS),
            composite_list_root(&[], MAX_DEPOSITS),
            composite_list_root(&[], MAX_VOLUNTARY_EXITS),
            self.sync_aggregate.hash_tree_root()?,
            self.execution_payload_header.hash_tree_root()?,
        ]))
    }
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlindedBeaconBlock {
    #[serde_as(as = "DisplayFromStr")]
    pub slot: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub proposer_index: u64,
    pub parent_root: Hash,
    pub state_root: Hash,
    pub body: BlindedBeaconBlockBody,
}

impl HashTreeRoot for BlindedBeaconBlock {
    fn hash_tree_root(&self) -> Result<Root, CommitmentError> {
        Ok(container_root(&[
            uint64_root(self.slot),
            uint64_root(self.proposer_index),
            bytes_root(self.parent_root.as_bytes()),
            bytes_root(self.state_root.as_bytes()),
            self.body.hash_tree_root()?,
        ]))
    }
}

/// Signed blinded block. The signature length is checked by the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedBlindedBeaconBlock {
    pub message: BlindedBeaconBlock,
    pub signature: HexBytes,
}
