//! # Signing Domains
//!
//! Signatures are never over an object's root directly but over
//! `hash_tree_root(SigningData { object_root, domain })`, so a signature made
//! for one purpose cannot be replayed for another.

use crate::commitment::{bytes_root, container_root, CommitmentError, HashTreeRoot, Root};
use crate::primitives::Hash;

pub type DomainType = [u8; 4];
pub type ForkVersion = [u8; 4];
pub type Domain = [u8; 32];

pub const DOMAIN_BEACON_PROPOSER: DomainType = [0x00, 0x00, 0x00, 0x00];
pub const DOMAIN_APPLICATION_BUILDER: DomainType = [0x00, 0x00, 0x00, 0x01];

pub const GENESIS_FORK_VERSION: ForkVersion = [0x00, 0x00, 0x00, 0x00];
pub const BELLATRIX_FORK_VERSION: ForkVersion = [0x02, 0x00, 0x00, 0x00];

fn fork_data_root(current_version: ForkVersion, genesis_validators_root: Hash) -> Root {
    container_root(&[
        bytes_root(&current_version),
        bytes_root(genesis_validators_root.as_bytes()),
    ])
}

/// The object actually signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SigningData {
    pub object_root: Root,
    pub domain: Domain,
}

impl HashTreeRoot for SigningData {
    fn hash_tree_root(&self) -> Result<Root, CommitmentError> {
        Ok(container_root(&[self.object_root, self.domain]))
    }
}

pub fn compute_domain(
    domain_type: DomainType,
    fork_version: ForkVersion,
    genesis_validators_root: Hash,
) -> Domain {
    let fork_data_root = fork_data_root(fork_version, genesis_validators_root);
    let mut domain = [0u8; 32];
    domain[..4].copy_from_slice(&domain_type);
    domain[4..].copy_from_slice(&fork_data_root[..28]);
    domain
}

/// Domain for registrations and bids: genesis fork, zero validators root.
pub fn builder_domain() -> Domain {
    compute_domain(DOMAIN_APPLICATION_BUILDER, GENESIS_FORK_VERSION, Hash::zero())
}

/// Domain for blinded beacon blocks.
pub fn proposer_domain(fork_version: ForkVersion, genesis_validators_root: Hash) -> Domain {
    compute_domain(DOMAIN_BEACON_PROPOSER, fork_version, genesis_validators_root)
}

pub fn compute_signing_root<T: HashTreeRoot + ?Sized>(
    object: &T,
    domain: Domain,
) -> Result<Root, CommitmentError> {
    SigningData {
        object_root: object.hash_tree_root()?,
        domain,
    }
    .hash_tree_root()
}
