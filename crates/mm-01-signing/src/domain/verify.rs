//! # Sign / Verify over Signing Roots

use shared_crypto::{BlsKeyPair, BlsPublicKey, BlsSignature};
use shared_types::{compute_signing_root, BlsSignatureBytes, Domain, HashTreeRoot};

use super::errors::SigningError;

/// Verify `signature` by `public_key` over `signable` in `domain`.
///
/// Order matters: commitment, then signature decoding, then public key
/// decoding. The first failure is returned.
pub fn verify_signature<T: HashTreeRoot + ?Sized>(
    signable: &T,
    domain: Domain,
    public_key: &[u8],
    signature: &[u8],
) -> Result<bool, SigningError> {
    let root = compute_signing_root(signable, domain)?;
    let signature =
        BlsSignature::from_bytes(signature).map_err(|_| SigningError::InvalidSignatureEncoding)?;
    let public_key =
        BlsPublicKey::from_bytes(public_key).map_err(|_| SigningError::InvalidPublicKeyEncoding)?;
    Ok(public_key.verify(&root, &signature))
}

/// Sign `signable` in `domain`.
pub fn sign<T: HashTreeRoot + ?Sized>(
    keypair: &BlsKeyPair,
    signable: &T,
    domain: Domain,
) -> Result<BlsSignatureBytes, SigningError> {
    let root = compute_signing_root(signable, domain)?;
    Ok(BlsSignatureBytes(keypair.sign(&root).to_bytes()))
}
