//! # Relay Service
//!
//! The builder API operations, independent of HTTP. Handlers in `api` parse
//! the transport and delegate here.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use mm_01_signing::{verify_signature, SigningApi, SigningService};
use shared_crypto::BlsKeyPair;
use shared_types::{
    builder_domain, proposer_domain, BlsPublicKeyBytes, BuilderBid, CachedPayload, Domain,
    ExecutionPayloadRest, Hash, SignedBlindedBeaconBlock, SignedBuilderBid,
    SignedValidatorRegistration, VersionedResponse, U256,
};
use tracing::{info, warn};

use crate::domain::{PayloadCache, ProposerSessions, RelayConfig, RelayError, Result};

const PUBKEY_LENGTH: usize = 48;
const SIGNATURE_LENGTH: usize = 96;

pub struct RelayService {
    signer: SigningService,
    proposer_domain: Domain,
    cache: Arc<PayloadCache>,
    sessions: ProposerSessions,
    registrations: AtomicU64,
}

impl RelayService {
    pub fn new(keypair: BlsKeyPair, config: &RelayConfig, cache: Arc<PayloadCache>) -> Self {
        Self {
            signer: SigningService::new(keypair, builder_domain()),
            proposer_domain: proposer_domain(
                config.proposer_fork_version,
                config.genesis_validators_root,
            ),
            cache,
            sessions: ProposerSessions::new(config.session_mode, config.cache_capacity),
            registrations: AtomicU64::new(0),
        }
    }

    pub fn public_key(&self) -> BlsPublicKeyBytes {
        self.signer.public_key()
    }

    pub fn cache(&self) -> &Arc<PayloadCache> {
        &self.cache
    }

    /// Registrations accepted so far. They are validated, never stored.
    pub fn registrations(&self) -> u64 {
        self.registrations.load(Ordering::Relaxed)
    }

    pub fn register_validator(&self, registration: &SignedValidatorRegistration) -> Result<()> {
        let message = &registration.message;
        if message.pubkey.len() != PUBKEY_LENGTH {
            return Err(RelayError::InvalidPubkey);
        }
        if registration.signature.len() != SIGNATURE_LENGTH {
            return Err(RelayError::InvalidSignature);
        }

        match self.signer.verify(
            message,
            message.pubkey.as_slice(),
            registration.signature.as_slice(),
        ) {
            Ok(true) => {}
            Ok(false) => return Err(RelayError::InvalidSignature),
            Err(err) => {
                warn!(%err, "Error verifying registration signature");
                return Err(RelayError::InvalidSignature);
            }
        }

        let accepted = self.registrations.fetch_add(1, Ordering::Relaxed) + 1;
        info!(
            pubkey = %message.pubkey,
            fee_recipient = ?message.fee_recipient,
            accepted,
            "Validator registered"
        );
        Ok(())
    }

    /// Bid for the payload built on `parent_hash`, from raw path segments.
    pub fn get_header(
        &self,
        slot: &str,
        parent_hash: &str,
        pubkey: &str,
    ) -> Result<VersionedResponse<SignedBuilderBid>> {
        let slot = parse_slot(slot)?;
        let parent_hash = parse_hash(parent_hash)?;
        info!(slot, parent_hash = ?parent_hash, pubkey, "getHeader");

        let Some(payload) = self.cache.get(&parent_hash) else {
            warn!(slot, parent_hash = ?parent_hash, "Cannot get unknown payload");
            return Err(RelayError::UnknownPayload);
        };
        let rest = payload.to_rest()?;
        let header = rest.to_header()?;
        let block_hash = rest.block_hash;
        self.cache.put(block_hash, CachedPayload::Rest(rest));

        let bid = BuilderBid {
            header,
            value: U256::one(),
            pubkey: self.signer.public_key(),
        };
        let signature = self.signer.sign(&bid)?;

        // Recorded after the cache write: a malformed key still leaves the
        // REST payload cached.
        let proposer: BlsPublicKeyBytes = pubkey.parse().map_err(|e| {
            warn!(pubkey, err = %e, "Cannot parse pubkey");
            RelayError::Decode(format!("cannot unmarshal pubkey: {e}"))
        })?;
        self.sessions.record(block_hash, proposer);

        info!(slot, block_hash = ?block_hash, "Consensus client retrieved prepared payload header");
        Ok(VersionedResponse::bellatrix(SignedBuilderBid {
            message: bid,
            signature,
        }))
    }

    /// Reveal the full payload for a signed blinded block.
    pub fn get_payload(
        &self,
        block: &SignedBlindedBeaconBlock,
    ) -> Result<VersionedResponse<ExecutionPayloadRest>> {
        if block.signature.len() != SIGNATURE_LENGTH {
            return Err(RelayError::InvalidSignature);
        }
        let block_hash = block.message.body.execution_payload_header.block_hash;
        let slot = block.message.slot;

        let proposer = self
            .sessions
            .proposer_for(&block_hash)
            .ok_or(RelayError::InvalidSignature)?;
        match verify_signature(
            &block.message,
            self.proposer_domain,
            proposer.as_bytes(),
            block.signature.as_slice(),
        ) {
            Ok(true) => {}
            Ok(false) => {
                warn!(slot, block_hash = ?block_hash, "Blinded block signature rejected");
                return Err(RelayError::InvalidSignature);
            }
            Err(err) => {
                warn!(slot, block_hash = ?block_hash, %err, "Error verifying blinded block signature");
                return Err(RelayError::InvalidSignature);
            }
        }

        let Some(payload) = self.cache.get(&block_hash) else {
            warn!(slot, block_hash = ?block_hash, "Cannot get unknown payload");
            return Err(RelayError::UnknownPayload);
        };
        info!(slot, block_hash = ?block_hash, "Consensus client retrieved full payload");
        Ok(VersionedResponse::bellatrix(payload.to_rest()?))
    }
}

fn parse_slot(text: &str) -> Result<u64> {
    text.parse()
        .map_err(|_| RelayError::Decode(format!("invalid slot {text:?}")))
}

fn parse_hash(text: &str) -> Result<Hash> {
    let digits = text
        .strip_prefix("0x")
        .ok_or_else(|| RelayError::Decode(format!("hash {text:?} lacks 0x prefix")))?;
    let bytes =
        hex::decode(digits).map_err(|e| RelayError::Decode(format!("invalid hash {text:?}: {e}")))?;
    if bytes.len() != 32 {
        return Err(RelayError::Decode(format!(
            "hash must be 32 bytes, got {}",
            bytes.len()
        )));
    }
    Ok(Hash::from_slice(&bytes))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::SessionMode;
    use shared_types::{
        BlindedBeaconBlock, BlindedBeaconBlockBody, ExecutionPayloadV1, HexBytes,
        ValidatorRegistration, BELLATRIX_FORK_VERSION,
    };

    pub(crate) fn engine_payload(parent: Hash, number: u64) -> ExecutionPayloadV1 {
        ExecutionPayloadV1 {
            parent_hash: parent,
            fee_recipient: Default::default(),
            state_root: Hash::repeat_byte(2),
            receipts_root: Hash::repeat_byte(3),
            logs_bloom: HexBytes(vec![0; 256]),
            prev_randao: Hash::repeat_byte(4),
            block_number: number,
            gas_limit: 30_000_000,
            gas_used: 0,
            timestamp: 12 * number,
            extra_data: HexBytes(b"mergemock".to_vec()),
            base_fee_per_gas: U256::from(7),
            block_hash: Hash::from_low_u64_be(1000 + number),
            transactions: vec![HexBytes(vec![0x02, 0xc0])],
        }
    }

    pub(crate) fn service(mode: SessionMode) -> RelayService {
        let config = RelayConfig {
            session_mode: mode,
            ..RelayConfig::default()
        };
        RelayService::new(
            BlsKeyPair::from_ikm(&[1u8; 32]).unwrap(),
            &config,
            Arc::new(PayloadCache::default()),
        )
    }

    pub(crate) fn signed_blinded(
        proposer: &BlsKeyPair,
        bid: &SignedBuilderBid,
        slot: u64,
    ) -> SignedBlindedBeaconBlock {
        let message = BlindedBeaconBlock {
            slot,
            proposer_index: 1,
            body: BlindedBeaconBlockBody {
                execution_payload_header: bid.message.header.clone(),
                ..Default::default()
            },
            ..Default::default()
        };
        let domain = proposer_domain(BELLATRIX_FORK_VERSION, Hash::zero());
        let signature = mm_01_signing::sign(proposer, &message, domain).unwrap();
        SignedBlindedBeaconBlock {
            message,
            signature: HexBytes(signature.0.to_vec()),
        }
    }

    fn pubkey_text(keypair: &BlsKeyPair) -> String {
        format!("0x{}", hex::encode(keypair.public_key().to_bytes()))
    }

    fn registration(keypair: &BlsKeyPair) -> SignedValidatorRegistration {
        let message = ValidatorRegistration {
            fee_recipient: Default::default(),
            gas_limit: 30_000_000,
            timestamp: 1,
            pubkey: HexBytes(keypair.public_key().to_bytes().to_vec()),
        };
        let signature = mm_01_signing::sign(keypair, &message, builder_domain()).unwrap();
        SignedValidatorRegistration {
            message,
            signature: HexBytes(signature.0.to_vec()),
        }
    }

    #[test]
    fn test_registration_accepted_and_counted() {
        let relay = service(SessionMode::SingleOutstanding);
        let validator = BlsKeyPair::from_ikm(&[2u8; 32]).unwrap();
        relay.register_validator(&registration(&validator)).unwrap();
        assert_eq!(relay.registrations(), 1);
    }

    #[test]
    fn test_registration_tampering_rejected() {
        let relay = service(SessionMode::SingleOutstanding);
        let validator = BlsKeyPair::from_ikm(&[2u8; 32]).unwrap();

        let mut tampered = registration(&validator);
        tampered.message.gas_limit += 1;
        assert!(matches!(
            relay.register_validator(&tampered),
            Err(RelayError::InvalidSignature)
        ));

        let mut short_key = registration(&validator);
        short_key.message.pubkey.0.pop();
        assert!(matches!(
            relay.register_validator(&short_key),
            Err(RelayError::InvalidPubkey)
        ));

        let mut short_sig = registration(&validator);
        short_sig.signature.0.pop();
        assert!(matches!(
            relay.register_validator(&short_sig),
            Err(RelayError::InvalidSignature)
        ));
        assert_eq!(relay.registrations(), 0);
    }

    #[test]
    fn test_header_for_unknown_parent_rejected() {
        let relay = service(SessionMode::SingleOutstanding);
        let proposer = BlsKeyPair::from_ikm(&[3u8; 32]).unwrap();
        let err = relay
            .get_header("1", &format!("{:?}", Hash::repeat_byte(9)), &pubkey_text(&proposer))
            .unwrap_err();
        assert!(matches!(err, RelayError::UnknownPayload));
        assert_eq!(err.to_string(), "cannot get unknown payload");
    }

    #[test]
    fn test_header_then_payload_round_trip() {
        let relay = service(SessionMode::SingleOutstanding);
        let proposer = BlsKeyPair::from_ikm(&[3u8; 32]).unwrap();
        let parent = Hash::repeat_byte(0xaa);
        let payload = engine_payload(parent, 1);
        relay.cache().put(parent, CachedPayload::Engine(payload.clone()));

        let bid = relay
            .get_header("1", &format!("{parent:?}"), &pubkey_text(&proposer))
            .unwrap();
        assert_eq!(bid.version, "bellatrix");
        assert_eq!(bid.data.message.value, U256::one());
        assert_eq!(bid.data.message.header.block_hash, payload.block_hash);

        let ok = SigningService::new(BlsKeyPair::from_ikm(&[1u8; 32]).unwrap(), builder_domain())
            .verify(
                &bid.data.message,
                &relay.public_key().0,
                &bid.data.signature.0,
            );
        assert_eq!(ok, Ok(true));

        let revealed = relay
            .get_payload(&signed_blinded(&proposer, &bid.data, 1))
            .unwrap();
        assert_eq!(revealed.data, ExecutionPayloadRest::try_from(&payload).unwrap());
    }

    #[test]
    fn test_payload_signed_by_other_key_rejected() {
        let relay = service(SessionMode::SingleOutstanding);
        let proposer = BlsKeyPair::from_ikm(&[3u8; 32]).unwrap();
        let intruder = BlsKeyPair::from_ikm(&[4u8; 32]).unwrap();
        let parent = Hash::repeat_byte(0xaa);
        relay
            .cache()
            .put(parent, CachedPayload::Engine(engine_payload(parent, 1)));

        let bid = relay
            .get_header("1", &format!("{parent:?}"), &pubkey_text(&proposer))
            .unwrap();
        assert!(matches!(
            relay.get_payload(&signed_blinded(&intruder, &bid.data, 1)),
            Err(RelayError::InvalidSignature)
        ));
    }

    #[test]
    fn test_payload_before_any_header_rejected() {
        let relay = service(SessionMode::SingleOutstanding);
        let proposer = BlsKeyPair::from_ikm(&[3u8; 32]).unwrap();
        let bid = SignedBuilderBid {
            message: BuilderBid {
                header: Default::default(),
                value: U256::one(),
                pubkey: relay.public_key(),
            },
            signature: Default::default(),
        };
        assert!(matches!(
            relay.get_payload(&signed_blinded(&proposer, &bid, 1)),
            Err(RelayError::InvalidSignature)
        ));
    }

    #[test]
    fn test_malformed_pubkey_rejected_after_caching() {
        let relay = service(SessionMode::SingleOutstanding);
        let parent = Hash::repeat_byte(0xaa);
        let payload = engine_payload(parent, 1);
        relay.cache().put(parent, CachedPayload::Engine(payload.clone()));

        let err = relay
            .get_header("1", &format!("{parent:?}"), "0x1234")
            .unwrap_err();
        assert!(matches!(err, RelayError::Decode(_)));
        assert!(matches!(
            relay.cache().get(&payload.block_hash),
            Some(CachedPayload::Rest(_))
        ));
    }

    #[test]
    fn test_repeated_header_requests_keep_cache_intact() {
        let relay = service(SessionMode::SingleOutstanding);
        let proposer = BlsKeyPair::from_ikm(&[3u8; 32]).unwrap();
        let parent = Hash::repeat_byte(0xaa);
        relay
            .cache()
            .put(parent, CachedPayload::Engine(engine_payload(parent, 1)));
        let other = Hash::repeat_byte(0xbb);
        relay
            .cache()
            .put(other, CachedPayload::Engine(engine_payload(other, 2)));

        for _ in 0..3 {
            relay
                .get_header("1", &format!("{parent:?}"), &pubkey_text(&proposer))
                .unwrap();
        }
        assert_eq!(relay.cache().len(), 3);
        assert!(relay.cache().get(&other).is_some());
    }

    #[test]
    fn test_per_block_hash_sessions_allow_overlap() {
        let relay = service(SessionMode::PerBlockHash);
        let first = BlsKeyPair::from_ikm(&[5u8; 32]).unwrap();
        let second = BlsKeyPair::from_ikm(&[6u8; 32]).unwrap();
        let (p1, p2) = (Hash::repeat_byte(0x01), Hash::repeat_byte(0x02));
        relay.cache().put(p1, CachedPayload::Engine(engine_payload(p1, 1)));
        relay.cache().put(p2, CachedPayload::Engine(engine_payload(p2, 2)));

        let bid1 = relay
            .get_header("1", &format!("{p1:?}"), &pubkey_text(&first))
            .unwrap();
        let bid2 = relay
            .get_header("2", &format!("{p2:?}"), &pubkey_text(&second))
            .unwrap();

        assert!(relay.get_payload(&signed_blinded(&first, &bid1.data, 1)).is_ok());
        assert!(relay.get_payload(&signed_blinded(&second, &bid2.data, 2)).is_ok());
    }

    #[test]
    fn test_path_parsing() {
        assert_eq!(parse_slot("42").unwrap(), 42);
        assert!(parse_slot("-1").is_err());
        assert!(parse_hash("0x1234").is_err());
        assert!(parse_hash(&"ab".repeat(32)).is_err());
        assert_eq!(
            parse_hash(&format!("0x{}", "ab".repeat(32))).unwrap(),
            Hash::repeat_byte(0xab)
        );
    }
}
