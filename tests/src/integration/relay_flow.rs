//! # Relay Flows
//!
//! The builder REST API and the engine JSON-RPC API served by one
//! `RelayServer`, driven through the consensus driver's HTTP adapters:
//!
//! 1. **Engine → cache**: a forkchoice update with attributes builds a payload
//!    and caches it under the head hash
//! 2. **Builder header**: get-header bids on the cached payload
//! 3. **Builder reveal**: a signed blinded block unlocks the full payload

#[cfg(test)]
mod tests {
    use mm_01_signing::{sign, verify_signature};
    use mm_04_consensus_driver::{BuilderApi, ClientError, EngineApi};
    use shared_crypto::BlsKeyPair;
    use shared_types::{
        builder_domain, proposer_domain, Address, BlindedBeaconBlock, BlindedBeaconBlockBody,
        BlsPublicKeyBytes, ExecutionStatus, ForkchoiceStateV1, Hash, HexBytes,
        PayloadAttributesV1, SignedBlindedBeaconBlock, SignedBuilderBid,
        SignedValidatorRegistration, ValidatorRegistration, BELLATRIX_FORK_VERSION,
    };

    use crate::integration::support::{start_relay, RunningRelay};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn proposer() -> BlsKeyPair {
        BlsKeyPair::from_ikm(&[21u8; 32]).unwrap()
    }

    fn pubkey_of(keypair: &BlsKeyPair) -> BlsPublicKeyBytes {
        BlsPublicKeyBytes(keypair.public_key().to_bytes())
    }

    fn genesis_hash(relay: &RunningRelay) -> Hash {
        relay.engine.chain().lock().genesis_hash()
    }

    /// Ask the engine to build on genesis and return the payload id.
    async fn prepare_payload(relay: &RunningRelay) -> shared_types::PayloadId {
        let genesis = genesis_hash(relay);
        let result = relay
            .engine_client()
            .forkchoice_updated(
                ForkchoiceStateV1 {
                    head_block_hash: genesis,
                    safe_block_hash: genesis,
                    finalized_block_hash: Hash::zero(),
                },
                Some(PayloadAttributesV1 {
                    timestamp: 12,
                    prev_randao: Hash::repeat_byte(0x42),
                    suggested_fee_recipient: Address::repeat_byte(0x99),
                }),
            )
            .await
            .unwrap();
        assert_eq!(result.payload_status.status, ExecutionStatus::Valid);
        result.payload_id.unwrap()
    }

    fn signed_blinded_block(
        keypair: &BlsKeyPair,
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
        let signature = sign(keypair, &message, domain).unwrap();
        SignedBlindedBeaconBlock {
            message,
            signature: HexBytes(signature.0.to_vec()),
        }
    }

    // =============================================================================
    // BUILDER API
    // =============================================================================

    #[tokio::test]
    async fn test_status_and_registration() {
        let relay = start_relay().await;
        let http = reqwest::Client::new();

        let status = http
            .get(format!("{}/eth/v1/builder/status", relay.relay_url))
            .send()
            .await
            .unwrap();
        assert_eq!(status.status().as_u16(), 200);

        let validator = BlsKeyPair::from_ikm(&[5u8; 32]).unwrap();
        let message = ValidatorRegistration {
            fee_recipient: Address::repeat_byte(0xfe),
            gas_limit: 30_000_000,
            timestamp: 1_700_000_000,
            pubkey: HexBytes(validator.public_key().to_bytes().to_vec()),
        };
        let signature = sign(&validator, &message, builder_domain()).unwrap();
        let registration = SignedValidatorRegistration {
            message,
            signature: HexBytes(signature.0.to_vec()),
        };
        let accepted = http
            .post(format!("{}/eth/v1/builder/validators", relay.relay_url))
            .json(&registration)
            .send()
            .await
            .unwrap();
        assert_eq!(accepted.status().as_u16(), 200);
        assert_eq!(relay.relay.registrations(), 1);

        let garbage = http
            .post(format!("{}/eth/v1/builder/validators", relay.relay_url))
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(garbage.status().as_u16(), 400);
        assert_eq!(relay.relay.registrations(), 1);

        relay.stop().await;
    }

    #[tokio::test]
    async fn test_header_for_unknown_parent_is_rejected() {
        let relay = start_relay().await;
        let err = relay
            .builder_client()
            .get_header(1, Hash::repeat_byte(0x77), pubkey_of(&proposer()))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Status { status: 400, .. }));
        relay.stop().await;
    }

    #[tokio::test]
    async fn test_engine_and_builder_agree_on_payload() {
        let relay = start_relay().await;
        let payload_id = prepare_payload(&relay).await;
        let from_engine = relay.engine_client().get_payload(payload_id).await.unwrap();
        assert_eq!(from_engine.parent_hash, genesis_hash(&relay));
        assert_eq!(from_engine.timestamp, 12);
        assert_eq!(from_engine.fee_recipient, Address::repeat_byte(0x99));

        let keypair = proposer();
        let builder = relay.builder_client();
        let bid = builder
            .get_header(1, genesis_hash(&relay), pubkey_of(&keypair))
            .await
            .unwrap();
        assert_eq!(bid.message.header.block_hash, from_engine.block_hash);
        assert_eq!(bid.message.pubkey, relay.relay.public_key());
        assert!(verify_signature(
            &bid.message,
            builder_domain(),
            bid.message.pubkey.as_bytes(),
            &bid.signature.0,
        )
        .unwrap());

        let revealed = builder
            .get_payload(&signed_blinded_block(&keypair, &bid, 1))
            .await
            .unwrap();
        assert_eq!(revealed.block_hash, from_engine.block_hash);
        assert_eq!(revealed.state_root, from_engine.state_root);
        assert_eq!(revealed.transactions, from_engine.transactions);

        relay.stop().await;
    }

    #[tokio::test]
    async fn test_reveal_signed_by_another_key_is_rejected() {
        let relay = start_relay().await;
        prepare_payload(&relay).await;

        let builder = relay.builder_client();
        let bid = builder
            .get_header(1, genesis_hash(&relay), pubkey_of(&proposer()))
            .await
            .unwrap();
        let impostor = BlsKeyPair::from_ikm(&[99u8; 32]).unwrap();
        let err = builder
            .get_payload(&signed_blinded_block(&impostor, &bid, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Status { status: 400, .. }));

        relay.stop().await;
    }

    // =============================================================================
    // ENGINE API
    // =============================================================================

    #[tokio::test]
    async fn test_engine_requires_token() {
        let relay = start_relay().await;
        let response = reqwest::Client::new()
            .post(&relay.engine_url)
            .json(&serde_json::json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "engine_getPayloadV1",
                "params": ["0x0000000000000001"],
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 401);
        relay.stop().await;
    }

    #[tokio::test]
    async fn test_unknown_payload_id_is_an_rpc_error() {
        let relay = start_relay().await;
        let err = relay
            .engine_client()
            .get_payload(shared_types::PayloadId([0, 0, 0, 0, 0, 0, 0, 9]))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Rpc { code: -38001, .. }));
        relay.stop().await;
    }
}
