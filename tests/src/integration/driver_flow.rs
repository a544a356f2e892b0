//! # Driver Flows
//!
//! The consensus driver stepping slots against the relay's co-hosted
//! engine over authenticated JSON-RPC, with and without the builder path.
//!
//! Most flows feed slots to `on_slot` directly and drain in-flight steps
//! after each one, so they do not depend on wall-clock timing. One bounded
//! run goes through the real slot loop with a short slot time.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    use mm_02_mock_chain::{GenesisSpec, MockChain};
    use mm_04_consensus_driver::domain::blocks::proposal_fee_recipient;
    use mm_04_consensus_driver::{
        BuilderApi, ConsensusBehavior, ConsensusDriver, DriverConfig, RunOutcome, SharedChain,
        SlotAction,
    };
    use parking_lot::Mutex;
    use shared_crypto::BlsKeyPair;
    use tokio::sync::watch;

    use crate::integration::support::{start_relay, start_relay_with, RunningRelay, CLIENT_TIMEOUT};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn config(behavior: ConsensusBehavior) -> DriverConfig {
        DriverConfig {
            genesis_time: 1_000,
            slot_time: Duration::from_secs(12),
            slots_per_epoch: 32,
            request_timeout: CLIENT_TIMEOUT,
            behavior: ConsensusBehavior {
                seed: Some(17),
                test_accounts: 2,
                ..behavior
            },
            ..DriverConfig::default()
        }
    }

    fn fresh_chain() -> SharedChain {
        Arc::new(Mutex::new(MockChain::new(GenesisSpec::default())))
    }

    fn driver(relay: &RunningRelay, behavior: ConsensusBehavior, with_builder: bool) -> ConsensusDriver {
        driver_on(relay, config(behavior), fresh_chain(), with_builder)
    }

    fn driver_on(
        relay: &RunningRelay,
        config: DriverConfig,
        chain: SharedChain,
        with_builder: bool,
    ) -> ConsensusDriver {
        let builder: Option<Arc<dyn BuilderApi>> = if with_builder {
            Some(Arc::new(relay.builder_client()))
        } else {
            None
        };
        ConsensusDriver::new(
            config,
            chain,
            Arc::new(relay.engine_client()),
            builder,
            BlsKeyPair::from_ikm(&[33u8; 32]).unwrap(),
        )
        .unwrap()
    }

    async fn step(driver: &mut ConsensusDriver, slot: i64) -> SlotAction {
        let action = driver.on_slot(slot).unwrap();
        driver.drain_steps().await.unwrap();
        action
    }

    fn external_only() -> ConsensusBehavior {
        ConsensusBehavior {
            proposal_freq: 0.0,
            ..ConsensusBehavior::steady()
        }
    }

    fn always_propose() -> ConsensusBehavior {
        ConsensusBehavior {
            proposal_freq: 1.0,
            ..ConsensusBehavior::steady()
        }
    }

    // =============================================================================
    // FLOWS
    // =============================================================================

    #[tokio::test]
    async fn test_external_blocks_become_engine_head() {
        let relay = start_relay().await;
        let mut driver = driver(&relay, external_only(), false);

        assert_eq!(step(&mut driver, 0).await, SlotAction::Genesis);
        for slot in 1..=5 {
            assert_eq!(
                step(&mut driver, slot).await,
                SlotAction::External { number: slot as u64 }
            );
        }

        let head = driver.chain().lock().current_header();
        assert_eq!(head.number, 5);
        assert_eq!(head.timestamp, 1_060);
        {
            let engine_chain = relay.engine.chain().lock();
            assert_eq!(engine_chain.head_hash(), head.hash());
            assert_eq!(engine_chain.current_header().number, 5);
        }

        relay.stop().await;
    }

    #[tokio::test]
    async fn test_invalid_hash_slot_is_tolerated() {
        let relay = start_relay().await;
        let mut driver = driver(
            &relay,
            ConsensusBehavior {
                invalid_hash_freq: 1.0,
                ..external_only()
            },
            false,
        );

        assert_eq!(step(&mut driver, 1).await, SlotAction::InvalidHash);
        assert_eq!(driver.chain().lock().current_header().number, 0);
        assert_eq!(relay.engine.chain().lock().current_header().number, 0);

        relay.stop().await;
    }

    #[tokio::test]
    async fn test_engine_proposals_alternate_with_external_blocks() {
        let relay = start_relay().await;
        let mut driver = driver(&relay, always_propose(), false);

        assert!(matches!(step(&mut driver, 1).await, SlotAction::External { .. }));
        assert_eq!(step(&mut driver, 2).await, SlotAction::Proposal);
        assert!(matches!(step(&mut driver, 3).await, SlotAction::External { .. }));
        assert_eq!(step(&mut driver, 4).await, SlotAction::Proposal);

        let head = driver.chain().lock().current_header();
        assert_eq!(head.number, 4);
        assert_eq!(head.timestamp, 1_048);
        assert_eq!(head.coinbase, proposal_fee_recipient());
        assert!(relay.engine.chain().lock().block_by_hash(&head.hash()).is_some());

        relay.stop().await;
    }

    #[tokio::test]
    async fn test_builder_proposals_end_to_end() {
        let relay = start_relay().await;
        let mut driver = driver(&relay, always_propose(), true);

        assert!(matches!(step(&mut driver, 1).await, SlotAction::External { .. }));
        assert_eq!(step(&mut driver, 2).await, SlotAction::Proposal);

        let head = driver.chain().lock().current_header();
        assert_eq!(head.number, 2);
        assert_eq!(head.timestamp, 1_024);
        assert_eq!(head.coinbase, proposal_fee_recipient());
        assert!(relay.engine.chain().lock().block_by_hash(&head.hash()).is_some());

        relay.stop().await;
    }

    #[tokio::test]
    async fn test_bounded_run_yields_one_block_per_slot() {
        let relay = start_relay().await;
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs();
        let config = DriverConfig {
            genesis_time: now + 1,
            slot_time: Duration::from_millis(500),
            slot_bound: 5,
            ..config(external_only())
        };
        let chain = fresh_chain();
        let driver = driver_on(&relay, config, Arc::clone(&chain), false);

        let (_shutdown, rx) = watch::channel(false);
        let outcome = tokio::time::timeout(Duration::from_secs(30), driver.run(rx))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome, RunOutcome::Completed { slots: 5 });

        let head = chain.lock().current_header();
        assert_eq!(head.number, 5);
        assert_eq!(relay.engine.chain().lock().head_hash(), head.hash());

        // Walk back to genesis: every block sits exactly one above its parent.
        let mut cursor = head;
        while cursor.number > 0 {
            let parent = chain.lock().header_by_hash(&cursor.parent_hash).unwrap();
            assert_eq!(parent.number + 1, cursor.number);
            cursor = parent;
        }
        assert_eq!(cursor.hash(), chain.lock().header_by_number(0).unwrap().hash());

        relay.stop().await;
    }

    #[tokio::test]
    async fn test_engine_chain_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let relay = start_relay_with(Some(dir.path().to_path_buf())).await;
        let mut driver = driver(&relay, external_only(), false);
        for slot in 1..=3 {
            step(&mut driver, slot).await;
        }
        let head = driver.chain().lock().current_header().hash();
        relay.stop().await;

        let reopened = MockChain::open(GenesisSpec::default(), Some(dir.path())).unwrap();
        assert_eq!(reopened.head_hash(), head);
        assert_eq!(reopened.current_header().number, 3);
    }
}
