//! # Consensus Driver Service
//!
//! One task ticks once per slot and decides, in a fixed order, what the slot
//! does:
//!
//! 1. stop once past the slot bound
//! 2. rotate finality on epoch boundaries
//! 3. gap slot: nothing is produced, a pending proposal is dropped
//! 4. invalid-hash slot: a wrong-hash payload is sent to the engine
//! 5. pick the parent, possibly an ancestor (reorg)
//! 6. propose the payload the engine prepared for this slot, if any
//! 7. otherwise mine an external block on the parent
//! 8. hand the block to the engine and update forkchoice in the background
//!
//! Background steps run in a [`JoinSet`] that is reaped every tick; their
//! failures end a bounded run and are logged in an unbounded one.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use mm_02_mock_chain::{GenesisSpec, MockChain};
use shared_crypto::{BlsKeyPair, JwtSecret, TestAccount};
use shared_types::{proposer_domain, Address, BELLATRIX_FORK_VERSION};
use tokio::sync::watch;
use tokio::task::{JoinError, JoinSet};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::adapters::{HttpBuilderClient, HttpEngineClient, LocalStatus, PeerAddress, TcpLegacyPeer};
use crate::config::DriverConfig;
use crate::domain::blocks::{
    external_template, invalid_hash_payload, payload_attributes, sample_transactions,
};
use crate::domain::{
    reorg_target, FinalityTracker, PendingProposal, ProposalMailbox, SlotBehavior, SlotClock,
};
use crate::error::{DriverError, Result};
use crate::pipeline::{self, PipelineContext};
use crate::ports::{BuilderApi, EngineApi, LegacyPeer, SharedChain};
use crate::prologue;

/// Slots before genesis during which the countdown is logged.
const COUNTDOWN_SLOTS: i64 = 10;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every slot up to the bound was driven.
    Completed { slots: u64 },
    /// The shutdown signal arrived first.
    Interrupted,
}

/// What a slot decided, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotAction {
    PreGenesis,
    Genesis,
    BoundReached,
    Gap,
    InvalidHash,
    Proposal,
    External { number: u64 },
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepKind {
    Execution,
    InvalidHash,
    Proposal,
}

struct StepReport {
    slot: u64,
    kind: StepKind,
    result: Result<()>,
}

pub struct ConsensusDriver {
    config: DriverConfig,
    clock: SlotClock,
    ctx: PipelineContext,
    behavior: SlotBehavior,
    accounts: Vec<TestAccount>,
    finality: FinalityTracker,
    transition_block: u64,
    mailbox: ProposalMailbox,
    steps: JoinSet<StepReport>,
    last_slot: Option<i64>,
}

impl ConsensusDriver {
    pub fn new(
        config: DriverConfig,
        chain: SharedChain,
        engine: Arc<dyn EngineApi>,
        builder: Option<Arc<dyn BuilderApi>>,
        proposer: BlsKeyPair,
    ) -> Result<Self> {
        config.validate()?;
        let clock = SlotClock::new(config.genesis_time, config.slot_time);
        let accounts = TestAccount::derive_many(config.behavior.test_accounts)
            .map_err(|e| DriverError::Setup(format!("cannot derive test accounts: {e}")))?;
        let ctx = PipelineContext {
            engine,
            builder,
            chain,
            proposer: Arc::new(proposer),
            proposer_domain: proposer_domain(BELLATRIX_FORK_VERSION, config.genesis_validators_root),
            clock,
            timeout: config.request_timeout,
        };
        Ok(Self {
            behavior: SlotBehavior::new(config.behavior.clone()),
            config,
            clock,
            ctx,
            accounts,
            finality: FinalityTracker::default(),
            transition_block: 0,
            mailbox: ProposalMailbox::default(),
            steps: JoinSet::new(),
            last_slot: None,
        })
    }

    /// Wire the driver to the endpoints named in `config`: load the JWT
    /// secret and genesis, open the chain, and run the proof-of-work
    /// prologue when a legacy peer is configured.
    pub async fn connect(config: DriverConfig) -> Result<Self> {
        config.validate()?;
        let secret = JwtSecret::load(&config.jwt_secret_path).map_err(|e| {
            DriverError::Setup(format!(
                "unable to read JWT secret {}: {e}",
                config.jwt_secret_path.display()
            ))
        })?;
        info!(path = %config.jwt_secret_path.display(), "Loaded JWT secret");

        let genesis = GenesisSpec::load(&config.genesis_path)
            .map_err(|e| DriverError::Setup(format!("unable to load genesis: {e}")))?;
        let chain = MockChain::open(genesis, config.datadir.as_deref())
            .map_err(|e| DriverError::Setup(format!("unable to initialize mock chain: {e}")))?;
        let chain: SharedChain = Arc::new(parking_lot::Mutex::new(chain));

        let engine = HttpEngineClient::new(&config.engine_addr, secret, config.request_timeout)
            .map_err(|e| DriverError::Setup(format!("unable to create engine client: {e}")))?;
        let builder = match &config.builder_addr {
            Some(addr) => {
                let client = HttpBuilderClient::new(addr, config.request_timeout).map_err(|e| {
                    DriverError::Setup(format!("unable to create builder client: {e}"))
                })?;
                Some(Arc::new(client) as Arc<dyn BuilderApi>)
            }
            None => None,
        };
        let proposer = BlsKeyPair::generate()
            .map_err(|e| DriverError::Setup(format!("unable to generate bls key pair: {e}")))?;

        let peer = config.peer.clone();
        let mut driver = Self::new(config, chain, Arc::new(engine), builder, proposer)?;
        match peer {
            Some(enode) => driver.bootstrap_from_peer(&enode).await?,
            None => info!("No peer, skipping pre-merge transition simulation, starting in POS mode"),
        }
        Ok(driver)
    }

    async fn bootstrap_from_peer(&mut self, enode: &str) -> Result<()> {
        if prologue::starts_transitioned(&*self.ctx.chain.lock()) {
            info!("Genesis is already transitioned, skipping proof-of-work prologue");
            return Ok(());
        }
        let address = enode
            .parse::<PeerAddress>()
            .map_err(|e| DriverError::Setup(e.to_string()))?;
        let local = {
            let chain = self.ctx.chain.lock();
            let head = chain.current_header();
            LocalStatus {
                chain_id: chain.chain_id(),
                genesis_hash: chain
                    .header_by_number(0)
                    .map(|h| h.hash())
                    .unwrap_or_else(|| head.hash()),
                head,
                total_difficulty: chain.current_td(),
            }
        };
        let mut peer = TcpLegacyPeer::connect(address, local, self.config.request_timeout)
            .await
            .map_err(|e| DriverError::Setup(format!("unable to peer with client: {e}")))?;
        self.run_prologue(&mut peer)
            .await
            .map_err(|e| DriverError::Setup(format!("failed to complete POW prologue: {e}")))?;
        Ok(())
    }

    /// Feed pre-merge blocks to `peer` until the transition.
    pub async fn run_prologue(&mut self, peer: &mut dyn LegacyPeer) -> Result<u64> {
        let number =
            prologue::run_prologue(&self.ctx.chain, peer, &mut self.behavior, &self.accounts)
                .await?;
        self.transition_block = number;
        Ok(number)
    }

    pub fn clock(&self) -> &SlotClock {
        &self.clock
    }

    pub fn chain(&self) -> &SharedChain {
        &self.ctx.chain
    }

    pub fn finality(&self) -> &FinalityTracker {
        &self.finality
    }

    pub fn transition_block(&self) -> u64 {
        self.transition_block
    }

    // =========================================================================
    // SLOT LOOP
    // =========================================================================

    /// Drive slots until the bound is reached or `shutdown` flips to `true`.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<RunOutcome> {
        let first_tick = Instant::now() + self.clock.until_next_slot(SystemTime::now());
        let mut ticker = interval_at(first_tick, self.clock.slot_time());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(
            genesis_time = self.clock.genesis_time(),
            slot_time = ?self.clock.slot_time(),
            slot_bound = self.config.slot_bound,
            "Consensus mock node started"
        );

        let outcome = loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = self.reap_steps() {
                        break Err(err);
                    }
                    let slot = self.clock.slot_at(SystemTime::now() + self.tick_tolerance());
                    if self.last_slot.is_some_and(|last| slot <= last) {
                        continue;
                    }
                    self.last_slot = Some(slot);

                    match self.on_slot(slot) {
                        Ok(SlotAction::BoundReached) => {
                            break self.drain_steps().await.map(|()| RunOutcome::Completed {
                                slots: self.config.slot_bound,
                            });
                        }
                        Ok(action) => debug!(slot, ?action, "Slot done"),
                        Err(err) if self.config.is_bounded() => break Err(err),
                        Err(err) => error!(slot, %err, "Slot failed"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break Ok(RunOutcome::Interrupted);
                    }
                }
            }
        };

        if let Ok(RunOutcome::Completed { slots }) = &outcome {
            info!(test_runs = slots, "All test runs successfully completed");
        }
        self.close().await;
        outcome
    }

    /// Ticks land on slot boundaries; evaluate slightly late so clock jitter
    /// cannot land in the previous slot.
    fn tick_tolerance(&self) -> Duration {
        self.clock.slot_time() / 10
    }

    /// Decide and start the work of `slot`.
    pub fn on_slot(&mut self, slot: i64) -> Result<SlotAction> {
        if slot < 0 {
            if slot >= -COUNTDOWN_SLOTS {
                info!(remaining_slots = -slot, "Counting down to genesis...");
            }
            return Ok(SlotAction::PreGenesis);
        }
        if slot == 0 {
            let head = self.ctx.chain.lock().current_header().hash();
            self.finality.on_genesis(head);
            info!(slot = 0, "Genesis!");
            return Ok(SlotAction::Genesis);
        }
        let slot = slot as u64;

        if self.config.is_bounded() && slot > self.config.slot_bound {
            return Ok(SlotAction::BoundReached);
        }

        if slot % self.config.slots_per_epoch == 0 {
            let head = self.ctx.chain.lock().current_header().hash();
            let rotation = self.finality.rotate(head);
            info!(
                slot,
                last = ?rotation.previous,
                new = ?rotation.finalized,
                next = ?rotation.next,
                "Finalized block updated"
            );
        }

        if self.behavior.gap() {
            info!(slot, "Mocking gap slot, no payload execution here");
            if let Some(dropped) = self.mailbox.take() {
                debug!(slot, payload_id = %dropped.payload_id, "Dropped pending proposal");
            }
            return Ok(SlotAction::Gap);
        }

        if self.behavior.invalid_hash() {
            info!(slot, "Sending payload with invalid hash");
            let payload = invalid_hash_payload(&self.ctx.chain.lock().current_header());
            let ctx = self.ctx.clone();
            self.steps.spawn(async move {
                StepReport {
                    slot,
                    kind: StepKind::InvalidHash,
                    result: pipeline::submit_invalid(ctx, payload).await,
                }
            });
            return Ok(SlotAction::InvalidHash);
        }

        let parent = {
            let chain = self.ctx.chain.lock();
            let head = chain.current_header();
            if self.behavior.reorg() {
                let floor = chain
                    .header_by_hash(&self.finality.finalized())
                    .map(|h| h.number)
                    .unwrap_or(0)
                    .max(self.transition_block);
                let target = reorg_target(head.number, self.behavior.reorg_depth(), floor);
                chain.header_by_number(target).unwrap_or(head)
            } else {
                head
            }
        };
        info!(slot, previous = ?parent.hash(), "Slot trigger");

        if let Some(pending) = self.take_pending(slot) {
            info!(slot, payload_id = %pending.payload_id, "Update forkchoice to block built by engine");
            let ctx = self.ctx.clone();
            self.steps.spawn(async move {
                StepReport {
                    slot,
                    kind: StepKind::Proposal,
                    result: pipeline::propose(ctx, pending.payload_id, slot)
                        .await
                        .map(|_| ()),
                }
            });
            return Ok(SlotAction::Proposal);
        }

        debug!(slot, "Mocking external block");
        let block = {
            let mut chain = self.ctx.chain.lock();
            let sender = self.accounts
                .first()
                .map(|a| Address::from(a.address()))
                .unwrap_or_default();
            let nonce = chain.nonce_at(&parent.hash(), &sender)?;
            let transactions = sample_transactions(chain.chain_id(), &self.accounts, nonce)?;
            let template = external_template(&self.clock, slot, &parent, transactions);
            chain.mine_block(parent.hash(), template)
        };
        let block = match block {
            Ok(block) => block,
            Err(err) => {
                error!(slot, %err, "Failed to add block");
                return Ok(SlotAction::Failed);
            }
        };
        debug!(slot, block_hash = ?block.hash(), "Built external block");

        let attributes = if self.behavior.propose() {
            Some(payload_attributes(&self.clock, slot + 1, self.behavior.random_hash()))
        } else {
            None
        };
        let state = self.finality.forkchoice(block.hash());
        let ctx = self.ctx.clone();
        let mailbox = self.mailbox.clone();
        let payload = block.to_payload();
        self.steps.spawn(async move {
            let result = pipeline::execute_block(ctx, payload, state, attributes)
                .await
                .map(|payload_id| {
                    if let Some(payload_id) = payload_id {
                        let proposal = PendingProposal {
                            payload_id,
                            slot: slot + 1,
                        };
                        if let Some(stale) = mailbox.post(proposal) {
                            debug!(slot, payload_id = %stale.payload_id, "Replaced unconsumed proposal");
                        }
                    }
                });
            StepReport {
                slot,
                kind: StepKind::Execution,
                result,
            }
        });
        Ok(SlotAction::External {
            number: block.number(),
        })
    }

    /// Pending proposal prepared for `slot`; one prepared for another slot is
    /// discarded.
    fn take_pending(&self, slot: u64) -> Option<PendingProposal> {
        let pending = self.mailbox.take()?;
        if pending.slot != slot {
            warn!(
                slot,
                prepared_for = pending.slot,
                payload_id = %pending.payload_id,
                "Discarding proposal prepared for another slot"
            );
            return None;
        }
        Some(pending)
    }

    // =========================================================================
    // BACKGROUND STEPS
    // =========================================================================

    fn reap_steps(&mut self) -> Result<()> {
        while let Some(joined) = self.steps.try_join_next() {
            self.on_step_done(joined)?;
        }
        Ok(())
    }

    /// Wait for every engine and builder step still in flight, surfacing the
    /// first failure.
    pub async fn drain_steps(&mut self) -> Result<()> {
        while let Some(joined) = self.steps.join_next().await {
            self.on_step_done(joined)?;
        }
        Ok(())
    }

    fn on_step_done(&self, joined: std::result::Result<StepReport, JoinError>) -> Result<()> {
        let (slot, kind, result) = match joined {
            Ok(report) => (Some(report.slot), Some(report.kind), report.result),
            Err(err) if err.is_cancelled() => return Ok(()),
            Err(err) => {
                let err = DriverError::Consistency(format!("background step panicked: {err}"));
                (None, None, Err(err))
            }
        };
        let Err(err) = result else {
            return Ok(());
        };
        error!(?slot, step = ?kind, %err, "Background step failed");
        if self.config.is_bounded() {
            return Err(err);
        }
        Ok(())
    }

    async fn close(&mut self) {
        info!("Closing consensus mock node");
        self.steps.shutdown().await;
        if let Err(err) = self.ctx.chain.lock().close() {
            error!(%err, "Failed closing mock chain");
        }
    }
}
