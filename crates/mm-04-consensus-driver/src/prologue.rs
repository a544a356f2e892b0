//! Proof-of-work prologue.
//!
//! Mines pre-merge blocks without the engine and announces each one to a
//! legacy peer until the chain's total difficulty reaches the terminal
//! total difficulty.

use mm_02_mock_chain::BlockTemplate;
use shared_crypto::TestAccount;
use shared_types::{Address, HexBytes};
use tracing::{debug, info};

use crate::domain::blocks::{external_coinbase, sample_transactions, EXTERNAL_EXTRA_DATA};
use crate::domain::{reorg_target, SlotBehavior};
use crate::error::Result;
use crate::ports::{ChainBackend, LegacyPeer, SharedChain};

/// Whether the chain starts in proof-of-stake and needs no prologue.
pub fn starts_transitioned(chain: &dyn ChainBackend) -> bool {
    chain.terminal_total_difficulty().is_zero()
}

/// Run until the terminal total difficulty is reached and return the number
/// of the transition block.
pub async fn run_prologue(
    chain: &SharedChain,
    peer: &mut dyn LegacyPeer,
    behavior: &mut SlotBehavior,
    accounts: &[TestAccount],
) -> Result<u64> {
    if starts_transitioned(&*chain.lock()) {
        return Ok(0);
    }

    loop {
        let (block, td, ttd) = {
            let mut chain = chain.lock();
            let mut parent = chain.current_header();
            if behavior.reorg() {
                let target = reorg_target(parent.number, behavior.reorg_depth(), 0);
                if let Some(ancestor) = chain.header_by_number(target) {
                    parent = ancestor;
                }
            }

            let sender = accounts
                .first()
                .map(|a| Address::from(a.address()))
                .unwrap_or_default();
            let nonce = chain.nonce_at(&parent.hash(), &sender)?;
            let template = BlockTemplate {
                coinbase: external_coinbase(),
                timestamp: parent.timestamp + 1,
                gas_limit: parent.gas_limit,
                extra_data: HexBytes(EXTERNAL_EXTRA_DATA.to_vec()),
                mix_hash: Default::default(),
                transactions: sample_transactions(chain.chain_id(), accounts, nonce)?,
            };
            let block = chain.mine_block(parent.hash(), template)?;
            (block, chain.current_td(), chain.terminal_total_difficulty())
        };

        peer.announce_block(&block, td).await?;

        debug!(number = block.number(), %td, %ttd, "Comparing TD to terminal TD");
        if td >= ttd {
            info!(
                transition_block = block.number(),
                "Terminal total difficulty reached, transitioning to POS"
            );
            return Ok(block.number());
        }
    }
}
