//! # Mock Chain
//!
//! In-memory block tree with a canonical index. Blocks are executed against
//! their parent's account state on insert, so a payload whose roots or gas
//! usage disagree with re-execution is rejected.
//!
//! Pre-merge blocks carry the genesis difficulty; a block whose parent has
//! reached the terminal total difficulty is a proof-of-stake block with zero
//! difficulty.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use primitive_types::U256;
use shared_types::{Address, Bloom, ExecutionPayloadV1, Hash, HexBytes};
use tracing::{debug, info};

use crate::domain::block::{receipts_root, transactions_root, Block, Header, EMPTY_OMMERS_HASH};
use crate::domain::fee::next_base_fee;
use crate::domain::genesis::GenesisSpec;
use crate::domain::state::AccountNonces;
use crate::domain::transaction::SignedTransaction;
use crate::error::{ChainError, Result};
use crate::snapshot::{self, ChainSnapshot, StoredBlock};

/// What the caller chooses when building a block; everything else is derived
/// from the parent and execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockTemplate {
    pub coinbase: Address,
    pub timestamp: u64,
    pub gas_limit: u64,
    pub extra_data: HexBytes,
    pub mix_hash: Hash,
    pub transactions: Vec<HexBytes>,
}

struct Execution {
    state: AccountNonces,
    gas_used: u64,
    cumulative_gas: Vec<u64>,
}

pub struct MockChain {
    genesis: GenesisSpec,
    genesis_hash: Hash,
    blocks: HashMap<Hash, StoredBlock>,
    canonical: BTreeMap<u64, Hash>,
    head: Hash,
    snapshot_path: Option<PathBuf>,
}

impl MockChain {
    /// Fresh in-memory chain holding only the genesis block.
    pub fn new(genesis: GenesisSpec) -> Self {
        let state = AccountNonces::default();
        let block = genesis_block(&genesis, &state);
        let genesis_hash = block.hash();
        let stored = StoredBlock {
            total_difficulty: block.header.difficulty,
            block,
            state,
        };

        let mut blocks = HashMap::new();
        blocks.insert(genesis_hash, stored);
        let mut canonical = BTreeMap::new();
        canonical.insert(0, genesis_hash);

        Self {
            genesis,
            genesis_hash,
            blocks,
            canonical,
            head: genesis_hash,
            snapshot_path: None,
        }
    }

    /// Chain backed by a snapshot in `datadir`, or in-memory only without one.
    pub fn open(genesis: GenesisSpec, datadir: Option<&Path>) -> Result<Self> {
        let mut chain = Self::new(genesis);
        let Some(dir) = datadir else {
            return Ok(chain);
        };
        let path = snapshot::snapshot_path(dir);

        if let Some(saved) = snapshot::load(&path)? {
            if saved.genesis_hash != chain.genesis_hash {
                return Err(ChainError::Snapshot(format!(
                    "snapshot genesis {:?} does not match genesis file {:?}",
                    saved.genesis_hash, chain.genesis_hash
                )));
            }
            for stored in saved.blocks {
                chain.blocks.insert(stored.block.hash(), stored);
            }
            chain.set_head(saved.head)?;
            info!(
                blocks = chain.blocks.len(),
                head = ?chain.head,
                "Loaded chain snapshot"
            );
        }
        chain.snapshot_path = Some(path);
        Ok(chain)
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    pub fn genesis_hash(&self) -> Hash {
        self.genesis_hash
    }

    pub fn chain_id(&self) -> u64 {
        self.genesis.chain_id
    }

    pub fn terminal_total_difficulty(&self) -> U256 {
        self.genesis.terminal_total_difficulty
    }

    pub fn head_hash(&self) -> Hash {
        self.head
    }

    pub fn current_header(&self) -> &Header {
        &self.stored(&self.head).block.header
    }

    pub fn current_td(&self) -> U256 {
        self.stored(&self.head).total_difficulty
    }

    pub fn td_of(&self, hash: &Hash) -> Option<U256> {
        self.blocks.get(hash).map(|s| s.total_difficulty)
    }

    pub fn block_by_hash(&self, hash: &Hash) -> Option<&Block> {
        self.blocks.get(hash).map(|s| &s.block)
    }

    pub fn header_by_hash(&self, hash: &Hash) -> Option<&Header> {
        self.block_by_hash(hash).map(|b| &b.header)
    }

    /// Canonical header at `number`.
    pub fn header_by_number(&self, number: u64) -> Option<&Header> {
        self.canonical
            .get(&number)
            .and_then(|hash| self.header_by_hash(hash))
    }

    /// Nonce of `address` in the state after block `at`.
    pub fn nonce_at(&self, at: &Hash, address: &Address) -> Result<u64> {
        self.blocks
            .get(at)
            .map(|s| s.state.nonce(address))
            .ok_or(ChainError::UnknownBlock(*at))
    }

    /// Whether children of `parent` are proof-of-stake blocks.
    pub fn is_transitioned_at(&self, parent: &Hash) -> Result<bool> {
        let td = self.td_of(parent).ok_or(ChainError::UnknownBlock(*parent))?;
        Ok(td >= self.genesis.terminal_total_difficulty)
    }

    // =========================================================================
    // BLOCK PRODUCTION AND IMPORT
    // =========================================================================

    /// Execute `template` on `parent` and seal the result, without importing it.
    pub fn build_block(&self, parent_hash: Hash, template: BlockTemplate) -> Result<Block> {
        let parent = self
            .blocks
            .get(&parent_hash)
            .ok_or(ChainError::UnknownParent(parent_hash))?;
        let parent_header = &parent.block.header;

        let base_fee = next_base_fee(parent_header);
        let execution = self.execute(
            &parent.state,
            base_fee,
            template.gas_limit,
            &template.transactions,
        )?;
        let difficulty = if parent.total_difficulty >= self.genesis.terminal_total_difficulty {
            U256::zero()
        } else {
            self.genesis.difficulty.max(U256::one())
        };

        let header = Header {
            parent_hash,
            ommers_hash: Hash::from(EMPTY_OMMERS_HASH),
            coinbase: template.coinbase,
            state_root: execution.state.root(),
            transactions_root: transactions_root(&template.transactions),
            receipts_root: receipts_root(&execution.cumulative_gas),
            logs_bloom: Bloom::default(),
            difficulty,
            number: parent_header.number + 1,
            gas_limit: template.gas_limit,
            gas_used: execution.gas_used,
            timestamp: template.timestamp,
            extra_data: template.extra_data,
            mix_hash: template.mix_hash,
            nonce: 0,
            base_fee_per_gas: Some(base_fee),
        };
        Ok(Block {
            header,
            transactions: template.transactions,
        })
    }

    /// Import `block` after re-executing it. Importing a known block is a no-op.
    ///
    /// Does not move the head.
    pub fn insert_block(&mut self, block: Block) -> Result<Hash> {
        let hash = block.hash();
        if self.blocks.contains_key(&hash) {
            return Ok(hash);
        }

        let parent_hash = block.parent_hash();
        let parent = self
            .blocks
            .get(&parent_hash)
            .ok_or(ChainError::UnknownParent(parent_hash))?;
        let header = &block.header;
        if header.number != parent.block.number() + 1 {
            return Err(ChainError::MalformedPayload(format!(
                "block number {} does not follow parent {}",
                header.number,
                parent.block.number()
            )));
        }
        let expected_base_fee = next_base_fee(&parent.block.header);
        if header.base_fee_per_gas != Some(expected_base_fee) {
            return Err(ChainError::MalformedPayload(format!(
                "base fee {:?}, expected {expected_base_fee}",
                header.base_fee_per_gas
            )));
        }

        let execution = self.execute(
            &parent.state,
            expected_base_fee,
            header.gas_limit,
            &block.transactions,
        )?;
        if execution.gas_used != header.gas_used {
            return Err(ChainError::MalformedPayload(format!(
                "gas used {}, execution used {}",
                header.gas_used, execution.gas_used
            )));
        }
        if execution.state.root() != header.state_root {
            return Err(ChainError::MalformedPayload("state root mismatch".to_string()));
        }
        if receipts_root(&execution.cumulative_gas) != header.receipts_root {
            return Err(ChainError::MalformedPayload("receipts root mismatch".to_string()));
        }

        let total_difficulty = parent.total_difficulty + header.difficulty;
        debug!(
            number = header.number,
            block_hash = ?hash,
            parent_hash = ?parent_hash,
            txs = block.transactions.len(),
            "Imported block"
        );
        self.blocks.insert(
            hash,
            StoredBlock {
                block,
                total_difficulty,
                state: execution.state,
            },
        );
        Ok(hash)
    }

    /// Build on `parent`, import, and make the new block the head.
    pub fn mine_block(&mut self, parent_hash: Hash, template: BlockTemplate) -> Result<Block> {
        let block = self.build_block(parent_hash, template)?;
        let hash = self.insert_block(block.clone())?;
        self.set_head(hash)?;
        Ok(block)
    }

    /// Import an engine payload without moving the head.
    pub fn insert_payload(&mut self, payload: &ExecutionPayloadV1) -> Result<Block> {
        let block = Block::from_payload(payload)?;
        self.insert_block(block.clone())?;
        Ok(block)
    }

    /// Import an engine payload and make it the head.
    pub fn process_payload(&mut self, payload: &ExecutionPayloadV1) -> Result<Block> {
        let block = self.insert_payload(payload)?;
        self.set_head(block.hash())?;
        Ok(block)
    }

    /// Move the head, rewriting the canonical index back to the fork point.
    pub fn set_head(&mut self, hash: Hash) -> Result<()> {
        let number = self
            .blocks
            .get(&hash)
            .map(|s| s.block.number())
            .ok_or(ChainError::UnknownBlock(hash))?;

        self.canonical.retain(|height, _| *height <= number);
        let mut cursor = hash;
        loop {
            let (height, parent) = self
                .blocks
                .get(&cursor)
                .map(|s| (s.block.number(), s.block.parent_hash()))
                .ok_or(ChainError::UnknownBlock(cursor))?;
            if self.canonical.get(&height) == Some(&cursor) {
                break;
            }
            self.canonical.insert(height, cursor);
            if height == 0 {
                break;
            }
            cursor = parent;
        }

        if self.head != hash {
            debug!(number, head = ?hash, previous = ?self.head, "Head updated");
        }
        self.head = hash;
        Ok(())
    }

    /// Persist the snapshot, if the chain has a data directory.
    pub fn close(&self) -> Result<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        let snapshot = ChainSnapshot {
            genesis_hash: self.genesis_hash,
            head: self.head,
            blocks: self
                .blocks
                .iter()
                .filter(|(hash, _)| **hash != self.genesis_hash)
                .map(|(_, stored)| stored.clone())
                .collect(),
        };
        snapshot::save(path, &snapshot)?;
        info!(path = %path.display(), blocks = snapshot.blocks.len(), "Saved chain snapshot");
        Ok(())
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    // Every hash reachable from `head` or a stored parent link is present.
    fn stored(&self, hash: &Hash) -> &StoredBlock {
        &self.blocks[hash]
    }

    fn execute(
        &self,
        parent_state: &AccountNonces,
        base_fee: U256,
        gas_limit: u64,
        transactions: &[HexBytes],
    ) -> Result<Execution> {
        let mut state = parent_state.clone();
        let mut gas_used = 0u64;
        let mut cumulative_gas = Vec::with_capacity(transactions.len());

        for raw in transactions {
            let signed = SignedTransaction::decode(raw.as_slice())?;
            let tx = &signed.tx;
            if tx.chain_id != self.genesis.chain_id {
                return Err(ChainError::InvalidTransaction(format!(
                    "chain id {}, expected {}",
                    tx.chain_id, self.genesis.chain_id
                )));
            }
            if tx.max_fee_per_gas < base_fee {
                return Err(ChainError::InvalidTransaction(format!(
                    "max fee {} below base fee {base_fee}",
                    tx.max_fee_per_gas
                )));
            }
            let intrinsic = tx.intrinsic_gas();
            if tx.gas_limit < intrinsic {
                return Err(ChainError::InvalidTransaction(format!(
                    "gas limit {} below intrinsic gas {intrinsic}",
                    tx.gas_limit
                )));
            }

            let sender = signed.recover_sender()?;
            let expected = state.nonce(&sender);
            if tx.nonce != expected {
                return Err(ChainError::NonceMismatch {
                    sender: format!("{sender:?}"),
                    expected,
                    actual: tx.nonce,
                });
            }

            gas_used += intrinsic;
            if gas_used > gas_limit {
                return Err(ChainError::InvalidTransaction(format!(
                    "block gas limit {gas_limit} exceeded"
                )));
            }
            state.increment(sender);
            cumulative_gas.push(gas_used);
        }

        Ok(Execution {
            state,
            gas_used,
            cumulative_gas,
        })
    }
}

fn genesis_block(genesis: &GenesisSpec, state: &AccountNonces) -> Block {
    Block {
        header: Header {
            parent_hash: Hash::zero(),
            ommers_hash: Hash::from(EMPTY_OMMERS_HASH),
            coinbase: genesis.coinbase,
            state_root: state.root(),
            transactions_root: transactions_root(&[]),
            receipts_root: receipts_root(&[]),
            logs_bloom: Bloom::default(),
            difficulty: genesis.difficulty,
            number: 0,
            gas_limit: genesis.gas_limit,
            gas_used: 0,
            timestamp: genesis.timestamp,
            extra_data: genesis.extra_data.clone(),
            mix_hash: genesis.mix_hash,
            nonce: 0,
            base_fee_per_gas: genesis.base_fee_per_gas,
        },
        transactions: vec![],
    }
}
