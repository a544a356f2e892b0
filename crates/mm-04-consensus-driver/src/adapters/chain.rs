//! `ChainBackend` over the in-memory mock chain.

use mm_02_mock_chain::{Block, BlockTemplate, ChainError, Header, MockChain};
use shared_types::{Address, ExecutionPayloadV1, Hash, U256};

use crate::ports::ChainBackend;

impl ChainBackend for MockChain {
    fn chain_id(&self) -> u64 {
        MockChain::chain_id(self)
    }

    fn current_header(&self) -> Header {
        MockChain::current_header(self).clone()
    }

    fn current_td(&self) -> U256 {
        MockChain::current_td(self)
    }

    fn terminal_total_difficulty(&self) -> U256 {
        MockChain::terminal_total_difficulty(self)
    }

    fn header_by_hash(&self, hash: &Hash) -> Option<Header> {
        MockChain::header_by_hash(self, hash).cloned()
    }

    fn header_by_number(&self, number: u64) -> Option<Header> {
        MockChain::header_by_number(self, number).cloned()
    }

    fn nonce_at(&self, at: &Hash, address: &Address) -> Result<u64, ChainError> {
        MockChain::nonce_at(self, at, address)
    }

    fn mine_block(&mut self, parent: Hash, template: BlockTemplate) -> Result<Block, ChainError> {
        MockChain::mine_block(self, parent, template)
    }

    fn process_payload(&mut self, payload: &ExecutionPayloadV1) -> Result<Block, ChainError> {
        MockChain::process_payload(self, payload)
    }

    fn close(&self) -> Result<(), ChainError> {
        MockChain::close(self)
    }
}
