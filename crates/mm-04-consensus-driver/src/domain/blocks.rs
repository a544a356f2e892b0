//! Blocks and payloads the driver fabricates itself.

use mm_02_mock_chain::{BlockTemplate, ChainError, DynamicFeeTransaction, Header};
use shared_crypto::TestAccount;
use shared_types::{Address, ExecutionPayloadV1, Hash, HexBytes, PayloadAttributesV1, U256};

use super::slot::SlotClock;

pub const EXTERNAL_EXTRA_DATA: &[u8] = b"proto says hi";
/// Block hash of the deliberately broken payload.
pub const INVALID_BLOCK_HASH: u64 = 0xdeadbeef;

const SAMPLE_TX_GAS: u64 = 30_000;
const SAMPLE_TX_MAX_FEE: u64 = 5_000_000_000;
const SAMPLE_TX_TIP: u64 = 2;

/// `0x01000…`: coinbase of locally mined blocks.
pub fn external_coinbase() -> Address {
    let mut bytes = [0u8; 20];
    bytes[0] = 0x01;
    Address::from(bytes)
}

/// `0x1337000…`: fee recipient requested from the engine.
pub fn proposal_fee_recipient() -> Address {
    let mut bytes = [0u8; 20];
    bytes[0] = 0x13;
    bytes[1] = 0x37;
    Address::from(bytes)
}

/// One EIP-1559 self-transfer from the first account, or nothing when there
/// are no accounts.
pub fn sample_transactions(
    chain_id: u64,
    accounts: &[TestAccount],
    nonce: u64,
) -> Result<Vec<HexBytes>, ChainError> {
    let Some(sender) = accounts.first() else {
        return Ok(vec![]);
    };
    let tx = DynamicFeeTransaction {
        chain_id,
        nonce,
        max_priority_fee_per_gas: U256::from(SAMPLE_TX_TIP),
        max_fee_per_gas: U256::from(SAMPLE_TX_MAX_FEE),
        gas_limit: SAMPLE_TX_GAS,
        to: Address::from(sender.address()),
        value: U256::zero(),
        data: vec![],
    };
    Ok(vec![tx.sign(sender.keypair())?.encode()])
}

/// Template of a block mined locally in `slot` on `parent`.
pub fn external_template(
    clock: &SlotClock,
    slot: u64,
    parent: &Header,
    transactions: Vec<HexBytes>,
) -> BlockTemplate {
    BlockTemplate {
        coinbase: external_coinbase(),
        timestamp: clock.slot_timestamp(slot),
        gas_limit: parent.gas_limit,
        extra_data: HexBytes(EXTERNAL_EXTRA_DATA.to_vec()),
        mix_hash: Hash::zero(),
        transactions,
    }
}

/// A payload on `head` whose declared hash cannot be right.
pub fn invalid_hash_payload(head: &Header) -> ExecutionPayloadV1 {
    ExecutionPayloadV1 {
        parent_hash: head.hash(),
        fee_recipient: Address::zero(),
        state_root: Hash::zero(),
        receipts_root: Hash::zero(),
        logs_bloom: HexBytes(vec![0; 256]),
        prev_randao: Hash::zero(),
        block_number: head.number,
        gas_limit: head.gas_limit,
        gas_used: 0,
        timestamp: head.timestamp + 1,
        extra_data: HexBytes::default(),
        base_fee_per_gas: head.base_fee_per_gas.unwrap_or_default(),
        block_hash: Hash::from_low_u64_be(INVALID_BLOCK_HASH),
        transactions: vec![],
    }
}

/// Attributes asking the engine to build the block of `slot`.
pub fn payload_attributes(clock: &SlotClock, slot: u64, prev_randao: Hash) -> PayloadAttributesV1 {
    PayloadAttributesV1 {
        timestamp: clock.slot_timestamp(slot),
        prev_randao,
        suggested_fee_recipient: proposal_fee_recipient(),
    }
}
