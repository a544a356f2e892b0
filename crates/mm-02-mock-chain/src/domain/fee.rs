//! EIP-1559 base fee progression.

use primitive_types::U256;

use super::block::Header;
use super::genesis::INITIAL_BASE_FEE;

const ELASTICITY_MULTIPLIER: u64 = 2;
const BASE_FEE_CHANGE_DENOMINATOR: u64 = 8;

/// Base fee of a child of `parent`.
pub fn next_base_fee(parent: &Header) -> U256 {
    let Some(parent_base_fee) = parent.base_fee_per_gas else {
        return U256::from(INITIAL_BASE_FEE);
    };
    let target = parent.gas_limit / ELASTICITY_MULTIPLIER;
    if target == 0 || parent.gas_used == target {
        return parent_base_fee;
    }

    if parent.gas_used > target {
        let delta = U256::from(parent.gas_used - target);
        let change = parent_base_fee * delta
            / U256::from(target)
            / U256::from(BASE_FEE_CHANGE_DENOMINATOR);
        parent_base_fee + change.max(U256::one())
    } else {
        let delta = U256::from(target - parent.gas_used);
        let change = parent_base_fee * delta
            / U256::from(target)
            / U256::from(BASE_FEE_CHANGE_DENOMINATOR);
        parent_base_fee.saturating_sub(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::block::EMPTY_OMMERS_HASH;
    use shared_types::{Address, Bloom, Hash, HexBytes};

    fn parent(gas_used: u64, base_fee: Option<u64>) -> Header {
        Header {
            parent_hash: Hash::zero(),
            ommers_hash: Hash::from(EMPTY_OMMERS_HASH),
            coinbase: Address::zero(),
            state_root: Hash::zero(),
            transactions_root: Hash::zero(),
            receipts_root: Hash::zero(),
            logs_bloom: Bloom::default(),
            difficulty: U256::zero(),
            number: 1,
            gas_limit: 30_000_000,
            gas_used,
            timestamp: 0,
            extra_data: HexBytes::default(),
            mix_hash: Hash::zero(),
            nonce: 0,
            base_fee_per_gas: base_fee.map(U256::from),
        }
    }

    #[test]
    fn test_at_target_unchanged() {
        assert_eq!(next_base_fee(&parent(15_000_000, Some(1000))), U256::from(1000));
    }

    #[test]
    fn test_full_block_raises_by_eighth() {
        assert_eq!(next_base_fee(&parent(30_000_000, Some(1000))), U256::from(1125));
    }

    #[test]
    fn test_empty_block_lowers_by_eighth() {
        assert_eq!(next_base_fee(&parent(0, Some(1000))), U256::from(875));
    }

    #[test]
    fn test_pre_london_parent_uses_initial_fee() {
        assert_eq!(next_base_fee(&parent(0, None)), U256::from(INITIAL_BASE_FEE));
    }
}
