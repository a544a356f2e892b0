//! # Genesis Specification
//!
//! Reads the subset of a geth-style `genesis.json` the mock chain needs.
//! Numeric fields accept either JSON numbers or hex/decimal strings; values
//! beyond `u64` (large terminal difficulties) must be strings.

use std::path::Path;

use primitive_types::U256;
use serde::{de::Error as DeError, Deserialize, Deserializer};
use shared_types::{Address, Hash, HexBytes};

use crate::error::{ChainError, Result};

/// Chain id used when the genesis file does not name one.
pub const DEFAULT_CHAIN_ID: u64 = 1337;
/// Base fee of the first London block.
pub const INITIAL_BASE_FEE: u64 = 1_000_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenesisSpec {
    pub chain_id: u64,
    pub timestamp: u64,
    pub gas_limit: u64,
    pub difficulty: U256,
    pub extra_data: HexBytes,
    pub coinbase: Address,
    pub mix_hash: Hash,
    pub base_fee_per_gas: Option<U256>,
    /// Zero means the chain starts already transitioned.
    pub terminal_total_difficulty: U256,
}

impl Default for GenesisSpec {
    fn default() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID,
            timestamp: 0,
            gas_limit: 30_000_000,
            difficulty: U256::one(),
            extra_data: HexBytes::default(),
            coinbase: Address::zero(),
            mix_hash: Hash::zero(),
            base_fee_per_gas: Some(U256::from(INITIAL_BASE_FEE)),
            terminal_total_difficulty: U256::zero(),
        }
    }
}

impl GenesisSpec {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ChainError::Genesis(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let file: GenesisFile =
            serde_json::from_str(raw).map_err(|e| ChainError::Genesis(e.to_string()))?;
        let defaults = Self::default();
        let config = file.config.unwrap_or_default();
        Ok(Self {
            chain_id: narrow("chainId", config.chain_id)?.unwrap_or(defaults.chain_id),
            timestamp: narrow("timestamp", file.timestamp)?.unwrap_or(0),
            gas_limit: narrow("gasLimit", file.gas_limit)?.unwrap_or(defaults.gas_limit),
            difficulty: file.difficulty.map(|v| v.0).unwrap_or(defaults.difficulty),
            extra_data: file.extra_data.unwrap_or_default(),
            coinbase: file.coinbase.unwrap_or_default(),
            mix_hash: file.mix_hash.unwrap_or_default(),
            base_fee_per_gas: file.base_fee_per_gas.map(|v| v.0),
            terminal_total_difficulty: config
                .terminal_total_difficulty
                .map(|v| v.0)
                .unwrap_or_default(),
        })
    }

    /// Whether the proof-of-work phase is already over at genesis.
    pub fn starts_transitioned(&self) -> bool {
        self.terminal_total_difficulty.is_zero()
    }
}

fn narrow(field: &str, value: Option<FlexibleNumber>) -> Result<Option<u64>> {
    match value {
        None => Ok(None),
        Some(FlexibleNumber(v)) if v > U256::from(u64::MAX) => {
            Err(ChainError::Genesis(format!("{field} does not fit in 64 bits")))
        }
        Some(FlexibleNumber(v)) => Ok(Some(v.low_u64())),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenesisFile {
    config: Option<ChainConfigFile>,
    timestamp: Option<FlexibleNumber>,
    gas_limit: Option<FlexibleNumber>,
    difficulty: Option<FlexibleNumber>,
    extra_data: Option<HexBytes>,
    coinbase: Option<Address>,
    mix_hash: Option<Hash>,
    base_fee_per_gas: Option<FlexibleNumber>,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChainConfigFile {
    chain_id: Option<FlexibleNumber>,
    terminal_total_difficulty: Option<FlexibleNumber>,
}

/// JSON number, `0x` hex string or decimal string.
struct FlexibleNumber(U256);

impl<'de> Deserialize<'de> for FlexibleNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(Self(U256::from(n))),
            Raw::Text(text) => {
                let parsed = match text.strip_prefix("0x") {
                    Some(digits) => U256::from_str_radix(digits, 16).map_err(|e| format!("{e:?}")),
                    None => U256::from_dec_str(&text).map_err(|e| format!("{e:?}")),
                };
                parsed.map(Self).map_err(D::Error::custom)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_number_formats() {
        let raw = r#"{
            "config": {"chainId": 7, "terminalTotalDifficulty": "58750000000000000000000"},
            "timestamp": "0x10",
            "gasLimit": 30000000,
            "difficulty": "0x400",
            "extraData": "0x",
            "baseFeePerGas": "0x3b9aca00"
        }"#;
        let spec = GenesisSpec::from_json(raw).unwrap();
        assert_eq!(spec.chain_id, 7);
        assert_eq!(spec.timestamp, 16);
        assert_eq!(spec.gas_limit, 30_000_000);
        assert_eq!(spec.difficulty, U256::from(1024));
        assert_eq!(
            spec.terminal_total_difficulty,
            U256::from_dec_str("58750000000000000000000").unwrap()
        );
        assert!(!spec.starts_transitioned());
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let spec = GenesisSpec::from_json("{}").unwrap();
        assert_eq!(spec.chain_id, DEFAULT_CHAIN_ID);
        assert!(spec.starts_transitioned());
        assert_eq!(spec.base_fee_per_gas, None);
    }

    #[test]
    fn test_oversized_gas_limit_rejected() {
        let raw = r#"{"gasLimit": "0x10000000000000000"}"#;
        assert!(matches!(GenesisSpec::from_json(raw), Err(ChainError::Genesis(_))));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            GenesisSpec::from_json(r#"{"gasLimit": "0xzz"}"#),
            Err(ChainError::Genesis(_))
        ));
    }
}
