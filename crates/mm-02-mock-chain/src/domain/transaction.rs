//! # EIP-1559 Transactions
//!
//! Type-2 envelopes: `0x02 || rlp([chain_id, nonce, max_priority_fee_per_gas,
//! max_fee_per_gas, gas_limit, to, value, data, access_list, y_parity, r, s])`.
//! Access lists are always empty here.

use primitive_types::U256;
use rlp::{Rlp, RlpStream};
use shared_crypto::{keccak256, recover_address, RecoverableSignature, Secp256k1KeyPair};
use shared_types::{Address, Hash, HexBytes};

use crate::error::{ChainError, Result};

pub const DYNAMIC_FEE_TX_TYPE: u8 = 0x02;
/// Intrinsic gas of a plain value transfer.
pub const TRANSFER_GAS: u64 = 21_000;

const UNSIGNED_FIELDS: usize = 9;
const SIGNED_FIELDS: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicFeeTransaction {
    pub chain_id: u64,
    pub nonce: u64,
    pub max_priority_fee_per_gas: U256,
    pub max_fee_per_gas: U256,
    pub gas_limit: u64,
    pub to: Address,
    pub value: U256,
    pub data: Vec<u8>,
}

impl DynamicFeeTransaction {
    fn append_fields(&self, stream: &mut RlpStream) {
        stream
            .append(&self.chain_id)
            .append(&self.nonce)
            .append(&self.max_priority_fee_per_gas)
            .append(&self.max_fee_per_gas)
            .append(&self.gas_limit)
            .append(&self.to)
            .append(&self.value)
            .append(&self.data);
        stream.begin_list(0);
    }

    /// Hash the sender signs.
    pub fn signing_hash(&self) -> [u8; 32] {
        let mut stream = RlpStream::new_list(UNSIGNED_FIELDS);
        self.append_fields(&mut stream);
        typed_hash(&stream.out())
    }

    pub fn sign(self, keypair: &Secp256k1KeyPair) -> Result<SignedTransaction> {
        let signature = keypair
            .sign_prehash(&self.signing_hash())
            .map_err(|e| ChainError::InvalidTransaction(e.to_string()))?;
        Ok(SignedTransaction {
            tx: self,
            signature,
        })
    }

    /// Gas charged before execution: the transfer cost plus calldata.
    pub fn intrinsic_gas(&self) -> u64 {
        self.data.iter().fold(TRANSFER_GAS, |gas, byte| {
            gas + if *byte == 0 { 4 } else { 16 }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub tx: DynamicFeeTransaction,
    pub signature: RecoverableSignature,
}

impl SignedTransaction {
    pub fn encode(&self) -> HexBytes {
        let mut stream = RlpStream::new_list(SIGNED_FIELDS);
        self.tx.append_fields(&mut stream);
        stream
            .append(&self.signature.y_parity)
            .append(&U256::from_big_endian(&self.signature.r))
            .append(&U256::from_big_endian(&self.signature.s));
        let body = stream.out();

        let mut raw = Vec::with_capacity(body.len() + 1);
        raw.push(DYNAMIC_FEE_TX_TYPE);
        raw.extend_from_slice(&body);
        HexBytes(raw)
    }

    pub fn decode(raw: &[u8]) -> Result<Self> {
        let (tx_type, body) = raw
            .split_first()
            .ok_or_else(|| ChainError::InvalidTransaction("empty transaction".to_string()))?;
        if *tx_type != DYNAMIC_FEE_TX_TYPE {
            return Err(ChainError::InvalidTransaction(format!(
                "unsupported transaction type {tx_type:#04x}"
            )));
        }

        decode_fields(&Rlp::new(body)).map_err(|e| ChainError::InvalidTransaction(e.to_string()))
    }

    /// keccak256 of the typed envelope.
    pub fn hash(&self) -> Hash {
        Hash::from(keccak256(self.encode().as_slice()))
    }

    pub fn recover_sender(&self) -> Result<Address> {
        let address = recover_address(&self.tx.signing_hash(), &self.signature)
            .map_err(|e| ChainError::InvalidTransaction(e.to_string()))?;
        Ok(Address::from(address))
    }
}

fn decode_fields(rlp: &Rlp<'_>) -> std::result::Result<SignedTransaction, rlp::DecoderError> {
    if rlp.item_count()? != SIGNED_FIELDS {
        return Err(rlp::DecoderError::RlpIncorrectListLen);
    }
    if rlp.at(8)?.item_count()? != 0 {
        return Err(rlp::DecoderError::Custom("access lists are not supported"));
    }

    let tx = DynamicFeeTransaction {
        chain_id: rlp.val_at(0)?,
        nonce: rlp.val_at(1)?,
        max_priority_fee_per_gas: rlp.val_at(2)?,
        max_fee_per_gas: rlp.val_at(3)?,
        gas_limit: rlp.val_at(4)?,
        to: rlp.val_at(5)?,
        value: rlp.val_at(6)?,
        data: rlp.val_at(7)?,
    };
    let y_parity: u8 = rlp.val_at(9)?;
    let r: U256 = rlp.val_at(10)?;
    let s: U256 = rlp.val_at(11)?;

    let mut signature = RecoverableSignature {
        y_parity,
        r: [0u8; 32],
        s: [0u8; 32],
    };
    r.to_big_endian(&mut signature.r);
    s.to_big_endian(&mut signature.s);
    Ok(SignedTransaction { tx, signature })
}

fn typed_hash(body: &[u8]) -> [u8; 32] {
    let mut preimage = Vec::with_capacity(body.len() + 1);
    preimage.push(DYNAMIC_FEE_TX_TYPE);
    preimage.extend_from_slice(body);
    keccak256(&preimage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_crypto::TestAccount;

    fn transfer(account: &TestAccount, nonce: u64) -> DynamicFeeTransaction {
        let to = Address::from(account.address());
        DynamicFeeTransaction {
            chain_id: 1337,
            nonce,
            max_priority_fee_per_gas: U256::from(2),
            max_fee_per_gas: U256::from(5_000_000_000u64),
            gas_limit: 30_000,
            to,
            value: U256::zero(),
            data: vec![],
        }
    }

    #[test]
    fn test_encode_decode_recovers_sender() {
        let account = TestAccount::derive(0).unwrap();
        let signed = transfer(&account, 4).sign(account.keypair()).unwrap();

        let raw = signed.encode();
        assert_eq!(raw.as_slice()[0], DYNAMIC_FEE_TX_TYPE);

        let decoded = SignedTransaction::decode(raw.as_slice()).unwrap();
        assert_eq!(decoded, signed);
        assert_eq!(
            decoded.recover_sender().unwrap(),
            Address::from(account.address())
        );
    }

    #[test]
    fn test_tampered_nonce_changes_sender() {
        let account = TestAccount::derive(1).unwrap();
        let mut signed = transfer(&account, 0).sign(account.keypair()).unwrap();
        signed.tx.nonce = 1;
        let recovered = signed.recover_sender().ok();
        assert_ne!(recovered, Some(Address::from(account.address())));
    }

    #[test]
    fn test_legacy_envelope_rejected() {
        assert!(matches!(
            SignedTransaction::decode(&[0xf8, 0x00]),
            Err(ChainError::InvalidTransaction(_))
        ));
        assert!(SignedTransaction::decode(&[]).is_err());
    }

    #[test]
    fn test_intrinsic_gas_counts_calldata() {
        let account = TestAccount::derive(0).unwrap();
        let mut tx = transfer(&account, 0);
        assert_eq!(tx.intrinsic_gas(), TRANSFER_GAS);
        tx.data = vec![0, 1];
        assert_eq!(tx.intrinsic_gas(), TRANSFER_GAS + 4 + 16);
    }
}
