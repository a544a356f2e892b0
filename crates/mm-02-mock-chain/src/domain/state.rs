//! Account state of the mock chain: nonces only.

use std::collections::BTreeMap;

use rlp::RlpStream;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Seq};
use shared_crypto::keccak256;
use shared_types::{Address, Hash};

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountNonces {
    #[serde_as(as = "Seq<(_, _)>")]
    nonces: BTreeMap<Address, u64>,
}

impl AccountNonces {
    pub fn nonce(&self, address: &Address) -> u64 {
        self.nonces.get(address).copied().unwrap_or(0)
    }

    pub fn increment(&mut self, address: Address) {
        *self.nonces.entry(address).or_insert(0) += 1;
    }

    /// keccak256 of the RLP list of `[address, nonce]` pairs in address order.
    pub fn root(&self) -> Hash {
        let mut stream = RlpStream::new_list(self.nonces.len());
        for (address, nonce) in &self.nonces {
            stream.begin_list(2).append(address).append(nonce);
        }
        Hash::from(keccak256(&stream.out()))
    }
}
