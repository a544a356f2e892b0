//! # Primitive Wire Types
//!
//! Hashes, addresses and big integers come from `primitive-types`, whose serde
//! impls already speak the 0x-prefixed hex used on both APIs. This module adds
//! the byte wrappers and integer codecs those crates do not cover.

use serde::{de::Error as DeError, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

pub use primitive_types::{H160, H256, U256};

/// A 32-byte block or state hash.
pub type Hash = H256;

/// A 20-byte execution-layer address.
pub type Address = H160;

fn decode_hex<E: DeError>(text: &str) -> Result<Vec<u8>, E> {
    let digits = text
        .strip_prefix("0x")
        .ok_or_else(|| E::custom("hex string must be 0x-prefixed"))?;
    hex::decode(digits).map_err(E::custom)
}

/// Variable-length bytes, hex encoded on the wire.
///
/// Used wherever the length is validated by the receiver rather than by the
/// decoder, e.g. request signatures whose length check happens in a handler.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct HexBytes(pub Vec<u8>);

impl HexBytes {
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for HexBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for HexBytes {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl fmt::Debug for HexBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

impl fmt::Display for HexBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

impl Serialize for HexBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for HexBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        decode_hex(&text).map(Self)
    }
}

/// Declares a fixed-width byte array that is hex encoded on the wire and
/// rejects any other length at decode time.
macro_rules! fixed_bytes {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            pub const LEN: usize = $len;

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// Copies `bytes` into a fixed array, `None` on length mismatch.
            pub fn from_slice(bytes: &[u8]) -> Option<Self> {
                <[u8; $len]>::try_from(bytes).ok().map(Self)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self([0u8; $len])
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(text: &str) -> Result<Self, Self::Err> {
                let bytes: Vec<u8> = decode_hex::<serde::de::value::Error>(text)
                    .map_err(|e| e.to_string())?;
                Self::from_slice(&bytes).ok_or_else(|| {
                    format!("expected {} bytes, got {}", $len, bytes.len())
                })
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let text = String::deserialize(deserializer)?;
                text.parse().map_err(D::Error::custom)
            }
        }
    };
}

fixed_bytes!(
    /// Compressed BLS12-381 public key (48 bytes).
    BlsPublicKeyBytes,
    48
);

fixed_bytes!(
    /// Compressed BLS12-381 signature (96 bytes).
    BlsSignatureBytes,
    96
);

fixed_bytes!(
    /// Execution-layer logs bloom (256 bytes).
    Bloom,
    256
);

fixed_bytes!(
    /// Sync committee participation bits (`Bitvector[512]`).
    SyncCommitteeBits,
    64
);

fixed_bytes!(
    /// Engine-assigned handle of a payload build in progress.
    PayloadId,
    8
);

/// Hex `QUANTITY` codec for `u64` (engine API).
pub mod quantity {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{value:#x}"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let text = String::deserialize(deserializer)?;
        let digits = text
            .strip_prefix("0x")
            .ok_or_else(|| D::Error::custom("quantity must be 0x-prefixed"))?;
        u64::from_str_radix(digits, 16).map_err(D::Error::custom)
    }
}

/// Decimal-string codec for `U256` (builder REST API).
pub mod dec_u256 {
    use primitive_types::U256;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let text = String::deserialize(deserializer)?;
        U256::from_dec_str(&text).map_err(|e| D::Error::custom(format!("{e:?}")))
    }
}
