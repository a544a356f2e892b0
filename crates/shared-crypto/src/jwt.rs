//! Engine API shared secret.
//!
//! A 32-byte key stored as hex (optionally `0x`-prefixed) in a file. Both ends
//! of the engine connection load the same file. Requests carry an HS256 token
//! whose only claim is `iat`; the server accepts it when `iat` is within
//! [`IAT_WINDOW_SECS`] of its own clock.

use std::collections::HashSet;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::CryptoError;

/// Length of the HS256 key in bytes.
pub const JWT_SECRET_LENGTH: usize = 32;

/// Allowed clock skew between token issuer and verifier.
pub const IAT_WINDOW_SECS: u64 = 60;

/// Token claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Issued-at, unix seconds.
    pub iat: u64,
}

/// 32-byte HS256 key, zeroized on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct JwtSecret([u8; JWT_SECRET_LENGTH]);

impl JwtSecret {
    /// Wrap raw key bytes.
    pub fn new(bytes: [u8; JWT_SECRET_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Parse hex text; surrounding whitespace and a `0x` prefix are allowed.
    pub fn from_hex(text: &str) -> Result<Self, CryptoError> {
        let text = text.trim();
        let digits = text.strip_prefix("0x").unwrap_or(text);
        let mut bytes =
            hex::decode(digits).map_err(|e| CryptoError::InvalidSecret(e.to_string()))?;
        if bytes.len() != JWT_SECRET_LENGTH {
            let actual = bytes.len();
            bytes.zeroize();
            return Err(CryptoError::InvalidKeyLength {
                expected: JWT_SECRET_LENGTH,
                actual,
            });
        }
        let mut secret = [0u8; JWT_SECRET_LENGTH];
        secret.copy_from_slice(&bytes);
        bytes.zeroize();
        Ok(Self(secret))
    }

    /// Read and parse the secret file at `path`.
    pub fn load(path: &Path) -> Result<Self, CryptoError> {
        let mut text = std::fs::read_to_string(path)
            .map_err(|e| CryptoError::InvalidSecret(format!("{}: {e}", path.display())))?;
        let secret = Self::from_hex(&text);
        text.zeroize();
        secret
    }

    /// Generate a random secret.
    pub fn random() -> Self {
        use rand::RngCore;
        let mut bytes = [0u8; JWT_SECRET_LENGTH];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; JWT_SECRET_LENGTH] {
        &self.0
    }

    /// Hex form with `0x` prefix, as written to secret files.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl JwtSecret {
    /// Issue a token with `iat` set to the current time.
    pub fn issue_token(&self) -> Result<String, CryptoError> {
        self.issue_token_at(unix_now())
    }

    /// Issue a token with an explicit `iat`.
    pub fn issue_token_at(&self, iat: u64) -> Result<String, CryptoError> {
        encode(
            &Header::new(Algorithm::HS256),
            &Claims { iat },
            &EncodingKey::from_secret(&self.0),
        )
        .map_err(|e| CryptoError::InvalidToken(e.to_string()))
    }

    /// Check signature and freshness of `token` against the current time.
    pub fn verify_token(&self, token: &str) -> Result<Claims, CryptoError> {
        self.verify_token_at(token, unix_now())
    }

    /// Check `token` as if the current time were `now`.
    pub fn verify_token_at(&self, token: &str, now: u64) -> Result<Claims, CryptoError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims = HashSet::new();
        validation.validate_exp = false;
        let claims = decode::<Claims>(token, &DecodingKey::from_secret(&self.0), &validation)
            .map_err(|e| CryptoError::InvalidToken(e.to_string()))?
            .claims;
        if claims.iat.abs_diff(now) > IAT_WINDOW_SECS {
            return Err(CryptoError::InvalidToken(format!(
                "stale iat {} (now {now})",
                claims.iat
            )));
        }
        Ok(claims)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

impl Drop for JwtSecret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl std::fmt::Debug for JwtSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("JwtSecret(..)")
    }
}
