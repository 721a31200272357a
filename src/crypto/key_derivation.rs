//! Key derivation using Argon2id
//!
//! Derives the 256-bit wrapping key that seals the data key at rest. The
//! input is identity material rather than a passphrase, so the parameters
//! travel with the sealed blob and no secret has to be supplied by a caller.

use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, Params,
};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

use super::secure_memory::{ProtectedKey, KEY_SIZE};

/// Parameters for key derivation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDerivationParams {
    /// Salt for key derivation (base64, PHC salt alphabet)
    pub salt: String,
    /// Memory cost in KiB (default: 65536 = 64 MiB)
    pub memory_cost: u32,
    /// Time cost (iterations, default: 3)
    pub time_cost: u32,
    /// Parallelism degree (default: 4)
    pub parallelism: u32,
}

/// Cost settings without a salt, as kept in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfCost {
    pub memory_cost: u32,
    pub time_cost: u32,
    pub parallelism: u32,
}

impl Default for KdfCost {
    fn default() -> Self {
        Self {
            memory_cost: 65536, // 64 MiB
            time_cost: 3,
            parallelism: 4,
        }
    }
}

impl KdfCost {
    /// Cheapest settings Argon2 accepts; for tests only
    pub const fn minimal() -> Self {
        Self {
            memory_cost: 8,
            time_cost: 1,
            parallelism: 1,
        }
    }
}

impl KeyDerivationParams {
    /// Create params with a fresh random salt
    pub fn generate(cost: KdfCost) -> Self {
        let salt = SaltString::generate(&mut OsRng);
        Self {
            salt: salt.to_string(),
            memory_cost: cost.memory_cost,
            time_cost: cost.time_cost,
            parallelism: cost.parallelism,
        }
    }
}

/// Derive a 32-byte key from secret material and stored parameters
pub fn derive_key(secret: &[u8], params: &KeyDerivationParams) -> LedgerResult<ProtectedKey> {
    let salt = SaltString::from_b64(&params.salt)
        .map_err(|e| LedgerError::KeyUnavailable(format!("invalid salt: {}", e)))?;

    let argon2_params = Params::new(
        params.memory_cost,
        params.time_cost,
        params.parallelism,
        Some(KEY_SIZE),
    )
    .map_err(|e| LedgerError::KeyUnavailable(format!("invalid Argon2 parameters: {}", e)))?;

    let argon2 = Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        argon2_params,
    );

    let mut salt_bytes = [0u8; 64];
    let salt_raw = salt
        .decode_b64(&mut salt_bytes)
        .map_err(|e| LedgerError::KeyUnavailable(format!("invalid salt: {}", e)))?;

    let mut key = [0u8; KEY_SIZE];
    argon2
        .hash_password_into(secret, salt_raw, &mut key)
        .map_err(|e| LedgerError::KeyUnavailable(format!("key derivation failed: {}", e)))?;

    Ok(ProtectedKey::from_bytes(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> KeyDerivationParams {
        KeyDerivationParams::generate(KdfCost::minimal())
    }

    #[test]
    fn test_same_secret_same_key() {
        let params = params();
        let key1 = derive_key(b"user@host", &params).unwrap();
        let key2 = derive_key(b"user@host", &params).unwrap();
        assert_eq!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_different_secret_different_key() {
        let params = params();
        let key1 = derive_key(b"alice@host", &params).unwrap();
        let key2 = derive_key(b"bob@host", &params).unwrap();
        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_different_salt_different_key() {
        let key1 = derive_key(b"same", &params()).unwrap();
        let key2 = derive_key(b"same", &params()).unwrap();
        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_bad_salt_is_key_unavailable() {
        let mut params = params();
        params.salt = "***".into();
        assert!(matches!(
            derive_key(b"x", &params),
            Err(LedgerError::KeyUnavailable(_))
        ));
    }

    #[test]
    fn test_default_cost() {
        let cost = KdfCost::default();
        assert_eq!(cost.memory_cost, 65536);
        assert_eq!(cost.time_cost, 3);
        assert_eq!(cost.parallelism, 4);
    }
}
