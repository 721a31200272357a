//! Cryptographic functions for the teller ledger
//!
//! Provides AES-256-GCM field encryption for PII columns and the lifecycle of
//! the data key: generated once, sealed under the executing identity and a
//! per-user secret with an Argon2id-derived wrapping key, and unsealed on
//! every run.

pub mod field_cipher;
pub mod key_derivation;
pub mod key_protector;
pub mod sealer;
pub mod secure_memory;

pub use field_cipher::{FieldCipher, LegacyTokenPolicy, NONCE_SIZE, TAG_SIZE, TOKEN_PREFIX};
pub use key_derivation::{derive_key, KdfCost, KeyDerivationParams};
pub use key_protector::KeyProtector;
pub use sealer::{
    load_or_create_user_secret, IdentityScope, KeySealer, UserBoundSealer, USER_SECRET_SIZE,
};
pub use secure_memory::{ProtectedKey, SecretBytes, KEY_SIZE};
