//! Secure memory handling for key material
//!
//! Key bytes live in types that zero their contents on drop so the raw key
//! does not linger in memory after the cipher has been built.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of an AES-256 key in bytes
pub const KEY_SIZE: usize = 32;

/// A 256-bit symmetric key, zeroed on drop
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ProtectedKey {
    bytes: [u8; KEY_SIZE],
}

impl ProtectedKey {
    /// Wrap raw key bytes
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Copy key bytes from a slice of exactly [`KEY_SIZE`] bytes
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        let bytes: [u8; KEY_SIZE] = slice.try_into().ok()?;
        Some(Self { bytes })
    }

    /// Get the key bytes
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl fmt::Debug for ProtectedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ProtectedKey([REDACTED])")
    }
}

/// A heap buffer of secret bytes, zeroed on drop
///
/// Used for unsealed blobs and passwords on their way through the process.
#[derive(Default, Zeroize, ZeroizeOnDrop)]
pub struct SecretBytes(Vec<u8>);

impl SecretBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretBytes({} bytes)", self.0.len())
    }
}

impl From<String> for SecretBytes {
    fn from(s: String) -> Self {
        Self(s.into_bytes())
    }
}
