//! AES-256-GCM field encryption
//!
//! Encrypts individual text values into self-describing tokens suitable for
//! TEXT columns:
//!
//! ```text
//! v1:<base64 nonce (12 bytes)>:<base64 ciphertext>:<base64 tag (16 bytes)>
//! ```
//!
//! Every call to [`FieldCipher::encrypt`] draws a fresh random nonce. A value
//! without the `v1:` prefix is treated as legacy plaintext and returned as-is
//! by [`FieldCipher::decrypt`] unless the cipher is built with
//! [`LegacyTokenPolicy::Reject`]. Stripping the prefix from a real token
//! therefore turns it into "plaintext"; the strict policy closes that gap once
//! all stored values have been migrated.

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};

use crate::error::{LedgerError, LedgerResult};

use super::secure_memory::KEY_SIZE;

/// Size of the AES-GCM nonce in bytes (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Size of the AES-GCM authentication tag in bytes (128 bits)
pub const TAG_SIZE: usize = 16;

/// Prefix identifying a scheme-v1 token
pub const TOKEN_PREFIX: &str = "v1:";

/// How `decrypt` treats values that carry no version prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LegacyTokenPolicy {
    /// Return unprefixed values unchanged
    #[default]
    PassThrough,
    /// Fail with `MalformedToken` on any non-blank unprefixed value
    Reject,
}

/// Authenticated encryption of individual text fields
pub struct FieldCipher {
    cipher: Aes256Gcm,
    legacy: LegacyTokenPolicy,
}

impl FieldCipher {
    /// Build a cipher from exactly 32 key bytes
    pub fn new(key: &[u8]) -> LedgerResult<Self> {
        Self::with_policy(key, LegacyTokenPolicy::default())
    }

    /// Build a cipher with an explicit legacy-plaintext policy
    pub fn with_policy(key: &[u8], legacy: LegacyTokenPolicy) -> LedgerResult<Self> {
        if key.len() != KEY_SIZE {
            return Err(LedgerError::InvalidKeyLength {
                expected: KEY_SIZE,
                actual: key.len(),
            });
        }

        let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| LedgerError::InvalidKeyLength {
            expected: KEY_SIZE,
            actual: key.len(),
        })?;

        Ok(Self { cipher, legacy })
    }

    pub fn legacy_policy(&self) -> LegacyTokenPolicy {
        self.legacy
    }

    /// Encrypt a text value into a `v1:` token
    pub fn encrypt(&self, plaintext: &str) -> LedgerResult<String> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        // aes-gcm appends the tag to the ciphertext
        let mut sealed = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| LedgerError::Validation("value is too long to encrypt".to_string()))?;

        let tag = sealed.split_off(sealed.len() - TAG_SIZE);

        Ok(format!(
            "{}{}:{}:{}",
            TOKEN_PREFIX,
            STANDARD.encode(nonce_bytes),
            STANDARD.encode(&sealed),
            STANDARD.encode(&tag)
        ))
    }

    /// Encrypt an optional value; `None` is encrypted as the empty string
    pub fn encrypt_opt(&self, plaintext: Option<&str>) -> LedgerResult<String> {
        self.encrypt(plaintext.unwrap_or_default())
    }

    /// Decrypt a token produced by [`FieldCipher::encrypt`]
    pub fn decrypt(&self, token: &str) -> LedgerResult<String> {
        if token.trim().is_empty() {
            return Ok(String::new());
        }

        if !token.starts_with(TOKEN_PREFIX) {
            return match self.legacy {
                LegacyTokenPolicy::PassThrough => Ok(token.to_string()),
                LegacyTokenPolicy::Reject => Err(LedgerError::MalformedToken(
                    "value is not a versioned token".to_string(),
                )),
            };
        }

        let parts: Vec<&str> = token.split(':').collect();
        if parts.len() != 4 {
            return Err(LedgerError::MalformedToken(format!(
                "expected 4 parts, found {}",
                parts.len()
            )));
        }

        let nonce_bytes = decode_part(parts[1], "nonce")?;
        if nonce_bytes.len() != NONCE_SIZE {
            return Err(LedgerError::MalformedToken(format!(
                "nonce must be {} bytes, got {}",
                NONCE_SIZE,
                nonce_bytes.len()
            )));
        }

        let mut sealed = decode_part(parts[2], "ciphertext")?;

        let tag = decode_part(parts[3], "tag")?;
        if tag.len() != TAG_SIZE {
            return Err(LedgerError::MalformedToken(format!(
                "tag must be {} bytes, got {}",
                TAG_SIZE,
                tag.len()
            )));
        }
        sealed.extend_from_slice(&tag);

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), sealed.as_slice())
            .map_err(|_| LedgerError::AuthenticationFailed)?;

        String::from_utf8(plaintext)
            .map_err(|_| LedgerError::MalformedToken("decrypted value is not UTF-8".to_string()))
    }
}

impl std::fmt::Debug for FieldCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldCipher")
            .field("legacy", &self.legacy)
            .finish_non_exhaustive()
    }
}

fn decode_part(part: &str, what: &str) -> LedgerResult<Vec<u8>> {
    STANDARD
        .decode(part)
        .map_err(|e| LedgerError::MalformedToken(format!("invalid {} encoding: {}", what, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cipher() -> FieldCipher {
        FieldCipher::new(&[0x42; 32]).unwrap()
    }

    fn flip_byte(token: &str, part: usize, index: usize) -> String {
        let mut parts: Vec<String> = token.split(':').map(String::from).collect();
        let mut bytes = STANDARD.decode(&parts[part]).unwrap();
        bytes[index] ^= 0x01;
        parts[part] = STANDARD.encode(&bytes);
        parts.join(":")
    }

    #[test]
    fn test_encrypt_decrypt() {
        let cipher = test_cipher();
        for plaintext in ["Alice", "", "1 Main Street", "Dún Laoghaire", "a:b:c"] {
            let token = cipher.encrypt(plaintext).unwrap();
            assert_eq!(cipher.decrypt(&token).unwrap(), plaintext);
        }
    }

    #[test]
    fn test_token_shape() {
        let token = test_cipher().encrypt("Alice").unwrap();
        assert!(token.starts_with("v1:"));

        let parts: Vec<&str> = token.split(':').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(STANDARD.decode(parts[1]).unwrap().len(), NONCE_SIZE);
        assert_eq!(STANDARD.decode(parts[2]).unwrap().len(), "Alice".len());
        assert_eq!(STANDARD.decode(parts[3]).unwrap().len(), TAG_SIZE);
    }

    #[test]
    fn test_missing_value_encrypts_as_empty() {
        let cipher = test_cipher();
        let token = cipher.encrypt_opt(None).unwrap();
        assert!(token.starts_with("v1:"));
        assert_eq!(cipher.decrypt(&token).unwrap(), "");
    }

    #[test]
    fn test_different_nonces() {
        let cipher = test_cipher();
        let t1 = cipher.encrypt("same value").unwrap();
        let t2 = cipher.encrypt("same value").unwrap();

        let p1: Vec<&str> = t1.split(':').collect();
        let p2: Vec<&str> = t2.split(':').collect();
        assert_ne!(p1[1], p2[1]);
        assert_ne!(p1[2], p2[2]);
    }

    #[test]
    fn test_every_ciphertext_byte_is_authenticated() {
        let cipher = test_cipher();
        let token = cipher.encrypt("Tamper me").unwrap();

        for index in 0.."Tamper me".len() {
            let tampered = flip_byte(&token, 2, index);
            assert!(matches!(
                cipher.decrypt(&tampered),
                Err(LedgerError::AuthenticationFailed)
            ));
        }
    }

    #[test]
    fn test_every_tag_byte_is_authenticated() {
        let cipher = test_cipher();
        let token = cipher.encrypt("Tamper me").unwrap();

        for index in 0..TAG_SIZE {
            let tampered = flip_byte(&token, 3, index);
            assert!(matches!(
                cipher.decrypt(&tampered),
                Err(LedgerError::AuthenticationFailed)
            ));
        }
    }

    #[test]
    fn test_wrong_key_fails() {
        let token = test_cipher().encrypt("secret").unwrap();
        let other = FieldCipher::new(&[0x43; 32]).unwrap();
        assert!(matches!(
            other.decrypt(&token),
            Err(LedgerError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_legacy_passthrough() {
        let cipher = test_cipher();
        assert_eq!(cipher.decrypt("Plain Old Town").unwrap(), "Plain Old Town");
        assert_eq!(cipher.decrypt("V1:not-our-prefix").unwrap(), "V1:not-our-prefix");
    }

    #[test]
    fn test_blank_input_decrypts_to_empty() {
        let cipher = FieldCipher::with_policy(&[0x42; 32], LegacyTokenPolicy::Reject).unwrap();
        assert_eq!(cipher.decrypt("").unwrap(), "");
        assert_eq!(cipher.decrypt("   ").unwrap(), "");
    }

    #[test]
    fn test_strict_policy_rejects_unprefixed() {
        let cipher = FieldCipher::with_policy(&[0x42; 32], LegacyTokenPolicy::Reject).unwrap();
        assert!(matches!(
            cipher.decrypt("Plain Old Town"),
            Err(LedgerError::MalformedToken(_))
        ));

        let token = cipher.encrypt("still works").unwrap();
        assert_eq!(cipher.decrypt(&token).unwrap(), "still works");
    }

    #[test]
    fn test_malformed_tokens() {
        let cipher = test_cipher();
        for bad in ["v1:", "v1:a:b", "v1:a:b:c:d", "v1:!!!:AAAA:AAAA", "v1:AAAA:AAAA:AAAA"] {
            assert!(
                matches!(cipher.decrypt(bad), Err(LedgerError::MalformedToken(_))),
                "expected MalformedToken for {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_key_sizes() {
        assert!(matches!(
            FieldCipher::new(&[0u8; 31]),
            Err(LedgerError::InvalidKeyLength {
                expected: 32,
                actual: 31
            })
        ));
        assert!(matches!(
            FieldCipher::new(&[0u8; 33]),
            Err(LedgerError::InvalidKeyLength {
                expected: 32,
                actual: 33
            })
        ));
        assert!(FieldCipher::new(&[0u8; 32]).is_ok());
    }
}
