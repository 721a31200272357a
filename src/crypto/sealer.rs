//! Identity-bound sealing of key material
//!
//! A [`KeySealer`] wraps raw bytes into an opaque blob that only the same
//! identity can unwrap. The concrete backend is swappable (OS credential
//! vault, HSM, KMS); [`UserBoundSealer`] is the portable default that binds the
//! blob to the executing OS user on the current machine.
//!
//! User and machine names are not secret, so the wrapping key also mixes in a
//! random per-user secret kept in an owner-only file next to the sealed key.
//! Copying the sealed key alone is not enough to open it. Anyone who can read
//! files as that OS user (or as root) can still read both files; closing that
//! gap needs an OS credential store behind [`KeySealer`].

use std::io::ErrorKind;
use std::path::Path;

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::{
    aead::{Aead, KeyInit, OsRng, Payload},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LedgerError, LedgerResult};

use super::field_cipher::NONCE_SIZE;
use super::key_derivation::{derive_key, KdfCost, KeyDerivationParams};
use super::key_protector::write_owner_only;
use super::secure_memory::SecretBytes;

/// Length of the per-user sealing secret
pub const USER_SECRET_SIZE: usize = 32;

/// Seal/unseal capability used by the key protector
pub trait KeySealer: Send + Sync {
    /// Wrap `plaintext` into an opaque blob
    fn seal(&self, plaintext: &[u8]) -> LedgerResult<Vec<u8>>;

    /// Unwrap a blob produced by [`KeySealer::seal`] under the same identity
    fn unseal(&self, blob: &[u8]) -> LedgerResult<SecretBytes>;
}

/// The identity a sealed blob is bound to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityScope {
    pub user: String,
    pub machine: String,
}

impl IdentityScope {
    pub fn new(user: impl Into<String>, machine: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            machine: machine.into(),
        }
    }

    /// Identity of the executing OS user on this machine
    ///
    /// The machine part prefers the systemd/dbus machine id and falls back to
    /// the host name.
    pub fn current() -> LedgerResult<Self> {
        let user = ["USER", "USERNAME", "LOGNAME"]
            .iter()
            .find_map(|var| std::env::var(var).ok().filter(|v| !v.trim().is_empty()))
            .ok_or_else(|| {
                LedgerError::KeyUnavailable("cannot determine the current user".to_string())
            })?;

        let machine = machine_id()
            .or_else(|| {
                hostname::get()
                    .ok()
                    .map(|h| h.to_string_lossy().into_owned())
            })
            .ok_or_else(|| {
                LedgerError::KeyUnavailable("cannot determine the machine identity".to_string())
            })?;

        Ok(Self { user, machine })
    }

    fn material(&self, user_secret: &SecretBytes) -> SecretBytes {
        let mut material =
            format!("teller-ledger\0{}\0{}\0", self.user, self.machine).into_bytes();
        material.extend_from_slice(user_secret.as_slice());
        SecretBytes::new(material)
    }
}

/// Read the per-user sealing secret, creating it on first use
///
/// The file is created exclusively with owner-only permissions and is never
/// overwritten. A missing, unreadable or wrong-length secret is reported as
/// `KeyUnavailable`.
pub fn load_or_create_user_secret(path: &Path) -> LedgerResult<SecretBytes> {
    match std::fs::read(path) {
        Ok(bytes) => return check_user_secret(bytes),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => {
            return Err(LedgerError::KeyUnavailable(format!(
                "cannot read user secret: {}",
                e
            )))
        }
    }

    let mut raw = vec![0u8; USER_SECRET_SIZE];
    OsRng.fill_bytes(&mut raw);
    let secret = SecretBytes::new(raw);

    match write_owner_only(path, secret.as_slice()) {
        Ok(()) => {
            debug!(path = %path.display(), "created user secret");
            Ok(secret)
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            let existing = std::fs::read(path).map_err(|e| {
                LedgerError::KeyUnavailable(format!("cannot read user secret: {}", e))
            })?;
            check_user_secret(existing)
        }
        Err(e) => Err(LedgerError::KeyUnavailable(format!(
            "cannot store user secret: {}",
            e
        ))),
    }
}

fn check_user_secret(bytes: Vec<u8>) -> LedgerResult<SecretBytes> {
    let secret = SecretBytes::new(bytes);
    if secret.len() != USER_SECRET_SIZE {
        return Err(LedgerError::KeyUnavailable(format!(
            "user secret has {} bytes, expected {}",
            secret.len(),
            USER_SECRET_SIZE
        )));
    }
    Ok(secret)
}

fn machine_id() -> Option<String> {
    ["/etc/machine-id", "/var/lib/dbus/machine-id"]
        .iter()
        .find_map(|path| std::fs::read_to_string(path).ok())
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
}

/// On-disk envelope written by [`UserBoundSealer`]
#[derive(Debug, Serialize, Deserialize)]
struct SealedEnvelope {
    version: u8,
    kdf: KeyDerivationParams,
    nonce: String,
    ciphertext: String,
}

const ENVELOPE_VERSION: u8 = 1;
const ENVELOPE_AAD: &[u8] = b"teller-ledger sealed key v1";

/// Seals bytes under a key derived from the executing user's identity and
/// their per-user secret
pub struct UserBoundSealer {
    identity: IdentityScope,
    user_secret: SecretBytes,
    cost: KdfCost,
}

impl UserBoundSealer {
    pub fn new(identity: IdentityScope, user_secret: SecretBytes, cost: KdfCost) -> Self {
        Self {
            identity,
            user_secret,
            cost,
        }
    }

    /// Sealer bound to the current OS user and the secret at `secret_path`
    pub fn for_current_user(secret_path: &Path, cost: KdfCost) -> LedgerResult<Self> {
        let identity = IdentityScope::current()?;
        let user_secret = load_or_create_user_secret(secret_path)?;
        Ok(Self::new(identity, user_secret, cost))
    }

    pub fn identity(&self) -> &IdentityScope {
        &self.identity
    }
}

impl KeySealer for UserBoundSealer {
    fn seal(&self, plaintext: &[u8]) -> LedgerResult<Vec<u8>> {
        let kdf = KeyDerivationParams::generate(self.cost);
        let material = self.identity.material(&self.user_secret);
        let wrapping_key = derive_key(material.as_slice(), &kdf)?;

        let cipher = Aes256Gcm::new_from_slice(wrapping_key.as_bytes())
            .map_err(|e| LedgerError::KeyUnavailable(format!("sealing cipher: {}", e)))?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);

        let ciphertext = cipher
            .encrypt(
                Nonce::from_slice(&nonce_bytes),
                Payload {
                    msg: plaintext,
                    aad: ENVELOPE_AAD,
                },
            )
            .map_err(|_| LedgerError::KeyUnavailable("sealing failed".to_string()))?;

        let envelope = SealedEnvelope {
            version: ENVELOPE_VERSION,
            kdf,
            nonce: STANDARD.encode(nonce_bytes),
            ciphertext: STANDARD.encode(ciphertext),
        };

        debug!(user = %self.identity.user, "sealed key material");
        Ok(serde_json::to_vec_pretty(&envelope)?)
    }

    fn unseal(&self, blob: &[u8]) -> LedgerResult<SecretBytes> {
        let envelope: SealedEnvelope = serde_json::from_slice(blob)
            .map_err(|e| LedgerError::KeyUnavailable(format!("sealed blob is corrupt: {}", e)))?;

        if envelope.version != ENVELOPE_VERSION {
            return Err(LedgerError::KeyUnavailable(format!(
                "unsupported sealed blob version: {}",
                envelope.version
            )));
        }

        let nonce_bytes = STANDARD
            .decode(&envelope.nonce)
            .map_err(|_| LedgerError::KeyUnavailable("sealed blob is corrupt".to_string()))?;
        if nonce_bytes.len() != NONCE_SIZE {
            return Err(LedgerError::KeyUnavailable(
                "sealed blob is corrupt".to_string(),
            ));
        }
        let ciphertext = STANDARD
            .decode(&envelope.ciphertext)
            .map_err(|_| LedgerError::KeyUnavailable("sealed blob is corrupt".to_string()))?;

        let material = self.identity.material(&self.user_secret);
        let wrapping_key = derive_key(material.as_slice(), &envelope.kdf)?;
        let cipher = Aes256Gcm::new_from_slice(wrapping_key.as_bytes())
            .map_err(|e| LedgerError::KeyUnavailable(format!("sealing cipher: {}", e)))?;

        let plaintext = cipher
            .decrypt(
                Nonce::from_slice(&nonce_bytes),
                Payload {
                    msg: &ciphertext,
                    aad: ENVELOPE_AAD,
                },
            )
            .map_err(|_| {
                LedgerError::KeyUnavailable(
                    "sealed key belongs to a different identity or is corrupt".to_string(),
                )
            })?;

        Ok(SecretBytes::new(plaintext))
    }
}
