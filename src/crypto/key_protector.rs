//! Long-lived data key management
//!
//! The key is generated once, sealed under the executing identity and kept on
//! disk only in sealed form. Each process run unseals it again.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::OsRng;
use tracing::{info, instrument};

use crate::error::{LedgerError, LedgerResult};

use super::sealer::KeySealer;
use super::secure_memory::{ProtectedKey, KEY_SIZE};

/// Obtains or creates the sealed data key
pub struct KeyProtector {
    key_path: PathBuf,
    sealer: Box<dyn KeySealer>,
}

impl KeyProtector {
    pub fn new(key_path: impl Into<PathBuf>, sealer: Box<dyn KeySealer>) -> Self {
        Self {
            key_path: key_path.into(),
            sealer,
        }
    }

    pub fn key_path(&self) -> &Path {
        &self.key_path
    }

    /// Unseal the existing key, or generate, seal and persist a new one
    ///
    /// Any failure is reported as `KeyUnavailable`. An existing sealed blob is
    /// never overwritten.
    #[instrument(skip_all, fields(path = %self.key_path.display()))]
    pub fn get_or_create_key(&self) -> LedgerResult<ProtectedKey> {
        match std::fs::read(&self.key_path) {
            Ok(blob) => return self.unseal(&blob),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(LedgerError::KeyUnavailable(format!(
                    "cannot read sealed key: {}",
                    e
                )))
            }
        }

        let mut raw = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut raw);
        let key = ProtectedKey::from_bytes(raw);
        raw.fill(0);

        let blob = self.sealer.seal(key.as_bytes()).map_err(as_key_fault)?;

        match write_owner_only(&self.key_path, &blob) {
            Ok(()) => {
                info!("generated and sealed a new data key");
                Ok(key)
            }
            // Another process created the key first; use theirs.
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let existing = std::fs::read(&self.key_path).map_err(|e| {
                    LedgerError::KeyUnavailable(format!("cannot read sealed key: {}", e))
                })?;
                self.unseal(&existing)
            }
            Err(e) => Err(LedgerError::KeyUnavailable(format!(
                "cannot store sealed key: {}",
                e
            ))),
        }
    }

    fn unseal(&self, blob: &[u8]) -> LedgerResult<ProtectedKey> {
        let secret = self.sealer.unseal(blob).map_err(as_key_fault)?;
        ProtectedKey::from_slice(secret.as_slice()).ok_or_else(|| {
            LedgerError::KeyUnavailable(format!(
                "sealed key has {} bytes, expected {}",
                secret.len(),
                KEY_SIZE
            ))
        })
    }
}

/// Write `bytes` to a file that must not exist yet, readable by the owner only
pub(crate) fn write_owner_only(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

fn as_key_fault(err: LedgerError) -> LedgerError {
    match err {
        LedgerError::KeyUnavailable(_) => err,
        other => LedgerError::KeyUnavailable(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::key_derivation::KdfCost;
    use crate::crypto::sealer::{IdentityScope, UserBoundSealer};
    use crate::crypto::secure_memory::SecretBytes;
    use tempfile::TempDir;

    fn sealer(user: &str) -> Box<dyn KeySealer> {
        Box::new(UserBoundSealer::new(
            IdentityScope::new(user, "test-machine"),
            SecretBytes::new(vec![3u8; 32]),
            KdfCost::minimal(),
        ))
    }

    struct BrokenSealer;

    impl KeySealer for BrokenSealer {
        fn seal(&self, _plaintext: &[u8]) -> LedgerResult<Vec<u8>> {
            Err(LedgerError::KeyUnavailable("backend offline".into()))
        }

        fn unseal(&self, _blob: &[u8]) -> LedgerResult<SecretBytes> {
            Err(LedgerError::KeyUnavailable("backend offline".into()))
        }
    }

    struct ShortKeySealer;

    impl KeySealer for ShortKeySealer {
        fn seal(&self, plaintext: &[u8]) -> LedgerResult<Vec<u8>> {
            Ok(plaintext.to_vec())
        }

        fn unseal(&self, blob: &[u8]) -> LedgerResult<SecretBytes> {
            Ok(SecretBytes::new(blob[..16].to_vec()))
        }
    }

    #[test]
    fn test_creates_then_reuses_key() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("keys").join("encryption.key");

        let protector = KeyProtector::new(&path, sealer("teller"));
        let first = protector.get_or_create_key().unwrap();
        assert!(path.exists());

        let blob_before = std::fs::read(&path).unwrap();
        let second = protector.get_or_create_key().unwrap();
        let blob_after = std::fs::read(&path).unwrap();

        assert_eq!(first.as_bytes(), second.as_bytes());
        assert_eq!(blob_before, blob_after);
    }

    #[test]
    fn test_raw_key_not_on_disk() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("encryption.key");

        let key = KeyProtector::new(&path, sealer("teller"))
            .get_or_create_key()
            .unwrap();
        let blob = std::fs::read(&path).unwrap();
        assert!(!blob.windows(KEY_SIZE).any(|w| w == key.as_bytes()));
    }

    #[test]
    fn test_wrong_identity_is_key_unavailable() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("encryption.key");

        KeyProtector::new(&path, sealer("teller"))
            .get_or_create_key()
            .unwrap();

        let result = KeyProtector::new(&path, sealer("someone-else")).get_or_create_key();
        assert!(matches!(result, Err(LedgerError::KeyUnavailable(_))));
    }

    #[test]
    fn test_unavailable_backend_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("encryption.key");

        let result = KeyProtector::new(&path, Box::new(BrokenSealer)).get_or_create_key();
        assert!(matches!(result, Err(LedgerError::KeyUnavailable(_))));
        assert!(!path.exists());
    }

    #[test]
    fn test_wrong_length_key_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("encryption.key");
        std::fs::write(&path, [0u8; 32]).unwrap();

        let result = KeyProtector::new(&path, Box::new(ShortKeySealer)).get_or_create_key();
        assert!(matches!(result, Err(LedgerError::KeyUnavailable(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_sealed_key_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("encryption.key");
        KeyProtector::new(&path, sealer("teller"))
            .get_or_create_key()
            .unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
