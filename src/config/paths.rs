//! Path management for the teller ledger
//!
//! ## Path Resolution Order
//!
//! 1. `TELLER_LEDGER_DATA_DIR` environment variable (if set)
//! 2. The platform config directory (`directories`), e.g.
//!    `~/.config/teller-ledger` on Linux

use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use crate::error::{LedgerError, LedgerResult};

/// Environment variable that overrides the data directory
pub const DATA_DIR_ENV: &str = "TELLER_LEDGER_DATA_DIR";

/// Manages all paths used by the ledger
#[derive(Debug, Clone)]
pub struct LedgerPaths {
    base_dir: PathBuf,
}

impl LedgerPaths {
    /// Resolve the base directory from the environment or the platform default
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory can be determined.
    pub fn new() -> LedgerResult<Self> {
        let base_dir = match std::env::var_os(DATA_DIR_ENV) {
            Some(custom) if !custom.is_empty() => PathBuf::from(custom),
            _ => resolve_default_path()?,
        };

        Ok(Self { base_dir })
    }

    /// Create LedgerPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Settings file (`config.json`)
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// SQLite database (`bank.db`)
    pub fn database_file(&self) -> PathBuf {
        self.base_dir.join("bank.db")
    }

    /// Sealed data key (`encryption.key`)
    pub fn key_file(&self) -> PathBuf {
        self.base_dir.join("encryption.key")
    }

    /// Per-user sealing secret (`user.secret`)
    pub fn user_secret_file(&self) -> PathBuf {
        self.base_dir.join("user.secret")
    }

    /// Audit fallback log (`audit-fallback.log`)
    pub fn audit_fallback_file(&self) -> PathBuf {
        self.base_dir.join("audit-fallback.log")
    }

    /// Local user directory (`directory.json`)
    pub fn directory_file(&self) -> PathBuf {
        self.base_dir.join("directory.json")
    }

    /// Create the base directory, owner-only on unix
    pub fn ensure_directories(&self) -> LedgerResult<()> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| LedgerError::Io(format!("Failed to create data directory: {}", e)))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.base_dir, std::fs::Permissions::from_mode(0o700))
                .map_err(|e| {
                    LedgerError::Io(format!("Failed to restrict data directory: {}", e))
                })?;
        }

        Ok(())
    }

    /// Whether `init` has been run (settings file exists)
    pub fn is_initialized(&self) -> bool {
        self.settings_file().exists()
    }
}

fn resolve_default_path() -> LedgerResult<PathBuf> {
    ProjectDirs::from("", "", "teller-ledger")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| LedgerError::Config("Could not determine a home directory".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_paths() {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path());

        assert_eq!(paths.base_dir(), temp_dir.path());
        assert_eq!(paths.settings_file(), temp_dir.path().join("config.json"));
        assert_eq!(paths.database_file(), temp_dir.path().join("bank.db"));
        assert_eq!(paths.key_file(), temp_dir.path().join("encryption.key"));
        assert_eq!(paths.user_secret_file(), temp_dir.path().join("user.secret"));
        assert_eq!(
            paths.audit_fallback_file(),
            temp_dir.path().join("audit-fallback.log")
        );
        assert_eq!(paths.directory_file(), temp_dir.path().join("directory.json"));
    }

    #[test]
    fn test_env_var_override() {
        let temp_dir = TempDir::new().unwrap();

        std::env::set_var(DATA_DIR_ENV, temp_dir.path());
        let paths = LedgerPaths::new().unwrap();
        std::env::remove_var(DATA_DIR_ENV);

        assert_eq!(paths.base_dir(), temp_dir.path());
    }

    #[test]
    fn test_ensure_directories() {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().join("ledger"));

        assert!(!paths.is_initialized());
        paths.ensure_directories().unwrap();
        assert!(paths.base_dir().exists());
    }
}
