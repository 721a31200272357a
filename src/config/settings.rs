//! User settings for the teller ledger
//!
//! Directory group names, input limits, token strictness and the cost of the
//! key-sealing KDF. Every field has a serde default so older files still load.

use serde::{Deserialize, Serialize};

use super::paths::LedgerPaths;
use crate::crypto::{KdfCost, LegacyTokenPolicy};
use crate::error::{LedgerError, LedgerResult};
use crate::models::Money;

/// Limits applied to teller input
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Limits {
    /// Maximum length of any text field, in characters
    #[serde(default = "default_max_text_length")]
    pub max_text_length: usize,

    /// Largest amount accepted for a single operation
    #[serde(default = "default_max_transaction_amount")]
    pub max_transaction_amount: Money,

    /// Transactions above this amount need a reason
    #[serde(default = "default_reason_threshold")]
    pub reason_threshold: Money,
}

fn default_max_text_length() -> usize {
    100
}

fn default_max_transaction_amount() -> Money {
    Money::from_units(1_000_000)
}

fn default_reason_threshold() -> Money {
    Money::from_units(10_000)
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_text_length: default_max_text_length(),
            max_transaction_amount: default_max_transaction_amount(),
            reason_threshold: default_reason_threshold(),
        }
    }
}

/// User settings for the teller ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Source name used for the system event log
    #[serde(default = "default_event_source")]
    pub event_source: String,

    /// Directory group whose members may sign in
    #[serde(default = "default_teller_group")]
    pub teller_group: String,

    /// Directory group whose members may approve account closure
    #[serde(default = "default_admin_group")]
    pub admin_group: String,

    /// Reject stored values that are not encrypted tokens
    #[serde(default)]
    pub strict_tokens: bool,

    /// Tellers must sign in against the directory; when off, account commands
    /// run as the OS user unless `--login` is given
    #[serde(default = "default_require_login")]
    pub require_login: bool,

    /// Input limits
    #[serde(default)]
    pub limits: Limits,

    /// Argon2 cost for sealing the data key and hashing directory passwords
    #[serde(default)]
    pub kdf: KdfCost,
}

fn default_require_login() -> bool {
    true
}

fn default_schema_version() -> u32 {
    1
}

fn default_event_source() -> String {
    "Teller Ledger".to_string()
}

fn default_teller_group() -> String {
    "Bank Teller".to_string()
}

fn default_admin_group() -> String {
    "Bank Teller Administrator".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            event_source: default_event_source(),
            teller_group: default_teller_group(),
            admin_group: default_admin_group(),
            strict_tokens: false,
            require_login: default_require_login(),
            limits: Limits::default(),
            kdf: KdfCost::default(),
        }
    }
}

impl Settings {
    /// How the field cipher treats unencrypted stored values
    pub fn legacy_policy(&self) -> LegacyTokenPolicy {
        if self.strict_tokens {
            LegacyTokenPolicy::Reject
        } else {
            LegacyTokenPolicy::PassThrough
        }
    }

    /// Whether the acting teller must sign in, given the `--login` flag
    pub fn sign_in_required(&self, login_flag: bool) -> bool {
        login_flag || self.require_login
    }

    /// Load settings from disk, or default settings if the file doesn't exist
    pub fn load_or_create(paths: &LedgerPaths) -> LedgerResult<Self> {
        let settings_path = paths.settings_file();

        if !settings_path.exists() {
            // Not saved here; `init` decides when to persist
            return Ok(Settings::default());
        }

        let contents = std::fs::read_to_string(&settings_path)
            .map_err(|e| LedgerError::Io(format!("Failed to read settings file: {}", e)))?;

        serde_json::from_str(&contents)
            .map_err(|e| LedgerError::Config(format!("Failed to parse settings file: {}", e)))
    }

    /// Save settings to disk
    pub fn save(&self, paths: &LedgerPaths) -> LedgerResult<()> {
        paths.ensure_directories()?;

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| LedgerError::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(paths.settings_file(), contents)
            .map_err(|e| LedgerError::Io(format!("Failed to write settings file: {}", e)))?;

        Ok(())
    }
}
