//! Custom error types for the teller ledger
//!
//! This module defines the error hierarchy for the application using thiserror
//! for ergonomic error definitions.
//!
//! Propagation policy: key and cipher faults are loud, per-record data faults
//! are contained by the store, and business outcomes such as insufficient
//! funds are plain return values rather than errors.

use thiserror::Error;

/// The main error type for ledger operations
#[derive(Error, Debug)]
pub enum LedgerError {
    /// The sealed key could not be produced or unsealed
    #[error("Encryption key unavailable: {0}")]
    KeyUnavailable(String),

    /// A cipher was constructed with a key of the wrong size
    #[error("Invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// An encrypted token does not have the expected shape
    #[error("Malformed encrypted token: {0}")]
    MalformedToken(String),

    /// Tag verification failed (tampering, wrong key or corruption)
    #[error("Authentication failed: encrypted value was tampered with or the key is wrong")]
    AuthenticationFailed,

    /// An account variant the store does not know how to persist
    #[error("Unsupported account type: {0}")]
    UnsupportedAccountType(String),

    /// A deposit/withdrawal amount that is zero, negative or out of range
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Validation errors for data models and teller input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Backing row store errors
    #[error("Storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Create a "not found" error for accounts
    pub fn account_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Account",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for directory users
    pub fn user_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "User",
            identifier: identifier.into(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::InvalidAmount(_))
    }

    /// Check if this error means a stored value failed to decrypt
    ///
    /// These are the per-record faults the store contains by skipping the row.
    pub fn is_tamper(&self) -> bool {
        matches!(self, Self::MalformedToken(_) | Self::AuthenticationFailed)
    }

    /// Check if this is a fatal key-management fault
    pub fn is_key_fault(&self) -> bool {
        matches!(
            self,
            Self::KeyUnavailable(_) | Self::InvalidKeyLength { .. }
        )
    }

    /// Message suitable for showing to a teller
    ///
    /// Cryptographic detail is never included.
    pub fn user_message(&self) -> String {
        match self {
            Self::KeyUnavailable(_) | Self::InvalidKeyLength { .. } => {
                "The encryption key could not be loaded. No data was changed.".to_string()
            }
            Self::MalformedToken(_) | Self::AuthenticationFailed => {
                "A stored record failed its integrity check.".to_string()
            }
            Self::UnsupportedAccountType(_) => "That account type is not supported.".to_string(),
            Self::InvalidAmount(msg) | Self::Validation(msg) => msg.clone(),
            Self::NotFound { entity_type, .. } => format!("{} does not exist.", entity_type),
            Self::Storage(_) | Self::Io(_) | Self::Json(_) => {
                "The ledger could not be read or written. No data was changed.".to_string()
            }
            Self::Config(msg) => format!("Configuration problem: {}", msg),
        }
    }
}

// Implement From traits for common error types

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<rusqlite::Error> for LedgerError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Result type alias for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
