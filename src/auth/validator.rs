//! Credential validation capability

use crate::crypto::SecretBytes;
use crate::error::LedgerResult;

/// Checks credentials and group membership against a user directory
///
/// Callers treat any `Err` as a failed validation.
pub trait CredentialValidator: Send + Sync {
    /// Whether `password` is correct for `username`
    fn validate(&self, username: &str, password: &[u8]) -> LedgerResult<bool>;

    /// Whether `username` belongs to `group`
    fn is_member(&self, username: &str, group: &str) -> LedgerResult<bool>;
}

/// A username and password pair as typed by a person
pub struct Credentials {
    pub username: String,
    pub password: SecretBytes,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into().trim().to_string(),
            password: SecretBytes::from(password.into()),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}
