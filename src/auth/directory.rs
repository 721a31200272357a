//! Local user directory
//!
//! A JSON file of users with Argon2 PHC password hashes and group lists. It
//! stands in for an organisation's directory service on a single machine.

use std::path::{Path, PathBuf};

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::crypto::KdfCost;
use crate::error::{LedgerError, LedgerResult};
use crate::storage::{read_json, write_json_atomic};

use super::validator::CredentialValidator;

/// A directory user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryUser {
    pub username: String,
    /// Argon2 PHC string
    pub password_hash: String,
    #[serde(default)]
    pub groups: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct DirectoryData {
    users: Vec<DirectoryUser>,
}

/// File-backed [`CredentialValidator`]
pub struct LocalDirectory {
    path: PathBuf,
    users: Vec<DirectoryUser>,
    cost: KdfCost,
}

impl LocalDirectory {
    /// Load the directory file; a missing file is an empty directory
    pub fn open(path: impl Into<PathBuf>, cost: KdfCost) -> LedgerResult<Self> {
        let path = path.into();
        let data: DirectoryData = read_json(&path)?;
        debug!(users = data.users.len(), "loaded user directory");
        Ok(Self {
            path,
            users: data.users,
            cost,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn users(&self) -> &[DirectoryUser] {
        &self.users
    }

    /// Add a user, or replace the password and groups of an existing one
    pub fn upsert_user(&mut self, username: &str, password: &[u8], groups: &[String]) -> LedgerResult<()> {
        let username = username.trim();
        if username.is_empty() {
            return Err(LedgerError::Validation("Username cannot be empty".into()));
        }
        if password.is_empty() {
            return Err(LedgerError::Validation("Password cannot be empty".into()));
        }

        let password_hash = self.hash_password(password)?;
        let groups: Vec<String> = groups
            .iter()
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty())
            .collect();

        let existing = self
            .users
            .iter()
            .position(|u| u.username.eq_ignore_ascii_case(username));

        match existing {
            Some(index) => {
                let user = &mut self.users[index];
                user.password_hash = password_hash;
                user.groups = groups;
            }
            None => self.users.push(DirectoryUser {
                username: username.to_string(),
                password_hash,
                groups,
            }),
        }

        info!(user = %username, "directory user saved");
        Ok(())
    }

    /// Write the directory back to disk
    pub fn save(&self) -> LedgerResult<()> {
        write_json_atomic(
            &self.path,
            &DirectoryData {
                users: self.users.clone(),
            },
        )
    }

    fn find(&self, username: &str) -> Option<&DirectoryUser> {
        let username = username.trim();
        self.users
            .iter()
            .find(|u| u.username.eq_ignore_ascii_case(username))
    }

    fn hash_password(&self, password: &[u8]) -> LedgerResult<String> {
        let params = Params::new(
            self.cost.memory_cost,
            self.cost.time_cost,
            self.cost.parallelism,
            None,
        )
        .map_err(|e| LedgerError::Config(format!("invalid Argon2 parameters: {}", e)))?;

        let salt = SaltString::generate(&mut OsRng);
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
            .hash_password(password, &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| LedgerError::Validation(format!("password hashing failed: {}", e)))
    }
}

impl CredentialValidator for LocalDirectory {
    fn validate(&self, username: &str, password: &[u8]) -> LedgerResult<bool> {
        let Some(user) = self.find(username) else {
            return Ok(false);
        };

        let hash = PasswordHash::new(&user.password_hash).map_err(|e| {
            LedgerError::Config(format!("stored hash for {} is invalid: {}", user.username, e))
        })?;

        Ok(Argon2::default().verify_password(password, &hash).is_ok())
    }

    fn is_member(&self, username: &str, group: &str) -> LedgerResult<bool> {
        let group = group.trim();
        Ok(self
            .find(username)
            .map(|u| u.groups.iter().any(|g| g.eq_ignore_ascii_case(group)))
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn directory(temp_dir: &TempDir) -> LocalDirectory {
        LocalDirectory::open(temp_dir.path().join("directory.json"), KdfCost::minimal()).unwrap()
    }

    #[test]
    fn test_validate_and_membership() {
        let temp_dir = TempDir::new().unwrap();
        let mut dir = directory(&temp_dir);
        dir.upsert_user("jdoe", b"hunter2", &["Bank Teller".to_string()])
            .unwrap();

        assert!(dir.validate("jdoe", b"hunter2").unwrap());
        assert!(dir.validate("JDOE", b"hunter2").unwrap());
        assert!(!dir.validate("jdoe", b"wrong").unwrap());
        assert!(!dir.validate("nobody", b"hunter2").unwrap());

        assert!(dir.is_member("jdoe", "Bank Teller ").unwrap());
        assert!(!dir.is_member("jdoe", "Bank Teller Administrator").unwrap());
        assert!(!dir.is_member("nobody", "Bank Teller").unwrap());
    }

    #[test]
    fn test_save_and_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let mut dir = directory(&temp_dir);
        dir.upsert_user("admin", b"s3cret", &["Bank Teller Administrator".to_string()])
            .unwrap();
        dir.save().unwrap();

        let contents = std::fs::read_to_string(dir.path()).unwrap();
        assert!(!contents.contains("s3cret"));
        assert!(contents.contains("$argon2id$"));

        let reopened = directory(&temp_dir);
        assert_eq!(reopened.users().len(), 1);
        assert!(reopened.validate("admin", b"s3cret").unwrap());
    }

    #[test]
    fn test_upsert_replaces_password() {
        let temp_dir = TempDir::new().unwrap();
        let mut dir = directory(&temp_dir);
        dir.upsert_user("jdoe", b"old", &[]).unwrap();
        dir.upsert_user("jdoe", b"new", &["Bank Teller".to_string()])
            .unwrap();

        assert_eq!(dir.users().len(), 1);
        assert!(!dir.validate("jdoe", b"old").unwrap());
        assert!(dir.validate("jdoe", b"new").unwrap());
    }

    #[test]
    fn test_corrupt_hash_is_error() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("directory.json"),
            r#"{"users":[{"username":"jdoe","password_hash":"not-a-hash","groups":[]}]}"#,
        )
        .unwrap();

        let dir = directory(&temp_dir);
        assert!(dir.validate("jdoe", b"x").is_err());
    }

    #[test]
    fn test_rejects_empty_username() {
        let temp_dir = TempDir::new().unwrap();
        let mut dir = directory(&temp_dir);
        assert!(dir.upsert_user("  ", b"pw", &[]).unwrap_err().is_validation());
    }
}
