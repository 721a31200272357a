//! Teller authentication and administrator approval
//!
//! Credentials are checked against a [`CredentialValidator`]; the bundled
//! [`LocalDirectory`] keeps Argon2-hashed users in a JSON file.

mod directory;
mod gate;
mod validator;

pub use directory::{DirectoryUser, LocalDirectory};
pub use gate::{ApprovalGate, AttemptFailure, LoginGate, APPROVAL_ATTEMPTS, LOGIN_ATTEMPTS};
pub use validator::{CredentialValidator, Credentials};
