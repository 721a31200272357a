//! Attempt-limited credential gates
//!
//! A gate asks for credentials up to a fixed number of times. Each attempt
//! checks the password first and group membership second, and every attempt
//! is audited as a login attempt.

use std::sync::Arc;

use tracing::{info, warn};

use crate::audit::AuditTrail;

use super::validator::{CredentialValidator, Credentials};

/// Attempts allowed before a teller login gives up
pub const LOGIN_ATTEMPTS: u32 = 5;

/// Attempts allowed for administrator approval
pub const APPROVAL_ATTEMPTS: u32 = 3;

/// Audit details recorded for each kind of failed attempt
#[derive(Debug, Clone, Copy)]
struct FailureReasons {
    bad_credentials: &'static str,
    not_in_group: &'static str,
    directory_error: &'static str,
}

const LOGIN_REASONS: FailureReasons = FailureReasons {
    bad_credentials: "Invalid credentials",
    not_in_group: "User not in teller group",
    directory_error: "Directory error",
};

const APPROVAL_REASONS: FailureReasons = FailureReasons {
    bad_credentials: "Invalid admin credentials",
    not_in_group: "User not in admin group",
    directory_error: "Directory error during admin approval",
};

/// Why a single attempt was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptFailure {
    BadCredentials,
    NotInGroup,
    DirectoryError,
}

struct Gate {
    validator: Arc<dyn CredentialValidator>,
    audit: Arc<AuditTrail>,
    group: String,
    max_attempts: u32,
    reasons: FailureReasons,
}

impl Gate {
    fn check(&self, credentials: &Credentials) -> Result<(), AttemptFailure> {
        let username = credentials.username.as_str();

        match self
            .validator
            .validate(username, credentials.password.as_slice())
        {
            Ok(true) => {}
            Ok(false) => return Err(AttemptFailure::BadCredentials),
            Err(e) => {
                warn!(error = %e, "directory error while validating credentials");
                return Err(AttemptFailure::DirectoryError);
            }
        }

        match self.validator.is_member(username, &self.group) {
            Ok(true) => Ok(()),
            Ok(false) => Err(AttemptFailure::NotInGroup),
            Err(e) => {
                warn!(error = %e, "directory error while checking group membership");
                Err(AttemptFailure::DirectoryError)
            }
        }
    }

    fn run<F, R>(&self, mut prompt: F, mut on_failure: R) -> Option<String>
    where
        F: FnMut(u32) -> Option<Credentials>,
        R: FnMut(AttemptFailure, u32),
    {
        for attempt in 1..=self.max_attempts {
            let credentials = prompt(attempt)?;

            match self.check(&credentials) {
                Ok(()) => {
                    self.audit
                        .record_login_attempt(&credentials.username, true, None);
                    return Some(credentials.username);
                }
                Err(failure) => {
                    let reason = match failure {
                        AttemptFailure::BadCredentials => self.reasons.bad_credentials,
                        AttemptFailure::NotInGroup => self.reasons.not_in_group,
                        AttemptFailure::DirectoryError => self.reasons.directory_error,
                    };
                    self.audit
                        .record_login_attempt(&credentials.username, false, Some(reason));
                    on_failure(failure, self.max_attempts - attempt);
                }
            }
        }

        None
    }
}

/// Teller sign-in: up to five attempts against the teller group
pub struct LoginGate {
    gate: Gate,
}

impl LoginGate {
    pub fn new(
        validator: Arc<dyn CredentialValidator>,
        audit: Arc<AuditTrail>,
        teller_group: impl Into<String>,
    ) -> Self {
        Self {
            gate: Gate {
                validator,
                audit,
                group: teller_group.into(),
                max_attempts: LOGIN_ATTEMPTS,
                reasons: LOGIN_REASONS,
            },
        }
    }

    /// Authenticate a teller
    ///
    /// `prompt` is called with the 1-based attempt number and returns `None`
    /// if the person gives up. `on_failure` receives each refusal and the
    /// number of attempts left. Returns the signed-in username.
    pub fn authenticate<F, R>(&self, prompt: F, on_failure: R) -> Option<String>
    where
        F: FnMut(u32) -> Option<Credentials>,
        R: FnMut(AttemptFailure, u32),
    {
        let result = self.gate.run(prompt, on_failure);
        match &result {
            Some(user) => info!(user = %user, "teller signed in"),
            None => warn!("teller sign-in abandoned or exhausted"),
        }
        result
    }
}

/// Administrator approval: up to three attempts against the admin group
pub struct ApprovalGate {
    gate: Gate,
}

impl ApprovalGate {
    pub fn new(
        validator: Arc<dyn CredentialValidator>,
        audit: Arc<AuditTrail>,
        admin_group: impl Into<String>,
    ) -> Self {
        Self {
            gate: Gate {
                validator,
                audit,
                group: admin_group.into(),
                max_attempts: APPROVAL_ATTEMPTS,
                reasons: APPROVAL_REASONS,
            },
        }
    }

    /// Ask for an administrator's approval; returns the approving username
    pub fn approve<F, R>(&self, prompt: F, on_failure: R) -> Option<String>
    where
        F: FnMut(u32) -> Option<Credentials>,
        R: FnMut(AttemptFailure, u32),
    {
        self.gate.run(prompt, on_failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{EventSink, FallbackLog, Severity};
    use crate::error::{LedgerError, LedgerResult};
    use tempfile::TempDir;

    /// Validator with fixed users: (name, password, groups)
    struct StaticValidator {
        users: Vec<(&'static str, &'static str, Vec<&'static str>)>,
        offline: bool,
    }

    impl CredentialValidator for StaticValidator {
        fn validate(&self, username: &str, password: &[u8]) -> LedgerResult<bool> {
            if self.offline {
                return Err(LedgerError::Io("directory offline".into()));
            }
            Ok(self
                .users
                .iter()
                .any(|(u, p, _)| *u == username && p.as_bytes() == password))
        }

        fn is_member(&self, username: &str, group: &str) -> LedgerResult<bool> {
            Ok(self
                .users
                .iter()
                .any(|(u, _, groups)| *u == username && groups.iter().any(|g| *g == group)))
        }
    }

    struct NoEventLog;

    impl EventSink for NoEventLog {
        fn register(&self) -> LedgerResult<()> {
            Err(LedgerError::Io("no event log".into()))
        }

        fn write(&self, _severity: Severity, _message: &str) -> LedgerResult<()> {
            Err(LedgerError::Io("no event log".into()))
        }
    }

    fn setup(offline: bool) -> (Arc<dyn CredentialValidator>, Arc<AuditTrail>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let validator: Arc<dyn CredentialValidator> = Arc::new(StaticValidator {
            users: vec![
                ("teller", "pw", vec!["Bank Teller"]),
                ("admin", "root", vec!["Bank Teller", "Bank Teller Administrator"]),
            ],
            offline,
        });
        let audit = Arc::new(AuditTrail::new(
            Box::new(NoEventLog),
            FallbackLog::new(temp_dir.path().join("audit.log")),
        ));
        (validator, audit, temp_dir)
    }

    fn audit_text(temp_dir: &TempDir) -> String {
        std::fs::read_to_string(temp_dir.path().join("audit.log")).unwrap_or_default()
    }

    fn scripted(
        attempts: Vec<(&'static str, &'static str)>,
    ) -> impl FnMut(u32) -> Option<Credentials> {
        let mut iter = attempts.into_iter();
        move |_| iter.next().map(|(u, p)| Credentials::new(u, p))
    }

    #[test]
    fn test_approval_granted_after_failures() {
        let (validator, audit, temp_dir) = setup(false);
        let gate = ApprovalGate::new(validator, audit, "Bank Teller Administrator");

        let mut failures = Vec::new();
        let approver = gate.approve(
            scripted(vec![("admin", "nope"), ("teller", "pw"), ("admin", "root")]),
            |failure, left| failures.push((failure, left)),
        );

        assert_eq!(approver.as_deref(), Some("admin"));
        assert_eq!(
            failures,
            vec![
                (AttemptFailure::BadCredentials, 2),
                (AttemptFailure::NotInGroup, 1)
            ]
        );

        let audit = audit_text(&temp_dir);
        assert!(audit.contains("DETAILS: Invalid admin credentials"));
        assert!(audit.contains("DETAILS: User not in admin group"));
        assert_eq!(audit.matches("WHAT: Login Attempt").count(), 3);
        assert_eq!(audit.matches("OUTCOME: Success").count(), 1);
    }

    #[test]
    fn test_approval_denied_after_three_attempts() {
        let (validator, audit, _temp) = setup(false);
        let gate = ApprovalGate::new(validator, audit, "Bank Teller Administrator");

        let mut calls = 0;
        let approver = gate.approve(
            |_| {
                calls += 1;
                Some(Credentials::new("admin", "wrong"))
            },
            |_, _| {},
        );

        assert!(approver.is_none());
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_login_allows_five_attempts() {
        let (validator, audit, _temp) = setup(false);
        let gate = LoginGate::new(validator, audit, "Bank Teller");

        let mut attempts = vec![("teller", "bad"); 4];
        attempts.push(("teller", "pw"));
        assert_eq!(
            gate.authenticate(scripted(attempts), |_, _| {}).as_deref(),
            Some("teller")
        );

        let mut calls = 0;
        let result = gate.authenticate(
            |_| {
                calls += 1;
                Some(Credentials::new("teller", "bad"))
            },
            |_, _| {},
        );
        assert!(result.is_none());
        assert_eq!(calls, 5);
    }

    #[test]
    fn test_directory_error_fails_closed() {
        let (validator, audit, temp_dir) = setup(true);
        let gate = LoginGate::new(validator, audit, "Bank Teller");

        let mut failures = Vec::new();
        let result = gate.authenticate(scripted(vec![("teller", "pw")]), |f, _| failures.push(f));

        assert!(result.is_none());
        assert_eq!(failures, vec![AttemptFailure::DirectoryError]);
        assert!(audit_text(&temp_dir).contains("DETAILS: Directory error"));
    }

    #[test]
    fn test_giving_up_stops_prompting() {
        let (validator, audit, temp_dir) = setup(false);
        let gate = ApprovalGate::new(validator, audit, "Bank Teller Administrator");

        assert!(gate.approve(|_| None, |_, _| {}).is_none());
        assert!(!audit_text(&temp_dir).contains("Login Attempt"));
    }
}
