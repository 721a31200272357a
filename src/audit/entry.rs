//! Audit event data structures
//!
//! Defines the event kinds, outcomes and the multi-line text format written
//! to the audit sinks.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::models::Money;

use super::fingerprint::OperatingContext;

/// Actor name used for events raised by the ledger itself
pub const SYSTEM_ACTOR: &str = "SYSTEM";

/// Action name for a failed read/decrypt of a stored row
pub const ACTION_DATABASE_READ: &str = "Database Read / Decrypt";

/// Severity forwarded to the primary sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Information,
    Warning,
}

/// The result of an audited operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
    AccountNotFound,
    InsufficientFunds,
    AdminApprovalDenied,
    CancelledByUser,
    TamperDetected,
    UnsupportedAccountType,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Outcome::Success => "Success",
            Outcome::Failure => "Failure",
            Outcome::AccountNotFound => "Failure - Account Not Found",
            Outcome::InsufficientFunds => "Failure - Insufficient Funds",
            Outcome::AdminApprovalDenied => "Failure - Admin Approval Denied",
            Outcome::CancelledByUser => "Cancelled By User",
            Outcome::TamperDetected => "Failure - Possible Data Tampering Detected",
            Outcome::UnsupportedAccountType => "Failure - Unsupported Account Type",
        };
        f.write_str(text)
    }
}

/// What kind of event is being recorded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// An operation against an account
    Transaction {
        account_id: String,
        holder: String,
        action: String,
    },
    /// A credential check
    LoginAttempt,
}

/// A single audit event
///
/// Built once and never changed; rendering attaches the operating context.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEvent {
    pub actor: String,
    pub kind: EventKind,
    pub outcome: Outcome,
    pub timestamp: DateTime<Utc>,
    pub amount: Option<Money>,
    pub reason: Option<String>,
    pub approver: Option<String>,
    pub details: Option<String>,
}

impl AuditEvent {
    /// Create an event for an operation against an account
    pub fn transaction(
        actor: impl Into<String>,
        account_id: impl Into<String>,
        holder: impl Into<String>,
        action: impl Into<String>,
        outcome: Outcome,
    ) -> Self {
        Self {
            actor: actor.into(),
            kind: EventKind::Transaction {
                account_id: account_id.into(),
                holder: holder.into(),
                action: action.into(),
            },
            outcome,
            timestamp: Utc::now(),
            amount: None,
            reason: None,
            approver: None,
            details: None,
        }
    }

    /// Create an event for a credential check
    pub fn login_attempt(user: impl Into<String>, success: bool) -> Self {
        Self {
            actor: user.into(),
            kind: EventKind::LoginAttempt,
            outcome: if success {
                Outcome::Success
            } else {
                Outcome::Failure
            },
            timestamp: Utc::now(),
            amount: None,
            reason: None,
            approver: None,
            details: None,
        }
    }

    /// Event raised when a stored row fails to decrypt
    pub fn tamper_detected(account_id: impl Into<String>) -> Self {
        Self::transaction(
            SYSTEM_ACTOR,
            account_id,
            "Unknown",
            ACTION_DATABASE_READ,
            Outcome::TamperDetected,
        )
    }

    /// Event raised when a stored row has an unknown account discriminator
    pub fn unsupported_account(account_id: impl Into<String>) -> Self {
        Self::transaction(
            SYSTEM_ACTOR,
            account_id,
            "Unknown",
            ACTION_DATABASE_READ,
            Outcome::UnsupportedAccountType,
        )
    }

    pub fn with_amount(mut self, amount: Money) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_reason(mut self, reason: Option<impl Into<String>>) -> Self {
        self.reason = reason.map(Into::into).filter(|r: &String| !r.trim().is_empty());
        self
    }

    pub fn with_approver(mut self, approver: Option<impl Into<String>>) -> Self {
        self.approver = approver
            .map(Into::into)
            .filter(|a: &String| !a.trim().is_empty());
        self
    }

    pub fn with_details(mut self, details: Option<impl Into<String>>) -> Self {
        self.details = details
            .map(Into::into)
            .filter(|d: &String| !d.trim().is_empty());
        self
    }

    /// The action name ("Login Attempt" for credential checks)
    pub fn action(&self) -> &str {
        match &self.kind {
            EventKind::Transaction { action, .. } => action,
            EventKind::LoginAttempt => "Login Attempt",
        }
    }

    /// Severity for the primary sink
    pub fn severity(&self) -> Severity {
        match (&self.kind, &self.outcome) {
            (EventKind::LoginAttempt, outcome) if !outcome.is_success() => Severity::Warning,
            (_, Outcome::TamperDetected | Outcome::UnsupportedAccountType) => Severity::Warning,
            _ => Severity::Information,
        }
    }

    /// Render the event as the multi-line audit message
    pub fn render(&self, context: &OperatingContext) -> String {
        let when = self.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true);
        let mut lines = Vec::with_capacity(10);

        match &self.kind {
            EventKind::Transaction {
                account_id, holder, ..
            } => {
                lines.push(format!("WHO(Teller): {}", self.actor));
                lines.push(format!("WHO(Account): {} - {}", account_id, holder));
            }
            EventKind::LoginAttempt => lines.push(format!("WHO: {}", self.actor)),
        }

        lines.push(format!("WHAT: {}", self.action()));
        lines.push(format!("WHERE: {}", context.location));
        lines.push(format!("WHEN: {}", when));

        if let Some(amount) = self.amount {
            lines.push(format!("AMOUNT: {}", amount));
        }
        if let Some(reason) = &self.reason {
            lines.push(format!("WHY: {}", reason));
        }
        if let Some(approver) = &self.approver {
            lines.push(format!("ADMIN_APPROVAL: {}", approver));
        }

        lines.push(format!("HOW: {}", context.application));
        lines.push(format!("OUTCOME: {}", self.outcome));

        if let Some(details) = &self.details {
            lines.push(format!("DETAILS: {}", details));
        }

        lines.join("\n")
    }
}
