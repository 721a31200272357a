//! Audit logging for teller operations
//!
//! Every teller operation, login attempt and stored-record integrity failure
//! is recorded as a WHO/WHAT/WHERE/WHEN/HOW/OUTCOME message.
//!
//! # Architecture
//!
//! - `AuditEvent`: a single immutable event with its outcome and optional
//!   amount, reason and approving administrator.
//! - `OperatingContext`: the location and application fingerprint captured
//!   for each event.
//! - `EventSink` / `SyslogSink`: the primary system event log.
//! - `FallbackLog`: append-only text file used once the primary has failed.
//! - `AuditTrail`: routes events and owns the failover switch.
//!
//! # Example
//!
//! ```rust,ignore
//! use teller_ledger::audit::{AuditTrail, FallbackLog, Outcome, SyslogSink};
//!
//! let trail = AuditTrail::new(
//!     Box::new(SyslogSink::new("Teller Ledger")),
//!     FallbackLog::new(paths.audit_fallback_file()),
//! );
//! trail.ensure_primary_registered();
//! trail.record_login_attempt("jdoe", true, None);
//! ```

mod entry;
mod fingerprint;
mod sink;
mod trail;

pub use entry::{
    AuditEvent, EventKind, Outcome, Severity, ACTION_DATABASE_READ, SYSTEM_ACTOR,
};
pub use fingerprint::OperatingContext;
pub use sink::{EventSink, FallbackLog, SyslogSink, SYSLOG_SOCKET};
pub use trail::AuditTrail;
