//! Audit trail with permanent failover
//!
//! Events go to the primary sink until it fails once; from then on every
//! event for the rest of the process goes to the fallback file. Recording
//! never returns an error to the caller.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

use crate::models::Money;

use super::entry::{AuditEvent, Outcome};
use super::fingerprint::OperatingContext;
use super::sink::{EventSink, FallbackLog};

/// Records audit events to the primary sink or the fallback file
pub struct AuditTrail {
    primary: Box<dyn EventSink>,
    fallback: FallbackLog,
    primary_available: AtomicBool,
    registered: AtomicBool,
}

impl AuditTrail {
    pub fn new(primary: Box<dyn EventSink>, fallback: FallbackLog) -> Self {
        Self {
            primary,
            fallback,
            primary_available: AtomicBool::new(true),
            registered: AtomicBool::new(false),
        }
    }

    /// Whether events still go to the primary sink
    pub fn primary_available(&self) -> bool {
        self.primary_available.load(Ordering::SeqCst)
    }

    pub fn fallback(&self) -> &FallbackLog {
        &self.fallback
    }

    /// Register the primary event source; on failure switch to the fallback
    ///
    /// Safe to call more than once.
    pub fn ensure_primary_registered(&self) {
        if self.registered.load(Ordering::SeqCst) || !self.primary_available() {
            return;
        }

        match self.primary.register() {
            Ok(()) => {
                self.registered.store(true, Ordering::SeqCst);
                debug!("audit event source registered");
            }
            Err(e) => self.switch_to_fallback(&format!(
                "Event log unavailable ({}). Falling back to file logging.",
                e
            )),
        }
    }

    /// Record one event
    pub fn record(&self, event: &AuditEvent) {
        self.ensure_primary_registered();

        let message = event.render(&OperatingContext::capture());

        if self.primary_available() {
            match self.primary.write(event.severity(), &message) {
                Ok(()) => return,
                Err(e) => self.switch_to_fallback(&format!(
                    "Event log write failed ({}). Falling back to file logging.",
                    e
                )),
            }
        }

        self.write_fallback(&message);
    }

    /// Record an operation against an account
    #[allow(clippy::too_many_arguments)]
    pub fn record_transaction(
        &self,
        actor: &str,
        account_id: &str,
        holder: &str,
        action: &str,
        outcome: Outcome,
        amount: Option<Money>,
        reason: Option<&str>,
        approver: Option<&str>,
    ) {
        let mut event = AuditEvent::transaction(actor, account_id, holder, action, outcome)
            .with_reason(reason)
            .with_approver(approver);
        if let Some(amount) = amount {
            event = event.with_amount(amount);
        }
        self.record(&event);
    }

    /// Record a credential check
    pub fn record_login_attempt(&self, user: &str, success: bool, reason: Option<&str>) {
        self.record(&AuditEvent::login_attempt(user, success).with_details(reason));
    }

    fn switch_to_fallback(&self, note: &str) {
        if self.primary_available.swap(false, Ordering::SeqCst) {
            warn!("audit primary sink unavailable; using fallback file");
            self.write_fallback(note);
        }
    }

    fn write_fallback(&self, message: &str) {
        if let Err(e) = self.fallback.append(message) {
            warn!(error = %e, path = %self.fallback.path().display(), "audit fallback write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::entry::Severity;
    use crate::error::{LedgerError, LedgerResult};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// Sink that records messages, optionally failing to register or write
    #[derive(Default, Clone)]
    struct MemorySink {
        messages: Arc<Mutex<Vec<(Severity, String)>>>,
        fail_register: bool,
        fail_writes_after: Option<usize>,
    }

    impl EventSink for MemorySink {
        fn register(&self) -> LedgerResult<()> {
            if self.fail_register {
                return Err(LedgerError::Io("access denied".into()));
            }
            Ok(())
        }

        fn write(&self, severity: Severity, message: &str) -> LedgerResult<()> {
            let mut messages = self.messages.lock().unwrap();
            if let Some(limit) = self.fail_writes_after {
                if messages.len() >= limit {
                    return Err(LedgerError::Io("log full".into()));
                }
            }
            messages.push((severity, message.to_string()));
            Ok(())
        }
    }

    fn fallback_blocks(trail: &AuditTrail) -> Vec<String> {
        std::fs::read_to_string(trail.fallback().path())
            .unwrap_or_default()
            .split("\n\n")
            .filter(|b| !b.is_empty())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_primary_receives_events() {
        let temp_dir = TempDir::new().unwrap();
        let sink = MemorySink::default();
        let trail = AuditTrail::new(
            Box::new(sink.clone()),
            FallbackLog::new(temp_dir.path().join("audit-fallback.log")),
        );

        trail.record_login_attempt("jdoe", true, None);
        trail.record_transaction(
            "jdoe",
            "acc-1",
            "Alice",
            "Lodgement",
            Outcome::Success,
            Some(Money::from_cents(100)),
            None,
            None,
        );

        let messages = sink.messages.lock().unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages[1].1.contains("WHAT: Lodgement"));
        assert!(trail.primary_available());
        assert!(!trail.fallback().path().exists());
    }

    #[test]
    fn test_unavailable_primary_uses_fallback_for_everything() {
        let temp_dir = TempDir::new().unwrap();
        let sink = MemorySink {
            fail_register: true,
            ..Default::default()
        };
        let trail = AuditTrail::new(
            Box::new(sink.clone()),
            FallbackLog::new(temp_dir.path().join("audit-fallback.log")),
        );

        trail.ensure_primary_registered();
        trail.ensure_primary_registered();
        trail.record_login_attempt("jdoe", false, Some("Invalid credentials"));
        trail.record(&AuditEvent::tamper_detected("acc-2"));

        assert!(sink.messages.lock().unwrap().is_empty());
        assert!(!trail.primary_available());

        let blocks = fallback_blocks(&trail);
        assert_eq!(blocks.len(), 3);
        assert!(blocks[0].contains("Falling back to file logging"));
        assert!(blocks[1].contains("DETAILS: Invalid credentials"));
        assert!(blocks[2].contains("OUTCOME: Failure - Possible Data Tampering Detected"));
    }

    #[test]
    fn test_first_write_failure_is_permanent() {
        let temp_dir = TempDir::new().unwrap();
        let sink = MemorySink {
            fail_writes_after: Some(1),
            ..Default::default()
        };
        let trail = AuditTrail::new(
            Box::new(sink.clone()),
            FallbackLog::new(temp_dir.path().join("audit-fallback.log")),
        );

        trail.record_login_attempt("a", true, None);
        trail.record_login_attempt("b", true, None);
        trail.record_login_attempt("c", true, None);

        assert_eq!(sink.messages.lock().unwrap().len(), 1);
        let blocks = fallback_blocks(&trail);
        assert_eq!(blocks.len(), 3);
        assert!(blocks[1].contains("WHO: b"));
        assert!(blocks[2].contains("WHO: c"));
    }

    #[test]
    fn test_failing_fallback_is_silent() {
        let temp_dir = TempDir::new().unwrap();
        let sink = MemorySink {
            fail_register: true,
            ..Default::default()
        };
        let trail = AuditTrail::new(
            Box::new(sink),
            FallbackLog::new(temp_dir.path().join("no-such-dir").join("audit.log")),
        );

        trail.record_login_attempt("jdoe", true, None);
        trail.record(&AuditEvent::tamper_detected("acc-3"));
        assert!(!trail.primary_available());
    }
}
