//! Process-wide ledger bootstrap
//!
//! Wires the audit trail, the sealed data key, the field cipher and the
//! account store together, in that order, and loads the accounts.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::audit::{AuditTrail, EventSink, FallbackLog, SyslogSink};
use crate::config::{LedgerPaths, Settings};
use crate::crypto::{FieldCipher, KeyProtector, KeySealer, UserBoundSealer};
use crate::error::LedgerResult;
use crate::storage::{AccountStore, LoadReport};

use super::teller::TellerService;

/// The opened ledger: one per process
pub struct Ledger {
    paths: LedgerPaths,
    settings: Settings,
    audit: Arc<AuditTrail>,
    store: AccountStore,
    load_report: LoadReport,
}

impl Ledger {
    /// Open with the system event log and a key sealed to the current OS user
    pub fn open(paths: LedgerPaths, settings: Settings) -> LedgerResult<Self> {
        paths.ensure_directories()?;
        let sealer = UserBoundSealer::for_current_user(&paths.user_secret_file(), settings.kdf)?;
        let primary = SyslogSink::new(settings.event_source.clone());
        Self::open_with(paths, settings, Box::new(sealer), Box::new(primary))
    }

    /// Open with explicit sealing and event-log backends
    #[instrument(skip_all, fields(base = %paths.base_dir().display()))]
    pub fn open_with(
        paths: LedgerPaths,
        settings: Settings,
        sealer: Box<dyn KeySealer>,
        primary: Box<dyn EventSink>,
    ) -> LedgerResult<Self> {
        paths.ensure_directories()?;

        let audit = Arc::new(AuditTrail::new(
            primary,
            FallbackLog::new(paths.audit_fallback_file()),
        ));
        audit.ensure_primary_registered();

        let cipher = {
            let key = KeyProtector::new(paths.key_file(), sealer).get_or_create_key()?;
            FieldCipher::with_policy(key.as_bytes(), settings.legacy_policy())?
        };

        let store = AccountStore::new(paths.database_file(), cipher, audit.clone());
        let load_report = store.load()?;

        info!(accounts = load_report.loaded, "ledger opened");
        Ok(Self {
            paths,
            settings,
            audit,
            store,
            load_report,
        })
    }

    pub fn paths(&self) -> &LedgerPaths {
        &self.paths
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn audit(&self) -> &Arc<AuditTrail> {
        &self.audit
    }

    pub fn store(&self) -> &AccountStore {
        &self.store
    }

    /// What the initial load found
    pub fn load_report(&self) -> LoadReport {
        self.load_report
    }

    /// Operations on behalf of a signed-in teller
    pub fn teller(&self, teller: impl Into<String>) -> TellerService<'_> {
        TellerService::new(&self.store, &self.audit, self.settings.limits, teller)
    }
}
