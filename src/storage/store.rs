//! Encrypted account store over SQLite
//!
//! Accounts are held in memory behind a `RwLock` and written through to the
//! `bank_accounts` table. Every mutation writes the row store first and only
//! then updates memory, while holding the write guard for the whole
//! read-modify-write.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rusqlite::{params, Connection};
use tracing::{debug, info, instrument, warn};

use crate::audit::{AuditEvent, AuditTrail};
use crate::crypto::FieldCipher;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{Account, AccountId, Money};

use super::schema::{
    EncodedRow, RowFault, StoredRow, CREATE_TABLE_SQL, DELETE_SQL, INSERT_SQL, SELECT_ALL_SQL,
    UPDATE_BALANCE_SQL,
};

/// Account number recorded when a row's key column itself is unreadable
const UNREADABLE_ACCOUNT_NO: &str = "Unknown";

/// Summary of a [`AccountStore::load`] pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Rows decoded into accounts
    pub loaded: usize,
    /// Rows skipped because they failed to read, decrypt or validate
    pub tampered: usize,
    /// Rows skipped because of an unknown account discriminator
    pub unsupported: usize,
}

/// The process-wide owner of account state
pub struct AccountStore {
    db_path: PathBuf,
    cipher: FieldCipher,
    audit: Arc<AuditTrail>,
    accounts: RwLock<HashMap<AccountId, Account>>,
}

impl AccountStore {
    pub fn new(db_path: impl Into<PathBuf>, cipher: FieldCipher, audit: Arc<AuditTrail>) -> Self {
        Self {
            db_path: db_path.into(),
            cipher,
            audit,
            accounts: RwLock::new(HashMap::new()),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Replace the in-memory collection with the decoded contents of the table
    ///
    /// Rows that fail to read, decrypt or validate, or that carry an unknown
    /// discriminator, are audited and skipped; the remaining rows still load.
    /// Only a failure of the query itself is an error.
    #[instrument(skip_all)]
    pub fn load(&self) -> LedgerResult<LoadReport> {
        let mut accounts = self.write_guard()?;

        if !self.db_path.exists() {
            self.connect()?;
            accounts.clear();
            info!("created empty account table");
            return Ok(LoadReport::default());
        }

        let conn = self.connect()?;
        let mut stmt = conn.prepare(SELECT_ALL_SQL)?;
        let mut rows = stmt.query([])?;

        accounts.clear();
        let mut report = LoadReport::default();

        while let Some(row) = rows.next()? {
            let account_no: String = row
                .get(0)
                .unwrap_or_else(|_| UNREADABLE_ACCOUNT_NO.to_string());

            // A column of the wrong SQL type is a corrupt row, not a failed load
            let decoded = StoredRow::from_row(row)
                .map_err(|e| RowFault::Corrupt(e.into()))
                .and_then(|stored| stored.decode(&self.cipher));

            match decoded {
                Ok(account) => {
                    accounts.insert(account.id, account);
                    report.loaded += 1;
                }
                Err(RowFault::Corrupt(e)) => {
                    warn!(error = %e, "stored account failed integrity check; skipping row");
                    self.audit.record(&AuditEvent::tamper_detected(account_no));
                    report.tampered += 1;
                }
                Err(RowFault::UnsupportedType(discriminator)) => {
                    warn!(discriminator, "stored account has unknown type; skipping row");
                    self.audit
                        .record(&AuditEvent::unsupported_account(account_no));
                    report.unsupported += 1;
                }
            }
        }

        info!(
            loaded = report.loaded,
            tampered = report.tampered,
            unsupported = report.unsupported,
            "loaded accounts"
        );
        Ok(report)
    }

    /// Persist a new account and add it to memory
    ///
    /// Every PII field is encrypted before the insert; on any failure neither
    /// the table nor memory changes.
    #[instrument(skip_all, fields(account = %account.id))]
    pub fn add(&self, account: Account) -> LedgerResult<AccountId> {
        account
            .validate()
            .map_err(|e| LedgerError::Validation(e.to_string()))?;

        let row = EncodedRow::encode(&account, &self.cipher)?;

        let mut accounts = self.write_guard()?;
        if accounts.contains_key(&account.id) {
            return Err(LedgerError::Validation(format!(
                "account {} already exists",
                account.id
            )));
        }

        let conn = self.connect()?;
        conn.execute(
            INSERT_SQL,
            params![
                row.account_no,
                row.pii[0],
                row.pii[1],
                row.pii[2],
                row.pii[3],
                row.pii[4],
                row.balance,
                row.account_type,
                row.overdraft_amount,
                row.interest_rate,
            ],
        )?;

        let id = account.id;
        accounts.insert(id, account);
        debug!("account added");
        Ok(id)
    }

    /// Look up an account in memory
    pub fn find_by_id(&self, id: AccountId) -> LedgerResult<Option<Account>> {
        Ok(self.read_guard()?.get(&id).cloned())
    }

    /// Delete an account; `false` if it does not exist
    #[instrument(skip_all, fields(account = %id))]
    pub fn close(&self, id: AccountId) -> LedgerResult<bool> {
        let mut accounts = self.write_guard()?;
        if !accounts.contains_key(&id) {
            return Ok(false);
        }

        let conn = self.connect()?;
        conn.execute(DELETE_SQL, params![id.to_string()])?;

        accounts.remove(&id);
        debug!("account closed");
        Ok(true)
    }

    /// Add funds; `false` if the account does not exist
    #[instrument(skip_all, fields(account = %id))]
    pub fn deposit(&self, id: AccountId, amount: Money) -> LedgerResult<bool> {
        require_positive(amount)?;

        let mut accounts = self.write_guard()?;
        let Some(account) = accounts.get_mut(&id) else {
            return Ok(false);
        };

        let balance = account.balance_after_lodgement(amount).ok_or_else(|| {
            LedgerError::InvalidAmount("resulting balance is out of range".to_string())
        })?;

        self.persist_balance(id, balance)?;
        account.balance = balance;
        Ok(true)
    }

    /// Remove funds; `false` if the account does not exist or the withdrawal
    /// would take the balance below what the account kind allows
    #[instrument(skip_all, fields(account = %id))]
    pub fn withdraw(&self, id: AccountId, amount: Money) -> LedgerResult<bool> {
        require_positive(amount)?;

        let mut accounts = self.write_guard()?;
        let Some(account) = accounts.get_mut(&id) else {
            return Ok(false);
        };

        let Some(balance) = account.balance_after_withdrawal(amount) else {
            debug!("insufficient funds");
            return Ok(false);
        };

        self.persist_balance(id, balance)?;
        account.balance = balance;
        Ok(true)
    }

    /// Snapshot of all accounts, ordered by holder name then id
    pub fn accounts(&self) -> LedgerResult<Vec<Account>> {
        let mut accounts: Vec<Account> = self.read_guard()?.values().cloned().collect();
        accounts.sort_by(|a, b| {
            a.holder
                .name
                .cmp(&b.holder.name)
                .then(a.id.to_string().cmp(&b.id.to_string()))
        });
        Ok(accounts)
    }

    /// Number of accounts in memory
    pub fn len(&self) -> LedgerResult<usize> {
        Ok(self.read_guard()?.len())
    }

    pub fn is_empty(&self) -> LedgerResult<bool> {
        Ok(self.len()? == 0)
    }

    fn persist_balance(&self, id: AccountId, balance: Money) -> LedgerResult<()> {
        let conn = self.connect()?;
        let updated = conn.execute(UPDATE_BALANCE_SQL, params![balance.cents(), id.to_string()])?;
        if updated == 0 {
            return Err(LedgerError::Storage(format!(
                "account {} is missing from the table",
                id
            )));
        }
        Ok(())
    }

    fn connect(&self) -> LedgerResult<Connection> {
        if let Some(parent) = self.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(&self.db_path)?;
        conn.execute_batch(CREATE_TABLE_SQL)?;
        Ok(conn)
    }

    fn read_guard(&self) -> LedgerResult<RwLockReadGuard<'_, HashMap<AccountId, Account>>> {
        self.accounts
            .read()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire read lock: {}", e)))
    }

    fn write_guard(&self) -> LedgerResult<RwLockWriteGuard<'_, HashMap<AccountId, Account>>> {
        self.accounts
            .write()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire write lock: {}", e)))
    }
}

fn require_positive(amount: Money) -> LedgerResult<()> {
    if amount.is_positive() {
        Ok(())
    } else {
        Err(LedgerError::InvalidAmount(format!(
            "amount must be greater than zero, got {}",
            amount
        )))
    }
}
