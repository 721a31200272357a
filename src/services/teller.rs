//! Teller service
//!
//! Business operations performed by a signed-in teller: open, view, lodge,
//! withdraw and close. Input is validated against the configured limits and
//! every operation that reaches an account is audited, whatever its outcome.

use tracing::{info, instrument};

use crate::audit::{AuditEvent, AuditTrail, Outcome};
use crate::config::Limits;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{Account, AccountHolder, AccountId, AccountKind, Money};
use crate::storage::AccountStore;

pub const ACTION_ACCOUNT_CREATION: &str = "Account Creation";
pub const ACTION_ACCOUNT_QUERY: &str = "Balance / Account Information Query";
pub const ACTION_LODGEMENT: &str = "Lodgement";
pub const ACTION_WITHDRAWAL: &str = "Withdrawal";
pub const ACTION_ACCOUNT_CLOSURE: &str = "Account Closure";
pub const ACTION_ACCOUNT_LISTING: &str = "Account Listing";

const UNKNOWN_HOLDER: &str = "Unknown";

/// Raw input for opening an account
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub address_line_1: String,
    pub address_line_2: String,
    pub address_line_3: String,
    pub town: String,
    pub opening_balance: Money,
    pub kind: AccountKind,
}

/// Service for teller operations
pub struct TellerService<'a> {
    store: &'a AccountStore,
    audit: &'a AuditTrail,
    limits: Limits,
    teller: String,
}

impl<'a> TellerService<'a> {
    pub fn new(
        store: &'a AccountStore,
        audit: &'a AuditTrail,
        limits: Limits,
        teller: impl Into<String>,
    ) -> Self {
        Self {
            store,
            audit,
            limits,
            teller: teller.into(),
        }
    }

    pub fn teller(&self) -> &str {
        &self.teller
    }

    /// Validate, persist and audit a new account
    #[instrument(skip_all, fields(teller = %self.teller))]
    pub fn open_account(&self, request: NewAccount) -> LedgerResult<Account> {
        let max = self.limits.max_text_length;
        let holder = AccountHolder::new(
            required_text("Name", &request.name, max)?,
            required_text("Address Line 1", &request.address_line_1, max)?,
            optional_text(&request.address_line_2, max),
            optional_text(&request.address_line_3, max),
            required_text("Town", &request.town, max)?,
        );

        self.check_amount("Opening balance", request.opening_balance, true)?;

        let account = match request.kind {
            AccountKind::Current { overdraft_limit } => {
                self.check_amount("Overdraft amount", overdraft_limit, true)?;
                Account::new_current(holder, request.opening_balance, overdraft_limit)
            }
            AccountKind::Savings { interest_rate } => {
                if !interest_rate.is_finite() || interest_rate < 0.0 {
                    return Err(LedgerError::Validation(
                        "Interest rate must be a non-negative number".into(),
                    ));
                }
                Account::new_savings(holder, request.opening_balance, interest_rate)
            }
        };

        let id = account.id.to_string();
        let name = account.holder.name.clone();

        match self.store.add(account.clone()) {
            Ok(_) => {
                self.record(&id, &name, ACTION_ACCOUNT_CREATION, Outcome::Success);
                info!("account opened");
                Ok(account)
            }
            Err(e) => {
                self.record(&id, &name, ACTION_ACCOUNT_CREATION, Outcome::Failure);
                Err(e)
            }
        }
    }

    /// Look up an account for display
    #[instrument(skip_all, fields(teller = %self.teller))]
    pub fn view_account(&self, account_no: &str) -> LedgerResult<Option<Account>> {
        let account = self.find(account_no, ACTION_ACCOUNT_QUERY)?;
        if let Some(account) = &account {
            self.record(
                account_no.trim(),
                &account.holder.name,
                ACTION_ACCOUNT_QUERY,
                Outcome::Success,
            );
        }
        Ok(account)
    }

    /// All accounts, ordered by holder name
    pub fn list_accounts(&self) -> LedgerResult<Vec<Account>> {
        let accounts = self.store.accounts()?;
        self.record("N/A", "N/A", ACTION_ACCOUNT_LISTING, Outcome::Success);
        Ok(accounts)
    }

    /// Lodge funds into an account
    #[instrument(skip_all, fields(teller = %self.teller))]
    pub fn lodge(&self, account_no: &str, amount: Money, reason: Option<&str>) -> LedgerResult<Outcome> {
        let Some(account) = self.find(account_no, ACTION_LODGEMENT)? else {
            return Ok(Outcome::AccountNotFound);
        };

        self.check_amount("Amount to lodge", amount, false)?;
        let reason = self.check_reason(amount, reason)?;

        let result = self.store.deposit(account.id, amount);
        let outcome = match &result {
            Ok(true) => Outcome::Success,
            Ok(false) | Err(_) => Outcome::Failure,
        };

        self.audit.record(
            &AuditEvent::transaction(
                &self.teller,
                account.id.to_string(),
                &account.holder.name,
                ACTION_LODGEMENT,
                outcome.clone(),
            )
            .with_amount(amount)
            .with_reason(reason),
        );

        result.map(|_| outcome)
    }

    /// Withdraw funds from an account
    #[instrument(skip_all, fields(teller = %self.teller))]
    pub fn withdraw(&self, account_no: &str, amount: Money, reason: Option<&str>) -> LedgerResult<Outcome> {
        let Some(account) = self.find(account_no, ACTION_WITHDRAWAL)? else {
            return Ok(Outcome::AccountNotFound);
        };

        self.check_amount("Amount to withdraw", amount, false)?;
        let reason = self.check_reason(amount, reason)?;

        let result = self.store.withdraw(account.id, amount);
        let outcome = match &result {
            Ok(true) => Outcome::Success,
            Ok(false) => Outcome::InsufficientFunds,
            Err(_) => Outcome::Failure,
        };

        self.audit.record(
            &AuditEvent::transaction(
                &self.teller,
                account.id.to_string(),
                &account.holder.name,
                ACTION_WITHDRAWAL,
                outcome.clone(),
            )
            .with_amount(amount)
            .with_reason(reason),
        );

        result.map(|_| outcome)
    }

    /// Close an account after administrator approval and confirmation
    ///
    /// `approve` returns the approving administrator, or `None` if approval
    /// was not granted. `confirm` is asked only after approval.
    #[instrument(skip_all, fields(teller = %self.teller))]
    pub fn close_account<A, C>(&self, account_no: &str, approve: A, confirm: C) -> LedgerResult<Outcome>
    where
        A: FnOnce(&Account) -> Option<String>,
        C: FnOnce(&Account) -> bool,
    {
        let Some(account) = self.find(account_no, ACTION_ACCOUNT_CLOSURE)? else {
            return Ok(Outcome::AccountNotFound);
        };
        let id = account.id.to_string();
        let name = account.holder.name.as_str();

        let Some(approver) = approve(&account) else {
            self.record(&id, name, ACTION_ACCOUNT_CLOSURE, Outcome::AdminApprovalDenied);
            return Ok(Outcome::AdminApprovalDenied);
        };

        let event = |outcome: Outcome| {
            AuditEvent::transaction(&self.teller, &id, name, ACTION_ACCOUNT_CLOSURE, outcome)
                .with_approver(Some(approver.as_str()))
        };

        if !confirm(&account) {
            self.audit.record(&event(Outcome::CancelledByUser));
            return Ok(Outcome::CancelledByUser);
        }

        let result = self.store.close(account.id);
        let outcome = match &result {
            Ok(true) => Outcome::Success,
            Ok(false) | Err(_) => Outcome::Failure,
        };
        self.audit.record(&event(outcome.clone()));

        result.map(|_| outcome)
    }

    /// Resolve an account number, auditing a miss under `action`
    fn find(&self, account_no: &str, action: &str) -> LedgerResult<Option<Account>> {
        let account_no = account_no.trim();
        let found = match AccountId::parse(account_no) {
            Ok(id) => self.store.find_by_id(id)?,
            Err(_) => None,
        };

        if found.is_none() {
            self.record(account_no, UNKNOWN_HOLDER, action, Outcome::AccountNotFound);
        }
        Ok(found)
    }

    fn record(&self, account_no: &str, holder: &str, action: &str, outcome: Outcome) {
        self.audit.record(&AuditEvent::transaction(
            &self.teller,
            account_no,
            holder,
            action,
            outcome,
        ));
    }

    fn check_amount(&self, field: &str, amount: Money, allow_zero: bool) -> LedgerResult<()> {
        if amount.is_negative() || (!allow_zero && amount.is_zero()) {
            return Err(LedgerError::InvalidAmount(format!(
                "{} must be {}",
                field,
                if allow_zero {
                    "zero or more"
                } else {
                    "greater than zero"
                }
            )));
        }
        if amount > self.limits.max_transaction_amount {
            return Err(LedgerError::InvalidAmount(format!(
                "{} exceeds the allowed limit of {}",
                field, self.limits.max_transaction_amount
            )));
        }
        Ok(())
    }

    fn check_reason(&self, amount: Money, reason: Option<&str>) -> LedgerResult<Option<String>> {
        let max = self.limits.max_text_length;
        if amount > self.limits.reason_threshold {
            let reason = reason.unwrap_or_default();
            return required_text(
                &format!(
                    "Reason (required for amounts over {})",
                    self.limits.reason_threshold
                ),
                reason,
                max,
            )
            .map(Some);
        }

        Ok(reason
            .map(|r| optional_text(r, max))
            .filter(|r| !r.is_empty()))
    }
}

/// Trimmed, non-empty text no longer than `max` characters
pub fn required_text(field: &str, value: &str, max: usize) -> LedgerResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(LedgerError::Validation(format!("{} is required", field)));
    }
    if value.chars().count() > max {
        return Err(LedgerError::Validation(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(value.to_string())
}

/// Trimmed text, truncated to `max` characters
pub fn optional_text(value: &str, max: usize) -> String {
    value.trim().chars().take(max).collect()
}
