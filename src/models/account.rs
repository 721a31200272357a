//! Account model
//!
//! A bank account is a holder (PII), a balance and a kind. The kind is a
//! closed sum type so both the persistence encoder and decoder match it
//! exhaustively.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::AccountId;
use super::money::Money;

/// Personally identifiable details of the account holder
///
/// Every field is encrypted independently before it reaches the row store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountHolder {
    pub name: String,
    pub address_line_1: String,
    pub address_line_2: String,
    pub address_line_3: String,
    pub town: String,
}

impl AccountHolder {
    pub fn new(
        name: impl Into<String>,
        address_line_1: impl Into<String>,
        address_line_2: impl Into<String>,
        address_line_3: impl Into<String>,
        town: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            address_line_1: address_line_1.into(),
            address_line_2: address_line_2.into(),
            address_line_3: address_line_3.into(),
            town: town.into(),
        }
    }

    /// The PII fields in column order
    pub fn fields(&self) -> [&str; 5] {
        [
            &self.name,
            &self.address_line_1,
            &self.address_line_2,
            &self.address_line_3,
            &self.town,
        ]
    }

    /// Rebuild a holder from fields in column order
    pub fn from_fields([name, a1, a2, a3, town]: [String; 5]) -> Self {
        Self {
            name,
            address_line_1: a1,
            address_line_2: a2,
            address_line_3: a3,
            town,
        }
    }
}

/// Variant-specific account terms
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AccountKind {
    /// Current account; balance may go down to `-overdraft_limit`
    Current { overdraft_limit: Money },
    /// Savings account; balance never goes negative
    Savings { interest_rate: f64 },
}

impl AccountKind {
    /// Discriminator stored in the `account_type` column
    pub const CURRENT_DISCRIMINATOR: i64 = 1;
    pub const SAVINGS_DISCRIMINATOR: i64 = 2;

    pub fn discriminator(&self) -> i64 {
        match self {
            Self::Current { .. } => Self::CURRENT_DISCRIMINATOR,
            Self::Savings { .. } => Self::SAVINGS_DISCRIMINATOR,
        }
    }

    /// Lowest balance this kind of account may reach
    pub fn balance_floor(&self) -> Money {
        match self {
            // An unrepresentable limit grants no overdraft
            Self::Current { overdraft_limit } => overdraft_limit
                .checked_neg()
                .unwrap_or_else(Money::zero),
            Self::Savings { .. } => Money::zero(),
        }
    }
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Current { .. } => write!(f, "Current Account"),
            Self::Savings { .. } => write!(f, "Savings Account"),
        }
    }
}

/// A bank account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier, also the account number
    pub id: AccountId,

    /// Holder details (PII)
    pub holder: AccountHolder,

    /// Current balance
    pub balance: Money,

    /// Current or savings terms
    pub kind: AccountKind,
}

impl Account {
    /// Create a new current account with a fresh ID
    pub fn new_current(holder: AccountHolder, opening_balance: Money, overdraft_limit: Money) -> Self {
        Self {
            id: AccountId::new(),
            holder,
            balance: opening_balance,
            kind: AccountKind::Current { overdraft_limit },
        }
    }

    /// Create a new savings account with a fresh ID
    pub fn new_savings(holder: AccountHolder, opening_balance: Money, interest_rate: f64) -> Self {
        Self {
            id: AccountId::new(),
            holder,
            balance: opening_balance,
            kind: AccountKind::Savings { interest_rate },
        }
    }

    /// Funds that may still be withdrawn
    pub fn available_funds(&self) -> Money {
        self.balance
            .checked_sub(self.kind.balance_floor())
            .unwrap_or(self.balance)
    }

    /// Balance after a withdrawal, or `None` if the account's floor forbids it
    pub fn balance_after_withdrawal(&self, amount: Money) -> Option<Money> {
        let next = self.balance.checked_sub(amount)?;
        (next >= self.kind.balance_floor()).then_some(next)
    }

    /// Balance after a lodgement, or `None` on overflow
    pub fn balance_after_lodgement(&self, amount: Money) -> Option<Money> {
        self.balance.checked_add(amount)
    }

    /// Validate the account terms
    pub fn validate(&self) -> Result<(), AccountValidationError> {
        if self.holder.name.trim().is_empty() {
            return Err(AccountValidationError::EmptyName);
        }

        if self.holder.town.trim().is_empty() {
            return Err(AccountValidationError::EmptyTown);
        }

        match self.kind {
            AccountKind::Current { overdraft_limit } if overdraft_limit.is_negative() => {
                return Err(AccountValidationError::NegativeOverdraft);
            }
            AccountKind::Savings { interest_rate }
                if !interest_rate.is_finite() || interest_rate < 0.0 =>
            {
                return Err(AccountValidationError::InvalidInterestRate);
            }
            _ => {}
        }

        if self.balance < self.kind.balance_floor() {
            return Err(AccountValidationError::BalanceBelowFloor);
        }

        Ok(())
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.kind)
    }
}

/// Validation errors for accounts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountValidationError {
    EmptyName,
    EmptyTown,
    NegativeOverdraft,
    InvalidInterestRate,
    BalanceBelowFloor,
}

impl fmt::Display for AccountValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "Account holder name cannot be empty"),
            Self::EmptyTown => write!(f, "Town cannot be empty"),
            Self::NegativeOverdraft => write!(f, "Overdraft limit cannot be negative"),
            Self::InvalidInterestRate => {
                write!(f, "Interest rate must be a non-negative number")
            }
            Self::BalanceBelowFloor => {
                write!(f, "Opening balance is below what this account type allows")
            }
        }
    }
}

impl std::error::Error for AccountValidationError {}
