//! Core data models for the teller ledger
//!
//! Accounts, their holders, identifiers and money amounts.

pub mod account;
pub mod ids;
pub mod money;

pub use account::{Account, AccountHolder, AccountKind, AccountValidationError};
pub use ids::AccountId;
pub use money::{Money, MoneyParseError};
