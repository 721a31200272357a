//! Teller Ledger - encrypted bank-account ledger for teller workstations
//!
//! This library provides the core functionality for a teller-facing account
//! ledger. Account holder details and balances are encrypted field by field
//! before they reach the local SQLite database, the data key is sealed to
//! the OS user and machine, and every teller action is written to an audit
//! trail.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Custom error types
//! - `crypto`: Field encryption, key derivation and key sealing
//! - `models`: Core data models (accounts, holders, money)
//! - `storage`: Encrypted SQLite account store
//! - `audit`: Audit events and their sinks
//! - `auth`: Teller sign-in and administrator approval
//! - `services`: Business logic layer
//! - `display`: Terminal formatting with PII masking
//! - `cli`: Command handlers for the `teller` binary
//! - `logging`: Diagnostic log setup
//!
//! # Example
//!
//! ```rust,ignore
//! use teller_ledger::config::{LedgerPaths, Settings};
//! use teller_ledger::services::Ledger;
//!
//! let paths = LedgerPaths::new()?;
//! let settings = Settings::load_or_create(&paths)?;
//! let ledger = Ledger::open(paths, settings)?;
//! let accounts = ledger.teller("jbloggs").list_accounts()?;
//! ```

pub mod audit;
pub mod auth;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod display;
pub mod error;
pub mod logging;
pub mod models;
pub mod services;
pub mod storage;

pub use error::{LedgerError, LedgerResult};
