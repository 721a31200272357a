//! Storage layer for the teller ledger
//!
//! Accounts live in a SQLite table with every PII column encrypted; small
//! JSON documents (settings, local directory) use atomic file writes.

pub mod file_io;
mod schema;
pub mod store;

pub use file_io::{read_json, write_json_atomic};
pub use store::{AccountStore, LoadReport};
