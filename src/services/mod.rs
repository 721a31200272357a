//! Service layer for the teller ledger
//!
//! The service layer provides business logic on top of the storage layer,
//! handling input validation, administrator approval and auditing.

pub mod ledger;
pub mod teller;

pub use ledger::Ledger;
pub use teller::{NewAccount, TellerService};
