//! Abstract storage traits for the DRIP accrual ledger.
//!
//! Every storage backend (embedded database, in-memory for testing) implements
//! these traits. The ledger depends only on the traits.

pub mod accrual;
pub mod error;

pub use accrual::AccrualStore;
pub use error::StoreError;
