//! Fundamental types for the DRIP accrual ledger.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! account identifiers, timestamps, and the clock abstraction used to sample "now".

pub mod account;
pub mod time;

pub use account::AccountId;
pub use time::{Clock, SystemClock, Timestamp};
