//! Shared utilities for the DRIP accrual ledger.

pub mod logging;
pub mod time;

pub use logging::{init_logging, LogFormat};
pub use time::format_duration;
