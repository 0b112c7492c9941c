//! Accrual ledger errors.

use drip_types::{AccountId, Timestamp};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AccrualError {
    #[error("caller {caller} is not the privileged issuer")]
    Unauthorized { caller: AccountId },

    #[error("insufficient balance: need {needed}, available {available}")]
    InsufficientBalance { needed: u128, available: u128 },

    #[error("insufficient minting speed: need {needed}, available {available}")]
    InsufficientSpeed { needed: u128, available: u128 },

    #[error("arithmetic overflow in accrual computation")]
    Overflow,

    #[error("clock moved backwards: last settled at {last_settled}, now {now}")]
    ClockRegression { last_settled: Timestamp, now: Timestamp },

    #[error("ledger invariant violated: {0}")]
    InvariantViolation(String),

    #[error("store error: {0}")]
    Store(#[from] drip_store::StoreError),
}
