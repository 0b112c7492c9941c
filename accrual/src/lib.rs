//! Lazy-accrual ledger engine.
//!
//! Every account grows at its own constant speed until an operation touches
//! it; at that point the accrued amount is folded into the stored balance and
//! the account's clock resets.
//! `effective(a, t) = balance(a) + minting_speed(a) × (t − last_settled(a))`
//!
//! The aggregate mirrors the same shape, so the sum of every account's
//! effective balance always equals the effective total supply.
//!
//! This crate handles:
//! - Settlement of accounts and the aggregate
//! - Issuer-only minting, burning and speed changes
//! - Settled transfers between accounts
//! - Recording cumulative minted amounts (the recording variant)
//! - Persisting and restoring ledger state through an `AccrualStore`

pub mod authority;
pub mod engine;
pub mod error;
pub mod event;
pub mod hook;
pub mod recording;
pub mod state;

pub use authority::{IssuerPolicy, SingleIssuer};
pub use engine::AccrualLedger;
pub use error::AccrualError;
pub use event::{EventBus, LedgerEvent};
pub use hook::{AccrualHook, MintRecord, NoRecord};
pub use recording::RecordingAccrualLedger;
pub use state::{MintingState, TotalMintingState, UserMintingState};
