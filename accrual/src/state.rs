//! Per-scope accrual state and audit snapshots.

use crate::error::AccrualError;
use crate::hook::{AccrualHook, NoRecord};
use drip_types::Timestamp;
use serde::{Deserialize, Serialize};

/// Accrual state for one scope.
///
/// Accounts and the aggregate share this shape: for an account `amount` is
/// its balance and `speed` its minting speed; for the aggregate they are the
/// total supply and total minting speed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintingState<H = NoRecord> {
    /// Last-settled stored value.
    pub amount: u128,
    /// Raw units accrued per second.
    pub speed: u128,
    /// When accrual was last folded into `amount`.
    pub last_settled: Timestamp,
    /// Hook record updated on every settlement.
    pub record: H,
}

impl<H: AccrualHook> MintingState<H> {
    /// Units accrued since `last_settled` but not yet folded into `amount`.
    pub fn pending(&self, now: Timestamp) -> Result<u128, AccrualError> {
        let elapsed = self
            .last_settled
            .checked_elapsed(now)
            .ok_or(AccrualError::ClockRegression {
                last_settled: self.last_settled,
                now,
            })?;
        self.speed
            .checked_mul(u128::from(elapsed))
            .ok_or(AccrualError::Overflow)
    }

    /// The stored amount plus pending accrual, without mutating anything.
    pub fn effective(&self, now: Timestamp) -> Result<u128, AccrualError> {
        self.amount
            .checked_add(self.pending(now)?)
            .ok_or(AccrualError::Overflow)
    }

    /// Recorded minted total plus pending accrual. Zero for non-recording hooks.
    pub fn effective_recorded(&self, now: Timestamp) -> Result<u128, AccrualError> {
        if !H::RECORDING {
            return Ok(0);
        }
        self.record
            .recorded()
            .checked_add(self.pending(now)?)
            .ok_or(AccrualError::Overflow)
    }

    /// Fold pending accrual into `amount` and reset the accrual clock.
    ///
    /// Returns the folded amount. On error the state may be partially
    /// updated; callers settle a copy and commit only on success.
    pub fn settle(&mut self, now: Timestamp) -> Result<u128, AccrualError> {
        let accrued = self.pending(now)?;
        if accrued > 0 {
            self.amount = self
                .amount
                .checked_add(accrued)
                .ok_or(AccrualError::Overflow)?;
            self.record.on_accrual(accrued)?;
        }
        if self.last_settled != now {
            self.last_settled = now;
        }
        Ok(accrued)
    }
}

/// Audit dump of one account: stored fields plus derived effective values.
///
/// `balance`, `minting_speed`, `last_settled` and `total_minted` are the raw
/// stored values and may be stale; use the `effective_*` fields for the
/// current view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMintingState {
    pub balance: u128,
    pub minting_speed: u128,
    pub last_settled: Timestamp,
    pub total_minted: u128,
    pub effective_balance: u128,
    pub effective_minted: u128,
}

/// Audit dump of the aggregate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalMintingState {
    pub total_supply: u128,
    pub total_minting_speed: u128,
    pub last_settled: Timestamp,
    pub total_minted: u128,
    pub effective_supply: u128,
    pub effective_minted: u128,
}

impl UserMintingState {
    pub(crate) fn capture<H: AccrualHook>(
        state: &MintingState<H>,
        now: Timestamp,
    ) -> Result<Self, AccrualError> {
        Ok(Self {
            balance: state.amount,
            minting_speed: state.speed,
            last_settled: state.last_settled,
            total_minted: state.record.recorded(),
            effective_balance: state.effective(now)?,
            effective_minted: state.effective_recorded(now)?,
        })
    }
}

impl TotalMintingState {
    pub(crate) fn capture<H: AccrualHook>(
        state: &MintingState<H>,
        now: Timestamp,
    ) -> Result<Self, AccrualError> {
        Ok(Self {
            total_supply: state.amount,
            total_minting_speed: state.speed,
            last_settled: state.last_settled,
            total_minted: state.record.recorded(),
            effective_supply: state.effective(now)?,
            effective_minted: state.effective_recorded(now)?,
        })
    }
}
