//! The recording variant: an accrual ledger that also tracks minted totals.
//!
//! Nothing here re-implements settlement. The ledger is the same
//! [`AccrualLedger`] with [`MintRecord`] plugged in as its accrual hook, so
//! every settlement that folds accrued units into a balance adds the same
//! amount to that scope's `total_minted`.

use crate::engine::AccrualLedger;
use crate::error::AccrualError;
use crate::hook::MintRecord;
use drip_types::AccountId;

pub type RecordingAccrualLedger = AccrualLedger<MintRecord>;

impl AccrualLedger<MintRecord> {
    /// Units ever accrued by `account`, including accrual not yet settled.
    pub fn cumulative_minted(&self, account: &AccountId) -> Result<u128, AccrualError> {
        let now = self.now();
        match self.account_state(account) {
            Some(state) => state.effective_recorded(now),
            None => Ok(0),
        }
    }

    /// Units ever accrued across all accounts, including accrual not yet settled.
    pub fn cumulative_minted_total(&self) -> Result<u128, AccrualError> {
        self.aggregate_state().effective_recorded(self.now())
    }
}
