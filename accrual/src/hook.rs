//! Accrual hooks: what else happens when settlement folds accrued units.
//!
//! Each scope (every account and the aggregate) carries one hook record. The
//! settlement step calls [`AccrualHook::on_accrual`] with the exact amount it
//! just folded into the stored value, so a recording hook can never drift from
//! the balances it shadows.

use crate::error::AccrualError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub trait AccrualHook: Clone + Default + fmt::Debug {
    /// Whether this hook keeps a cumulative minted counter.
    const RECORDING: bool = false;

    /// Called once per settlement that folds a positive `accrued` amount.
    fn on_accrual(&mut self, accrued: u128) -> Result<(), AccrualError>;

    /// Cumulative units recorded so far (stored, not including pending accrual).
    fn recorded(&self) -> u128 {
        0
    }
}

/// Plain ledger: settlement records nothing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoRecord;

impl AccrualHook for NoRecord {
    fn on_accrual(&mut self, _accrued: u128) -> Result<(), AccrualError> {
        Ok(())
    }
}

/// Recording ledger: accumulates every folded accrual into `total_minted`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintRecord {
    /// Cumulative accrued units ever folded into this scope (never decreases).
    pub total_minted: u128,
}

impl AccrualHook for MintRecord {
    const RECORDING: bool = true;

    fn on_accrual(&mut self, accrued: u128) -> Result<(), AccrualError> {
        self.total_minted = self
            .total_minted
            .checked_add(accrued)
            .ok_or(AccrualError::Overflow)?;
        Ok(())
    }

    fn recorded(&self) -> u128 {
        self.total_minted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_record_records_nothing() {
        let mut hook = NoRecord;
        hook.on_accrual(500).unwrap();
        assert_eq!(hook.recorded(), 0);
        assert!(!NoRecord::RECORDING);
    }

    #[test]
    fn mint_record_accumulates() {
        let mut hook = MintRecord::default();
        hook.on_accrual(30).unwrap();
        hook.on_accrual(12).unwrap();
        assert_eq!(hook.recorded(), 42);
        assert!(MintRecord::RECORDING);
    }

    #[test]
    fn mint_record_overflow_is_an_error() {
        let mut hook = MintRecord {
            total_minted: u128::MAX,
        };
        assert!(matches!(hook.on_accrual(1), Err(AccrualError::Overflow)));
        assert_eq!(hook.total_minted, u128::MAX);
    }
}
