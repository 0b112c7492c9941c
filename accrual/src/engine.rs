//! Core lazy-accrual ledger.

use crate::authority::IssuerPolicy;
use crate::error::AccrualError;
use crate::event::{EventBus, LedgerEvent};
use crate::hook::{AccrualHook, NoRecord};
use crate::state::{MintingState, TotalMintingState, UserMintingState};
use drip_store::{AccrualStore, StoreError};
use drip_types::{AccountId, Clock, Timestamp};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;

const AGGREGATE_KEY: &[u8] = b"aggregate";

#[derive(Clone, Copy, Debug)]
enum SpeedChange {
    Set(u128),
    Increase(u128),
    Decrease(u128),
}

/// The accrual ledger — settles, mints, burns, transfers and changes speeds.
///
/// Per-account records and the aggregate are owned here and mutated only by
/// the operations below. Every operation samples the clock once, works on
/// copies of the records it touches, and commits them only after every check
/// and checked computation has succeeded, so a failed operation leaves no
/// trace.
///
/// `H` decides what settlement records besides the balance: [`NoRecord`] for
/// the plain ledger, [`MintRecord`](crate::MintRecord) for the recording one.
pub struct AccrualLedger<H: AccrualHook = NoRecord> {
    accounts: HashMap<AccountId, MintingState<H>>,
    aggregate: MintingState<H>,
    clock: Box<dyn Clock>,
    issuer: Box<dyn IssuerPolicy>,
    events: EventBus,
}

impl<H: AccrualHook> AccrualLedger<H> {
    /// Create an empty ledger. The aggregate starts with every field zero.
    pub fn new(clock: impl Clock + 'static, issuer: impl IssuerPolicy + 'static) -> Self {
        Self {
            accounts: HashMap::new(),
            aggregate: MintingState::default(),
            clock: Box::new(clock),
            issuer: Box::new(issuer),
            events: EventBus::new(),
        }
    }

    /// Register a listener for committed mutations.
    pub fn subscribe(&mut self, listener: impl Fn(&LedgerEvent) + Send + Sync + 'static) {
        self.events.subscribe(Box::new(listener));
    }

    /// The instant the next operation would observe.
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    // ── Reads ──────────────────────────────────────────────────────────

    /// Balance including accrual not yet settled. Never mutates state.
    pub fn effective_balance(&self, account: &AccountId) -> Result<u128, AccrualError> {
        let now = self.clock.now();
        match self.accounts.get(account) {
            Some(state) => state.effective(now),
            None => Ok(0),
        }
    }

    /// Total supply including accrual not yet settled. Never mutates state.
    pub fn effective_supply(&self) -> Result<u128, AccrualError> {
        self.aggregate.effective(self.clock.now())
    }

    pub fn minting_speed(&self, account: &AccountId) -> u128 {
        self.accounts.get(account).map_or(0, |s| s.speed)
    }

    pub fn total_minting_speed(&self) -> u128 {
        self.aggregate.speed
    }

    /// Raw stored record for an account, if it has ever been referenced.
    pub fn account_state(&self, account: &AccountId) -> Option<&MintingState<H>> {
        self.accounts.get(account)
    }

    /// Raw stored aggregate record.
    pub fn aggregate_state(&self) -> &MintingState<H> {
        &self.aggregate
    }

    /// Every account the ledger has a record for.
    pub fn accounts(&self) -> impl Iterator<Item = &AccountId> {
        self.accounts.keys()
    }

    /// Stored account fields plus their effective values at the current instant.
    pub fn user_minting_state(&self, account: &AccountId) -> Result<UserMintingState, AccrualError> {
        UserMintingState::capture(&self.account_copy(account), self.clock.now())
    }

    /// Stored aggregate fields plus their effective values at the current instant.
    pub fn total_minting_state(&self) -> Result<TotalMintingState, AccrualError> {
        TotalMintingState::capture(&self.aggregate, self.clock.now())
    }

    /// Check that the aggregate mirrors the accounts at the current instant.
    pub fn verify_invariants(&self) -> Result<(), AccrualError> {
        self.verify_invariants_at(self.clock.now())
    }

    fn verify_invariants_at(&self, now: Timestamp) -> Result<(), AccrualError> {
        let mut balances: u128 = 0;
        let mut speeds: u128 = 0;
        let mut minted: u128 = 0;
        for state in self.accounts.values() {
            balances = balances
                .checked_add(state.effective(now)?)
                .ok_or(AccrualError::Overflow)?;
            speeds = speeds
                .checked_add(state.speed)
                .ok_or(AccrualError::Overflow)?;
            minted = minted
                .checked_add(state.effective_recorded(now)?)
                .ok_or(AccrualError::Overflow)?;
        }

        let supply = self.aggregate.effective(now)?;
        if balances != supply {
            return Err(AccrualError::InvariantViolation(format!(
                "sum of effective balances {balances} != effective supply {supply}"
            )));
        }
        if speeds != self.aggregate.speed {
            return Err(AccrualError::InvariantViolation(format!(
                "sum of minting speeds {speeds} != total minting speed {}",
                self.aggregate.speed
            )));
        }
        let total_minted = self.aggregate.effective_recorded(now)?;
        if minted != total_minted {
            return Err(AccrualError::InvariantViolation(format!(
                "sum of minted totals {minted} != aggregate minted total {total_minted}"
            )));
        }
        Ok(())
    }

    // ── Settlement ─────────────────────────────────────────────────────

    /// Fold an account's pending accrual into its balance.
    ///
    /// Returns the amount folded. Settling twice at the same instant folds
    /// nothing the second time.
    pub fn settle_account(&mut self, account: &AccountId) -> Result<u128, AccrualError> {
        let now = self.clock.now();
        let mut state = self.account_copy(account);
        let accrued = state.settle(now)?;
        self.accounts.insert(account.clone(), state);
        tracing::trace!(account = %account, accrued, "settled account");
        Ok(accrued)
    }

    /// Fold the aggregate's pending accrual into the total supply.
    pub fn settle_aggregate(&mut self) -> Result<u128, AccrualError> {
        let now = self.clock.now();
        let mut aggregate = self.aggregate.clone();
        let accrued = aggregate.settle(now)?;
        self.aggregate = aggregate;
        tracing::trace!(accrued, "settled aggregate");
        Ok(accrued)
    }

    // ── Issuer operations ──────────────────────────────────────────────

    /// Grant `amount` directly to `account`.
    ///
    /// An instantaneous grant does not interact with accrual, so nothing is
    /// settled first.
    pub fn mint(
        &mut self,
        caller: &AccountId,
        account: &AccountId,
        amount: u128,
    ) -> Result<(), AccrualError> {
        self.authorize(caller)?;
        let mut state = self.account_copy(account);
        let mut aggregate = self.aggregate.clone();
        state.amount = state
            .amount
            .checked_add(amount)
            .ok_or(AccrualError::Overflow)?;
        aggregate.amount = aggregate
            .amount
            .checked_add(amount)
            .ok_or(AccrualError::Overflow)?;

        self.accounts.insert(account.clone(), state);
        self.aggregate = aggregate;
        tracing::debug!(account = %account, amount, "minted");
        self.events.emit(&LedgerEvent::Minted {
            account: account.clone(),
            amount,
        });
        Ok(())
    }

    /// Destroy `amount` of `account`'s effective balance.
    pub fn burn(
        &mut self,
        caller: &AccountId,
        account: &AccountId,
        amount: u128,
    ) -> Result<(), AccrualError> {
        self.authorize(caller)?;
        let now = self.clock.now();
        self.burn_at(account, amount, now)
    }

    /// Burn the whole effective balance of `account`; returns the amount burned.
    pub fn burn_all(&mut self, caller: &AccountId, account: &AccountId) -> Result<u128, AccrualError> {
        self.authorize(caller)?;
        let now = self.clock.now();
        let amount = self.account_copy(account).effective(now)?;
        self.burn_at(account, amount, now)?;
        Ok(amount)
    }

    fn burn_at(&mut self, account: &AccountId, amount: u128, now: Timestamp) -> Result<(), AccrualError> {
        let mut state = self.account_copy(account);
        let available = state.effective(now)?;
        if amount > available {
            return Err(AccrualError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        // Settling only adds, so it is needed only when the stored value is short.
        if amount > state.amount {
            state.settle(now)?;
        }
        state.amount = state
            .amount
            .checked_sub(amount)
            .ok_or(AccrualError::Overflow)?;

        let mut aggregate = self.aggregate.clone();
        if amount > aggregate.amount {
            aggregate.settle(now)?;
        }
        aggregate.amount = aggregate
            .amount
            .checked_sub(amount)
            .ok_or(AccrualError::Overflow)?;

        self.accounts.insert(account.clone(), state);
        self.aggregate = aggregate;
        tracing::debug!(account = %account, amount, "burned");
        self.events.emit(&LedgerEvent::Burned {
            account: account.clone(),
            amount,
        });
        Ok(())
    }

    /// Replace an account's minting speed.
    ///
    /// Accrual up to now is folded at the old speed before the switch.
    pub fn set_minting_speed(
        &mut self,
        caller: &AccountId,
        account: &AccountId,
        new_speed: u128,
    ) -> Result<(), AccrualError> {
        self.change_speed(caller, account, SpeedChange::Set(new_speed))
    }

    pub fn increase_minting_speed(
        &mut self,
        caller: &AccountId,
        account: &AccountId,
        delta: u128,
    ) -> Result<(), AccrualError> {
        self.change_speed(caller, account, SpeedChange::Increase(delta))
    }

    /// Fails with `InsufficientSpeed` if `delta` exceeds the account's speed.
    pub fn decrease_minting_speed(
        &mut self,
        caller: &AccountId,
        account: &AccountId,
        delta: u128,
    ) -> Result<(), AccrualError> {
        self.change_speed(caller, account, SpeedChange::Decrease(delta))
    }

    fn change_speed(
        &mut self,
        caller: &AccountId,
        account: &AccountId,
        change: SpeedChange,
    ) -> Result<(), AccrualError> {
        self.authorize(caller)?;
        let now = self.clock.now();
        let mut state = self.account_copy(account);
        let old_speed = state.speed;
        let new_speed = match change {
            SpeedChange::Set(speed) => speed,
            SpeedChange::Increase(delta) => old_speed
                .checked_add(delta)
                .ok_or(AccrualError::Overflow)?,
            SpeedChange::Decrease(delta) => {
                old_speed
                    .checked_sub(delta)
                    .ok_or(AccrualError::InsufficientSpeed {
                        needed: delta,
                        available: old_speed,
                    })?
            }
        };

        state.settle(now)?;
        state.speed = new_speed;

        let mut aggregate = self.aggregate.clone();
        aggregate.settle(now)?;
        // Subtract then add: the aggregate holds at least `old_speed`.
        aggregate.speed = aggregate
            .speed
            .checked_sub(old_speed)
            .and_then(|s| s.checked_add(new_speed))
            .ok_or(AccrualError::Overflow)?;

        self.accounts.insert(account.clone(), state);
        self.aggregate = aggregate;
        tracing::debug!(account = %account, old_speed, new_speed, "minting speed changed");
        self.events.emit(&LedgerEvent::SpeedChanged {
            account: account.clone(),
            old_speed,
            new_speed,
        });
        Ok(())
    }

    // ── Transfers ──────────────────────────────────────────────────────

    /// Move `amount` of `from`'s effective balance to `to`.
    ///
    /// `from` is settled only when its stored balance cannot cover `amount`.
    /// The aggregate is untouched.
    pub fn transfer_settled(
        &mut self,
        from: &AccountId,
        to: &AccountId,
        amount: u128,
    ) -> Result<(), AccrualError> {
        let now = self.clock.now();
        let mut source = self.account_copy(from);
        let available = source.effective(now)?;
        if amount > available {
            return Err(AccrualError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        if amount > source.amount {
            source.settle(now)?;
        }
        source.amount = source
            .amount
            .checked_sub(amount)
            .ok_or(AccrualError::Overflow)?;
        self.credit_and_commit(from, source, to, amount)
    }

    /// Settle `from` and move its entire balance to `to`; returns the amount moved.
    pub fn transfer_all_settled(&mut self, from: &AccountId, to: &AccountId) -> Result<u128, AccrualError> {
        let now = self.clock.now();
        let mut source = self.account_copy(from);
        source.settle(now)?;
        let amount = source.amount;
        source.amount = 0;
        self.credit_and_commit(from, source, to, amount)?;
        Ok(amount)
    }

    /// Credit `to` with `amount` already debited from `source`, then commit both.
    fn credit_and_commit(
        &mut self,
        from: &AccountId,
        mut source: MintingState<H>,
        to: &AccountId,
        amount: u128,
    ) -> Result<(), AccrualError> {
        if from == to {
            source.amount = source
                .amount
                .checked_add(amount)
                .ok_or(AccrualError::Overflow)?;
            self.accounts.insert(from.clone(), source);
        } else {
            let mut dest = self.account_copy(to);
            dest.amount = dest
                .amount
                .checked_add(amount)
                .ok_or(AccrualError::Overflow)?;
            self.accounts.insert(from.clone(), source);
            self.accounts.insert(to.clone(), dest);
        }
        tracing::debug!(from = %from, to = %to, amount, "transferred");
        self.events.emit(&LedgerEvent::Transferred {
            from: from.clone(),
            to: to.clone(),
            amount,
        });
        Ok(())
    }

    // ── Helpers ────────────────────────────────────────────────────────

    fn authorize(&self, caller: &AccountId) -> Result<(), AccrualError> {
        if self.issuer.is_issuer(caller) {
            Ok(())
        } else {
            tracing::warn!(caller = %caller, "rejected privileged call");
            Err(AccrualError::Unauthorized {
                caller: caller.clone(),
            })
        }
    }

    /// Working copy of an account record; unreferenced accounts start zeroed.
    fn account_copy(&self, account: &AccountId) -> MintingState<H> {
        self.accounts.get(account).cloned().unwrap_or_default()
    }
}

impl<H> AccrualLedger<H>
where
    H: AccrualHook + Serialize + DeserializeOwned,
{
    /// Persist every account record and the aggregate to a store.
    pub fn save_to_store(&self, store: &dyn AccrualStore) -> Result<(), AccrualError> {
        let aggregate = bincode::serialize(&self.aggregate)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        store.put_meta(AGGREGATE_KEY, &aggregate)?;

        for (account, state) in &self.accounts {
            let bytes =
                bincode::serialize(state).map_err(|e| StoreError::Serialization(e.to_string()))?;
            store.put_account_state(account, &bytes)?;
        }
        tracing::debug!(accounts = self.accounts.len(), "saved ledger to store");
        Ok(())
    }

    /// Restore a ledger from a store.
    ///
    /// The restored records are checked against each other at the latest
    /// settlement instant found in them; a store whose aggregate does not
    /// mirror its accounts is rejected with `InvariantViolation`.
    pub fn load_from_store(
        store: &dyn AccrualStore,
        clock: impl Clock + 'static,
        issuer: impl IssuerPolicy + 'static,
    ) -> Result<Self, AccrualError> {
        let mut ledger = Self::new(clock, issuer);
        if let Some(bytes) = store.get_meta(AGGREGATE_KEY)? {
            ledger.aggregate = bincode::deserialize(&bytes)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
        }
        for (account, bytes) in store.iter_account_states()? {
            let state: MintingState<H> = bincode::deserialize(&bytes)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            ledger.accounts.insert(account, state);
        }

        let latest = ledger
            .accounts
            .values()
            .map(|s| s.last_settled)
            .chain(std::iter::once(ledger.aggregate.last_settled))
            .max()
            .unwrap_or(Timestamp::EPOCH);
        ledger.verify_invariants_at(latest)?;
        tracing::debug!(accounts = ledger.accounts.len(), "loaded ledger from store");
        Ok(ledger)
    }
}
