//! Nullable store — thread-safe in-memory storage for testing.

use drip_store::{AccrualStore, StoreError};
use drip_types::AccountId;
use std::collections::HashMap;
use std::sync::Mutex;

/// An in-memory accrual store for testing.
#[derive(Debug, Default)]
pub struct NullAccrualStore {
    accounts: Mutex<HashMap<AccountId, Vec<u8>>>,
    meta: Mutex<HashMap<Vec<u8>, Vec<u8>>>,
}

impl NullAccrualStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Backend("lock poisoned".into())
}

impl AccrualStore for NullAccrualStore {
    fn put_account_state(&self, account: &AccountId, state: &[u8]) -> Result<(), StoreError> {
        self.accounts
            .lock()
            .map_err(poisoned)?
            .insert(account.clone(), state.to_vec());
        Ok(())
    }

    fn iter_account_states(&self) -> Result<Vec<(AccountId, Vec<u8>)>, StoreError> {
        Ok(self
            .accounts
            .lock()
            .map_err(poisoned)?
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn get_meta(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.meta.lock().map_err(poisoned)?.get(key).cloned())
    }

    fn put_meta(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.meta
            .lock()
            .map_err(poisoned)?
            .insert(key.to_vec(), value.to_vec());
        Ok(())
    }
}
