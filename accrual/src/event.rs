//! Events emitted after ledger mutations commit.

use drip_types::AccountId;
use serde::{Deserialize, Serialize};

/// Ledger-level events that observers can subscribe to via the [`EventBus`].
///
/// Emitted only after the mutation has been applied; rejected operations emit
/// nothing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    /// The issuer granted `amount` directly to `account`.
    Minted { account: AccountId, amount: u128 },
    /// The issuer destroyed `amount` from `account`.
    Burned { account: AccountId, amount: u128 },
    /// `amount` moved between two accounts.
    Transferred {
        from: AccountId,
        to: AccountId,
        amount: u128,
    },
    /// An account's minting speed changed.
    SpeedChanged {
        account: AccountId,
        old_speed: u128,
        new_speed: u128,
    },
}

/// Synchronous fan-out event bus for ledger events.
///
/// Listeners are invoked inline on the mutating call; keep handlers fast.
pub struct EventBus {
    listeners: Vec<Box<dyn Fn(&LedgerEvent) + Send + Sync>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: Box<dyn Fn(&LedgerEvent) + Send + Sync>) {
        self.listeners.push(listener);
    }

    pub fn emit(&self, event: &LedgerEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn every_listener_sees_every_event() {
        let mut bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for _ in 0..2 {
            let seen = Arc::clone(&seen);
            bus.subscribe(Box::new(move |e| seen.lock().unwrap().push(e.clone())));
        }

        bus.emit(&LedgerEvent::Burned {
            account: AccountId::new("x"),
            amount: 3,
        });
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn emit_without_listeners_is_fine() {
        EventBus::default().emit(&LedgerEvent::Minted {
            account: AccountId::new("x"),
            amount: 1,
        });
    }
}
