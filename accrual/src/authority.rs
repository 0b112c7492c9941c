//! Issuer authorization.
//!
//! The ledger does no identity verification. The embedding layer supplies a
//! predicate deciding whether a caller holds the privileged issuer role; the
//! ledger consults it before minting, burning or changing speeds.

use drip_types::AccountId;

pub trait IssuerPolicy {
    fn is_issuer(&self, caller: &AccountId) -> bool;
}

impl<F> IssuerPolicy for F
where
    F: Fn(&AccountId) -> bool,
{
    fn is_issuer(&self, caller: &AccountId) -> bool {
        self(caller)
    }
}

/// Exactly one account is the issuer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SingleIssuer(AccountId);

impl SingleIssuer {
    pub fn new(issuer: impl Into<AccountId>) -> Self {
        Self(issuer.into())
    }

    pub fn issuer(&self) -> &AccountId {
        &self.0
    }
}

impl IssuerPolicy for SingleIssuer {
    fn is_issuer(&self, caller: &AccountId) -> bool {
        *caller == self.0
    }
}
