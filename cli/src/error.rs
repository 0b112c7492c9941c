use drip_accrual::AccrualError;
use drip_types::AccountId;
use thiserror::Error;

/// Why a single journal entry was refused.
#[derive(Debug, Error)]
pub enum EntryError {
    #[error("caller {caller} does not hold account {account}")]
    NotHolder { caller: AccountId, account: AccountId },

    #[error(transparent)]
    Ledger(#[from] AccrualError),
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("config error: {0}")]
    Config(String),

    #[error("journal error: {0}")]
    Journal(String),

    #[error("entry {index} rejected: {source}")]
    Rejected {
        index: usize,
        #[source]
        source: EntryError,
    },

    #[error("ledger error: {0}")]
    Ledger(#[from] AccrualError),
}
