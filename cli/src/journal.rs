//! Operation journals and their replay against an accrual ledger.
//!
//! A journal is a JSON array of timestamped entries:
//!
//! ```json
//! [
//!   { "at": 0, "caller": "issuer", "op": { "set_speed": { "account": "x", "speed": 10 } } },
//!   { "at": 5, "caller": "x", "op": { "transfer": { "from": "x", "to": "y", "amount": 20 } } }
//! ]
//! ```
//!
//! The replay clock jumps to each entry's `at` before the entry is applied.

use drip_accrual::{AccrualHook, AccrualLedger, SingleIssuer, TotalMintingState, UserMintingState};
use drip_types::{AccountId, Clock, Timestamp};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;

use crate::config::CliConfig;
use crate::error::{CliError, EntryError};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Seconds since epoch at which the operation executes.
    pub at: u64,
    pub caller: AccountId,
    pub op: Operation,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Mint { account: AccountId, amount: u128 },
    Burn { account: AccountId, amount: u128 },
    BurnAll { account: AccountId },
    SetSpeed { account: AccountId, speed: u128 },
    IncreaseSpeed { account: AccountId, delta: u128 },
    DecreaseSpeed { account: AccountId, delta: u128 },
    Transfer { from: AccountId, to: AccountId, amount: u128 },
    TransferAll { from: AccountId, to: AccountId },
    Settle { account: AccountId },
    SettleAggregate,
}

/// Clock driven by the journal.
#[derive(Clone, Debug, Default)]
struct ReplayClock(Rc<Cell<u64>>);

impl Clock for ReplayClock {
    fn now(&self) -> Timestamp {
        Timestamp::new(self.0.get())
    }
}

/// An entry the ledger refused.
#[derive(Clone, Debug, Serialize)]
pub struct Rejection {
    pub index: usize,
    pub at: u64,
    pub error: String,
}

/// Final ledger state after a replay.
#[derive(Clone, Debug, Serialize)]
pub struct ReplayReport {
    pub applied: usize,
    pub rejected: Vec<Rejection>,
    pub total: TotalMintingState,
    pub accounts: BTreeMap<AccountId, UserMintingState>,
}

pub fn parse_journal(json: &str) -> Result<Vec<JournalEntry>, CliError> {
    let entries: Vec<JournalEntry> =
        serde_json::from_str(json).map_err(|e| CliError::Journal(e.to_string()))?;
    for (index, pair) in entries.windows(2).enumerate() {
        if pair[1].at < pair[0].at {
            return Err(CliError::Journal(format!(
                "entry {} at {} precedes entry {} at {}",
                index + 1,
                pair[1].at,
                index,
                pair[0].at
            )));
        }
    }
    Ok(entries)
}

pub fn load_journal(path: impl AsRef<Path>) -> Result<Vec<JournalEntry>, CliError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|e| CliError::Journal(format!("{}: {e}", path.display())))?;
    parse_journal(&content)
}

/// Apply every entry to a fresh ledger and report the final state.
pub fn replay<H: AccrualHook>(
    entries: &[JournalEntry],
    config: &CliConfig,
) -> Result<ReplayReport, CliError> {
    let clock = ReplayClock::default();
    let mut ledger: AccrualLedger<H> =
        AccrualLedger::new(clock.clone(), SingleIssuer::new(config.issuer.as_str()));
    let mut applied = 0;
    let mut rejected = Vec::new();

    for (index, entry) in entries.iter().enumerate() {
        clock.0.set(entry.at);
        match apply(&mut ledger, entry) {
            Ok(()) => {
                applied += 1;
                tracing::debug!(index, at = entry.at, "applied entry");
                if config.verify_each_step {
                    ledger.verify_invariants()?;
                }
            }
            Err(source) if config.fail_fast => {
                return Err(CliError::Rejected { index, source });
            }
            Err(e) => {
                tracing::warn!(index, at = entry.at, error = %e, "entry rejected");
                rejected.push(Rejection {
                    index,
                    at: entry.at,
                    error: e.to_string(),
                });
            }
        }
    }

    let mut accounts = BTreeMap::new();
    for account in ledger.accounts() {
        accounts.insert(account.clone(), ledger.user_minting_state(account)?);
    }
    Ok(ReplayReport {
        applied,
        rejected,
        total: ledger.total_minting_state()?,
        accounts,
    })
}

/// Transfers run on behalf of their source account, so the caller must be it.
fn apply<H: AccrualHook>(
    ledger: &mut AccrualLedger<H>,
    entry: &JournalEntry,
) -> Result<(), EntryError> {
    let caller = &entry.caller;
    let result = match &entry.op {
        Operation::Mint { account, amount } => ledger.mint(caller, account, *amount),
        Operation::Burn { account, amount } => ledger.burn(caller, account, *amount),
        Operation::BurnAll { account } => ledger.burn_all(caller, account).map(|_| ()),
        Operation::SetSpeed { account, speed } => ledger.set_minting_speed(caller, account, *speed),
        Operation::IncreaseSpeed { account, delta } => {
            ledger.increase_minting_speed(caller, account, *delta)
        }
        Operation::DecreaseSpeed { account, delta } => {
            ledger.decrease_minting_speed(caller, account, *delta)
        }
        Operation::Transfer { from, to, amount } => {
            require_holder(caller, from)?;
            ledger.transfer_settled(from, to, *amount)
        }
        Operation::TransferAll { from, to } => {
            require_holder(caller, from)?;
            ledger.transfer_all_settled(from, to).map(|_| ())
        }
        Operation::Settle { account } => ledger.settle_account(account).map(|_| ()),
        Operation::SettleAggregate => ledger.settle_aggregate().map(|_| ()),
    };
    result.map_err(EntryError::from)
}

fn require_holder(caller: &AccountId, from: &AccountId) -> Result<(), EntryError> {
    if caller == from {
        Ok(())
    } else {
        Err(EntryError::NotHolder {
            caller: caller.clone(),
            account: from.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drip_accrual::{AccrualError, MintRecord, NoRecord};
    use std::io::Write;

    const JOURNAL: &str = r#"[
        { "at": 0, "caller": "issuer", "op": { "mint": { "account": "x", "amount": 100 } } },
        { "at": 0, "caller": "issuer", "op": { "set_speed": { "account": "x", "speed": 10 } } },
        { "at": 5, "caller": "x", "op": { "transfer": { "from": "x", "to": "y", "amount": 120 } } },
        { "at": 6, "caller": "issuer", "op": { "burn": { "account": "y", "amount": 20 } } },
        { "at": 8, "caller": "issuer", "op": "settle_aggregate" }
    ]"#;

    fn lenient() -> CliConfig {
        CliConfig {
            fail_fast: false,
            verify_each_step: true,
            ..CliConfig::default()
        }
    }

    #[test]
    fn parses_tagged_operations() {
        let entries = parse_journal(JOURNAL).unwrap();
        assert_eq!(entries.len(), 5);
        assert_eq!(
            entries[2].op,
            Operation::Transfer {
                from: AccountId::new("x"),
                to: AccountId::new("y"),
                amount: 120
            }
        );
        assert_eq!(entries[4].op, Operation::SettleAggregate);
    }

    #[test]
    fn rejects_out_of_order_entries() {
        let json = r#"[
            { "at": 5, "caller": "issuer", "op": "settle_aggregate" },
            { "at": 4, "caller": "issuer", "op": "settle_aggregate" }
        ]"#;
        assert!(matches!(parse_journal(json), Err(CliError::Journal(_))));
    }

    #[test]
    fn replay_reports_final_state() {
        let entries = parse_journal(JOURNAL).unwrap();
        let report = replay::<NoRecord>(&entries, &lenient()).unwrap();
        assert_eq!(report.applied, 5);
        assert!(report.rejected.is_empty());

        let x = &report.accounts[&AccountId::new("x")];
        assert_eq!(x.effective_balance, 60);
        let y = &report.accounts[&AccountId::new("y")];
        assert_eq!(y.effective_balance, 100);
        assert_eq!(report.total.effective_supply, 160);
        assert_eq!(report.total.last_settled, Timestamp::new(8));
    }

    #[test]
    fn recording_replay_reports_minted_totals() {
        let entries = parse_journal(JOURNAL).unwrap();
        let report = replay::<MintRecord>(&entries, &lenient()).unwrap();
        assert_eq!(report.accounts[&AccountId::new("x")].effective_minted, 80);
        assert_eq!(report.total.total_minted, 80);
    }

    #[test]
    fn transfers_need_the_source_as_caller() {
        let json = r#"[
            { "at": 0, "caller": "issuer", "op": { "mint": { "account": "x", "amount": 5 } } },
            { "at": 1, "caller": "y", "op": { "transfer_all": { "from": "x", "to": "y" } } }
        ]"#;
        let entries = parse_journal(json).unwrap();
        let report = replay::<NoRecord>(&entries, &lenient()).unwrap();
        assert_eq!(report.applied, 1);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].index, 1);
        assert_eq!(report.rejected[0].error, "caller y does not hold account x");
    }

    #[test]
    fn fail_fast_names_the_holder_mismatch() {
        let json = r#"[
            { "at": 0, "caller": "y", "op": { "transfer": { "from": "x", "to": "y", "amount": 0 } } }
        ]"#;
        let entries = parse_journal(json).unwrap();
        let result = replay::<NoRecord>(&entries, &CliConfig::default());
        assert!(matches!(
            result,
            Err(CliError::Rejected {
                index: 0,
                source: EntryError::NotHolder { .. }
            })
        ));
    }

    #[test]
    fn fail_fast_stops_at_first_rejection() {
        let json = r#"[
            { "at": 0, "caller": "mallory", "op": { "mint": { "account": "m", "amount": 5 } } }
        ]"#;
        let entries = parse_journal(json).unwrap();
        let result = replay::<NoRecord>(&entries, &CliConfig::default());
        assert!(matches!(
            result,
            Err(CliError::Rejected {
                index: 0,
                source: EntryError::Ledger(AccrualError::Unauthorized { .. })
            })
        ));
    }

    #[test]
    fn loads_journal_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(JOURNAL.as_bytes()).unwrap();
        assert_eq!(load_journal(file.path()).unwrap().len(), 5);
        assert!(matches!(
            load_journal("/nonexistent/journal.json"),
            Err(CliError::Journal(_))
        ));
    }
}
