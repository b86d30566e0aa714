//! Read-only checks that decide whether a mutating call would be redundant.
//! Every guard is evaluated before anything is sent.

use crate::amount::Amount;
use crate::decode::{decode, NomineeBallot};
use crate::error::Result;
use crate::ledger::{Ledger, LedgerCall};
use crate::names::{is_zero_address, NameResolver};

/// Balance at or above which the mobile account is not funded again.
pub const FUND_THRESHOLD_UNITS: u64 = 10_000;
/// Flat grant sent when funding, whatever the current balance.
pub const FUND_GRANT_UNITS: u64 = 10_000;
pub const NOMINATION_WEIGHT: u64 = 42;
/// Units staked with a nomination vote: 42 x 42.
pub const NOMINATION_STAKE_UNITS: u64 = 42 * 42;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Proceed(LedgerCall),
    Skip(String),
}

impl Decision {
    pub fn is_skip(&self) -> bool {
        matches!(self, Decision::Skip(_))
    }
}

pub fn register_governing(name: &str, address: &str, already_governing: bool) -> Decision {
    if already_governing {
        Decision::Skip(format!(
            "{} ({}) already has governing privileges, doing nothing",
            name, address
        ))
    } else {
        Decision::Proceed(LedgerCall::RegisterGoverning {
            address: address.to_string(),
        })
    }
}

/// A nomination demotes a current block maker and promotes anyone else.
/// `ballot` is `None` when the candidate has never been nominated.
pub fn nominate(
    candidate: &str,
    current_cycle: u64,
    ballot: Option<&NomineeBallot>,
    is_block_maker: impl FnOnce() -> bool,
) -> Decision {
    if let Some(ballot) = ballot.filter(|b| b.governance_cycle_id == current_cycle) {
        return Decision::Skip(format!(
            "{} already has a ballot in cycle {}, doing nothing",
            ballot.nominee, current_cycle
        ));
    }
    Decision::Proceed(LedgerCall::Vote {
        candidate: candidate.to_string(),
        promote: !is_block_maker(),
        confirm: true,
        weight: NOMINATION_WEIGHT,
        stake: Amount::from_units(NOMINATION_STAKE_UNITS),
    })
}

pub fn fund(recipient: &str, balance: Amount) -> Decision {
    if balance >= Amount::from_units(FUND_THRESHOLD_UNITS) {
        Decision::Skip(format!(
            "{} already has {}, no more than {} is needed at a time",
            recipient, balance, FUND_THRESHOLD_UNITS
        ))
    } else {
        Decision::Proceed(LedgerCall::Transfer {
            to: recipient.to_string(),
            amount: Amount::from_units(FUND_GRANT_UNITS),
        })
    }
}

pub async fn evaluate_register(ledger: &dyn Ledger, name: &str, address: &str) -> Result<Decision> {
    let governing = ledger.can_govern(address).await?;
    Ok(register_governing(name, address, governing))
}

pub async fn evaluate_nominate(
    ledger: &dyn Ledger,
    names: &NameResolver,
    candidate: &str,
) -> Result<Decision> {
    let current_cycle = ledger.current_cycle_id().await?;
    let record = decode(&ledger.nominee_ballot(candidate).await?);
    // an unwritten ballot reads back zeroed, cycle id 0 included
    let ballot = if record.get("nominee").is_some_and(is_zero_address) {
        None
    } else {
        Some(NomineeBallot::from_record(candidate, record, names)?)
    };
    if ballot
        .as_ref()
        .is_some_and(|b| b.governance_cycle_id == current_cycle)
    {
        return Ok(nominate(candidate, current_cycle, ballot.as_ref(), || false));
    }
    // block-maker status only matters once we know a vote will be cast
    let block_maker = ledger.is_block_maker(candidate).await?;
    Ok(nominate(candidate, current_cycle, ballot.as_ref(), || block_maker))
}

pub async fn evaluate_fund(ledger: &dyn Ledger, recipient: &str) -> Result<Decision> {
    let balance = ledger.balance(recipient).await?;
    Ok(fund(recipient, balance))
}
