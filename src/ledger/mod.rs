//! The boundary to the ledger client.
//!
//! ```text
//! workflow / report
//!      │
//!      ▼
//! dyn Ledger ──► JsonRpcLedger (reqwest + contract interface descriptions)
//!            └─► MockLedger    (in memory, tests)
//! ```
//!
//! Record reads return the raw hybrid shape (see `decode`); only scalar reads
//! are typed here. `send` blocks until the transaction is mined and never
//! retries.

pub mod abi;
pub mod mock;
pub mod rpc;

use async_trait::async_trait;
use std::fmt;

use crate::amount::Amount;
use crate::decode::RawRecord;
use crate::error::Result;

pub use mock::MockLedger;
pub use rpc::JsonRpcLedger;

/// Sender and gas parameters shared by every transaction of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub from: String,
    pub gas_price: u64,
    pub gas_limit: u64,
}

/// A state-changing call the console knows how to make.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCall {
    RegisterGoverning {
        address: String,
    },
    Vote {
        candidate: String,
        promote: bool,
        confirm: bool,
        weight: u64,
        stake: Amount,
    },
    NewGovernanceCycle,
    FinalizeGovernanceCycle,
    StartWithdraw {
        cycle_id: u64,
        ballot_id: u64,
    },
    FinalizeWithdraw {
        withdrawal_id: u64,
    },
    /// Plain balance transfer, no contract involved.
    Transfer {
        to: String,
        amount: Amount,
    },
}

impl LedgerCall {
    /// Contract method name, `None` for a plain transfer.
    pub fn method(&self) -> Option<&'static str> {
        match self {
            LedgerCall::RegisterGoverning { .. } => Some("registerGoverning"),
            LedgerCall::Vote { .. } => Some("vote"),
            LedgerCall::NewGovernanceCycle => Some("newGovernanceCycle"),
            LedgerCall::FinalizeGovernanceCycle => Some("finalizeGovernanceCycle"),
            LedgerCall::StartWithdraw { .. } => Some("startWithdraw"),
            LedgerCall::FinalizeWithdraw { .. } => Some("finalizeWithdraw"),
            LedgerCall::Transfer { .. } => None,
        }
    }

    /// Value attached to the transaction.
    pub fn value(&self) -> Amount {
        match self {
            LedgerCall::Vote { stake, .. } => *stake,
            LedgerCall::Transfer { amount, .. } => *amount,
            _ => Amount::ZERO,
        }
    }
}

impl fmt::Display for LedgerCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerCall::RegisterGoverning { address } => {
                write!(f, "registerGoverning({})", address)
            }
            LedgerCall::Vote {
                candidate,
                promote,
                confirm,
                weight,
                stake,
            } => write!(
                f,
                "vote({}, {}, {}, {}) with {}",
                candidate, promote, confirm, weight, stake
            ),
            LedgerCall::NewGovernanceCycle => f.write_str("newGovernanceCycle()"),
            LedgerCall::FinalizeGovernanceCycle => f.write_str("finalizeGovernanceCycle()"),
            LedgerCall::StartWithdraw {
                cycle_id,
                ballot_id,
            } => write!(f, "startWithdraw({}, {})", cycle_id, ballot_id),
            LedgerCall::FinalizeWithdraw { withdrawal_id } => {
                write!(f, "finalizeWithdraw({})", withdrawal_id)
            }
            LedgerCall::Transfer { to, amount } => write!(f, "transfer {} to {}", amount, to),
        }
    }
}

/// What the ledger reports about a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub transaction_hash: String,
    pub block_number: Option<u64>,
    pub gas_used: u64,
    /// Post-Byzantium status flag; older ledgers leave it out.
    pub status: Option<bool>,
}

impl fmt::Display for Receipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "    transactionHash : {}", self.transaction_hash)?;
        match self.block_number {
            Some(block) => writeln!(f, "    blockNumber     : {}", block)?,
            None => writeln!(f, "    blockNumber     : pending")?,
        }
        writeln!(f, "    gasUsed         : {}", self.gas_used)?;
        match self.status {
            Some(status) => write!(f, "    status          : {}", status),
            None => write!(f, "    status          : unreported"),
        }
    }
}

#[async_trait]
pub trait Ledger: Send + Sync {
    /// Accounts the transport can send from; the first one is the local operator.
    async fn accounts(&self) -> Result<Vec<String>>;
    async fn balance(&self, address: &str) -> Result<Amount>;

    async fn current_cycle_id(&self) -> Result<u64>;
    async fn cycle_record(&self, cycle_id: u64) -> Result<RawRecord>;

    /// Not every interface variant exposes this; see `supports_nominee_count`.
    async fn nominee_count(&self) -> Result<u64>;
    fn supports_nominee_count(&self) -> bool;
    /// Nominee address at a 0-based position; rejected past the end.
    async fn nominee_ballot_key(&self, index: u64) -> Result<String>;
    async fn nominee_ballot(&self, nominee: &str) -> Result<RawRecord>;

    /// Number of vote ballots; ids run from 1 to this value.
    async fn ballot_index(&self) -> Result<u64>;
    async fn ballot_record(&self, ballot_id: u64) -> Result<RawRecord>;

    /// Number of withdrawals; ids run from 1 to this value.
    async fn withdraw_index(&self) -> Result<u64>;
    async fn withdraw_record(&self, withdrawal_id: u64) -> Result<RawRecord>;

    async fn can_govern(&self, address: &str) -> Result<bool>;
    async fn is_block_maker(&self, address: &str) -> Result<bool>;

    async fn send(&self, call: &LedgerCall, envelope: &Envelope) -> Result<Receipt>;
}
