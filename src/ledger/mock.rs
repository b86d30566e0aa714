//! In-memory `Ledger` for tests. Reads come from `MockState`; sends are
//! recorded and applied to the state the way the governance contract would
//! apply them, closely enough for the console's purposes.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use super::{Envelope, Ledger, LedgerCall, Receipt};
use crate::amount::Amount;
use crate::collector::out_of_range;
use crate::decode::{hybrid, RawRecord};
use crate::error::{ConsoleError, Result};
use crate::names::ZERO_ADDRESS;

#[derive(Debug, Clone, Default)]
pub struct MockState {
    pub accounts: Vec<String>,
    /// Keyed by lowercased address.
    pub balances: HashMap<String, Amount>,
    pub current_cycle: u64,
    pub cycles: BTreeMap<u64, RawRecord>,
    /// Nominee address and its ballot, in registration order.
    pub nominees: Vec<(String, RawRecord)>,
    /// Ballot id `n` lives at position `n - 1`.
    pub ballots: Vec<RawRecord>,
    /// Withdrawal id `n` lives at position `n - 1`.
    pub withdrawals: Vec<RawRecord>,
    pub governing: HashSet<String>,
    pub block_makers: HashSet<String>,
    pub supports_nominee_count: bool,
    /// Gas reported by every receipt; `None` reports a plain 21000.
    pub gas_used: Option<u64>,
}

impl MockState {
    pub fn set_balance(&mut self, address: &str, amount: Amount) {
        self.balances.insert(address.to_lowercase(), amount);
    }

    pub fn add_cycle(
        &mut self,
        cycle_id: u64,
        status: u8,
        elected: &str,
        evicted: &str,
        total_payments: &str,
    ) {
        self.cycles.insert(
            cycle_id,
            cycle_record(status, elected, evicted, total_payments),
        );
    }

    pub fn add_nominee(&mut self, nominee: &str, cycle_id: u64, promote: bool) {
        self.nominees.push((
            nominee.to_string(),
            nominee_record(nominee, cycle_id, promote),
        ));
    }

    pub fn add_ballot(&mut self, voter: &str, voted_for: &str, amount: &str) {
        self.ballots.push(hybrid([
            ("voter", json!(voter)),
            ("voted_for", json!(voted_for)),
            ("amount", json!(amount)),
            ("governanceCycleId", json!(self.current_cycle.to_string())),
        ]));
    }

    pub fn add_withdrawal(&mut self, status: u8, beneficiary: &str, amount: &str) {
        self.withdrawals
            .push(withdrawal_record(status, beneficiary, amount, 0, 0));
    }

    fn balance_of(&self, address: &str) -> Amount {
        self.balances
            .get(&address.to_lowercase())
            .copied()
            .unwrap_or_default()
    }
}

fn cycle_record(status: u8, elected: &str, evicted: &str, total_payments: &str) -> RawRecord {
    hybrid([
        ("status", json!(status.to_string())),
        ("elected", json!(elected)),
        ("evicted", json!(evicted)),
        ("totalPayments", json!(total_payments)),
        ("electedVotes", json!("0")),
        ("evictionVotes", json!("0")),
    ])
}

fn nominee_record(nominee: &str, cycle_id: u64, promote: bool) -> RawRecord {
    hybrid([
        ("nominee", json!(nominee)),
        ("governanceCycleId", json!(cycle_id.to_string())),
        ("promote", json!(promote)),
        ("votesFor", json!("0")),
        ("votesAgainst", json!("0")),
    ])
}

fn withdrawal_record(
    status: u8,
    beneficiary: &str,
    amount: &str,
    cycle_id: u64,
    ballot_id: u64,
) -> RawRecord {
    hybrid([
        ("status", json!(status.to_string())),
        ("beneficiary", json!(beneficiary)),
        ("amount", json!(amount)),
        ("governanceCycleId", json!(cycle_id.to_string())),
        ("ballotId", json!(ballot_id.to_string())),
    ])
}

#[derive(Debug, Default)]
pub struct MockLedger {
    state: Mutex<MockState>,
    sent: Mutex<Vec<(LedgerCall, Envelope)>>,
    /// Method name to the index (or every index, for `None`) whose read fails
    /// with a transport error.
    failing: Mutex<HashMap<String, Option<u64>>>,
}

impl MockLedger {
    pub fn new(state: MockState) -> Self {
        MockLedger {
            state: Mutex::new(state),
            ..Default::default()
        }
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn sent(&self) -> Vec<(LedgerCall, Envelope)> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn fail_read(&self, method: &str, index: Option<u64>) {
        self.failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(method.to_string(), index);
    }

    fn check(&self, method: &str, index: Option<u64>) -> Result<()> {
        let failing = self.failing.lock().unwrap_or_else(|e| e.into_inner());
        match failing.get(method) {
            Some(None) => Err(ConsoleError::Transport(format!("{}: connection refused", method))),
            Some(Some(at)) if Some(*at) == index => {
                Err(ConsoleError::Transport(format!("{}: connection refused", method)))
            }
            _ => Ok(()),
        }
    }

    fn apply(state: &mut MockState, call: &LedgerCall, from: &str) -> Result<()> {
        let rejected = |reason: &str| ConsoleError::Rejected {
            method: call.method().unwrap_or("transfer").to_string(),
            reason: reason.to_string(),
        };
        let value = call.value();
        if value > Amount::ZERO {
            let from_balance = state.balance_of(from);
            if from_balance < value {
                return Err(rejected("insufficient funds"));
            }
            let remaining = Amount::from_smallest(from_balance.smallest() - value.smallest());
            state.set_balance(from, remaining);
        }

        match call {
            LedgerCall::RegisterGoverning { address } => {
                state.governing.insert(address.to_lowercase());
            }
            LedgerCall::Vote {
                candidate, promote, ..
            } => {
                let cycle = state.current_cycle;
                state
                    .nominees
                    .retain(|(n, _)| !n.eq_ignore_ascii_case(candidate));
                state.add_nominee(candidate, cycle, *promote);
                let stake = value.smallest().to_string();
                state.add_ballot(from, candidate, &stake);
            }
            LedgerCall::NewGovernanceCycle => {
                state.current_cycle += 1;
                let id = state.current_cycle;
                state.add_cycle(id, 1, ZERO_ADDRESS, ZERO_ADDRESS, "0");
            }
            LedgerCall::FinalizeGovernanceCycle => {
                let id = state.current_cycle;
                let record = state
                    .cycles
                    .get_mut(&id)
                    .ok_or_else(|| rejected("no open cycle"))?;
                record.insert("0".into(), json!("2"));
                record.insert("status".into(), json!("2"));
            }
            LedgerCall::StartWithdraw {
                cycle_id,
                ballot_id,
            } => {
                let ballot = state
                    .ballots
                    .get((*ballot_id as usize).wrapping_sub(1))
                    .ok_or_else(|| rejected("unknown ballot"))?;
                let amount = ballot
                    .get("amount")
                    .and_then(Value::as_str)
                    .unwrap_or("0")
                    .to_string();
                state.withdrawals.push(withdrawal_record(
                    1, from, &amount, *cycle_id, *ballot_id,
                ));
            }
            LedgerCall::FinalizeWithdraw { withdrawal_id } => {
                let record = state
                    .withdrawals
                    .get_mut((*withdrawal_id as usize).wrapping_sub(1))
                    .ok_or_else(|| rejected("unknown withdrawal"))?;
                record.insert("0".into(), json!("2"));
                record.insert("status".into(), json!("2"));
            }
            LedgerCall::Transfer { to, amount } => {
                let balance = state.balance_of(to);
                state.set_balance(
                    to,
                    Amount::from_smallest(balance.smallest() + amount.smallest()),
                );
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Ledger for MockLedger {
    async fn accounts(&self) -> Result<Vec<String>> {
        self.check("eth_accounts", None)?;
        Ok(self.state().accounts.clone())
    }

    async fn balance(&self, address: &str) -> Result<Amount> {
        self.check("eth_getBalance", None)?;
        Ok(self.state().balance_of(address))
    }

    async fn current_cycle_id(&self) -> Result<u64> {
        self.check("currentGovernanceCycle", None)?;
        Ok(self.state().current_cycle)
    }

    async fn cycle_record(&self, cycle_id: u64) -> Result<RawRecord> {
        self.check("governanceCycleRecords", Some(cycle_id))?;
        Ok(self
            .state()
            .cycles
            .get(&cycle_id)
            .cloned()
            .unwrap_or_else(|| cycle_record(0, ZERO_ADDRESS, ZERO_ADDRESS, "0")))
    }

    async fn nominee_count(&self) -> Result<u64> {
        self.check("nomineesInCycle", None)?;
        let state = self.state();
        if !state.supports_nominee_count {
            return Err(ConsoleError::Config("interface has no nomineesInCycle".into()));
        }
        Ok(state.nominees.len() as u64)
    }

    fn supports_nominee_count(&self) -> bool {
        self.state().supports_nominee_count
    }

    async fn nominee_ballot_key(&self, index: u64) -> Result<String> {
        self.check("nomineeBallotKeys", Some(index))?;
        self.state()
            .nominees
            .get(index as usize)
            .map(|(address, _)| address.clone())
            .ok_or_else(|| out_of_range("nomineeBallotKeys", index))
    }

    async fn nominee_ballot(&self, nominee: &str) -> Result<RawRecord> {
        self.check("nomineeBallots", None)?;
        Ok(self
            .state()
            .nominees
            .iter()
            .find(|(address, _)| address.eq_ignore_ascii_case(nominee))
            .map(|(_, record)| record.clone())
            .unwrap_or_else(|| nominee_record(ZERO_ADDRESS, 0, false)))
    }

    async fn ballot_index(&self) -> Result<u64> {
        self.check("ballotIndex", None)?;
        Ok(self.state().ballots.len() as u64)
    }

    async fn ballot_record(&self, ballot_id: u64) -> Result<RawRecord> {
        self.check("ballotRecords", Some(ballot_id))?;
        self.state()
            .ballots
            .get((ballot_id as usize).wrapping_sub(1))
            .cloned()
            .ok_or_else(|| out_of_range("ballotRecords", ballot_id))
    }

    async fn withdraw_index(&self) -> Result<u64> {
        self.check("withdrawRecordsIndex", None)?;
        Ok(self.state().withdrawals.len() as u64)
    }

    async fn withdraw_record(&self, withdrawal_id: u64) -> Result<RawRecord> {
        self.check("withdrawRecords", Some(withdrawal_id))?;
        self.state()
            .withdrawals
            .get((withdrawal_id as usize).wrapping_sub(1))
            .cloned()
            .ok_or_else(|| out_of_range("withdrawRecords", withdrawal_id))
    }

    async fn can_govern(&self, address: &str) -> Result<bool> {
        self.check("canGovern", None)?;
        Ok(self.state().governing.contains(&address.to_lowercase()))
    }

    async fn is_block_maker(&self, address: &str) -> Result<bool> {
        self.check("isBlockMaker", None)?;
        Ok(self.state().block_makers.contains(&address.to_lowercase()))
    }

    async fn send(&self, call: &LedgerCall, envelope: &Envelope) -> Result<Receipt> {
        let mut state = self.state();
        Self::apply(&mut state, call, &envelope.from)?;
        let mut sent = self.sent.lock().unwrap_or_else(|e| e.into_inner());
        sent.push((call.clone(), envelope.clone()));
        Ok(Receipt {
            transaction_hash: format!("0x{:064x}", sent.len()),
            block_number: Some(sent.len() as u64),
            gas_used: state.gas_used.unwrap_or(21_000).min(envelope.gas_limit),
            status: Some(true),
        })
    }
}
