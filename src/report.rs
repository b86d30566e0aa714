//! Reads the governance contract's state and lays it out for the operator.

use prettytable::{Cell, Row, Table};
use std::fmt::Write;

use crate::amount::Amount;
use crate::collector::{self, Bound, Collected, Termination};
use crate::config::ConsoleConfig;
use crate::decode::{decode, CycleRecord, NomineeBallot, Record, VoteBallot, WithdrawalRecord};
use crate::error::Result;
use crate::names::{LOCAL_ACCT, MOBILE_ACCT};
use crate::session::Session;

const RULE: &str = "\n---------------------------------------------\n";

/// Which governance cycles a report includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CycleListing {
    #[default]
    Current,
    /// Every cycle from the current one down to zero.
    All,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub current_cycle_id: u64,
    /// Newest first.
    pub cycles: Vec<CycleRecord>,
    pub nominee_ballots: Collected<NomineeBallot>,
    pub vote_ballots: Vec<VoteBallot>,
    pub withdrawals: Vec<WithdrawalRecord>,
    pub mobile_balance: Amount,
}

pub async fn build_report(session: &Session, listing: CycleListing) -> Result<Report> {
    let ledger = session.ledger.as_ref();
    let names = &session.names;

    let current_cycle_id = ledger.current_cycle_id().await?;
    let cycle_ids: Vec<u64> = match listing {
        CycleListing::Current => vec![current_cycle_id],
        CycleListing::All => (0..=current_cycle_id).rev().collect(),
    };
    let mut cycles = Vec::with_capacity(cycle_ids.len());
    for cycle_id in cycle_ids {
        let raw = ledger.cycle_record(cycle_id).await?;
        cycles.push(CycleRecord::from_record(cycle_id, &decode(&raw), names)?);
    }

    let nominee_ballots = collector::collect(0, session.nominee_bound().await?, |index| async move {
        let nominee = ledger.nominee_ballot_key(index).await?;
        let raw = ledger.nominee_ballot(&nominee).await?;
        NomineeBallot::from_record(&nominee, decode(&raw), names)
    })
    .await?;

    let ballot_count = ledger.ballot_index().await?;
    let vote_ballots = collector::collect(1, Bound::Count(ballot_count), |ballot_id| async move {
        let raw = ledger.ballot_record(ballot_id).await?;
        VoteBallot::from_record(ballot_id, decode(&raw), names)
    })
    .await?
    .items;

    let withdrawal_count = ledger.withdraw_index().await?;
    let withdrawals = collector::collect(
        1,
        Bound::Count(withdrawal_count),
        |withdrawal_id| async move {
            let raw = ledger.withdraw_record(withdrawal_id).await?;
            WithdrawalRecord::from_record(withdrawal_id, decode(&raw), names)
        },
    )
    .await?
    .items;

    let mobile_balance = ledger.balance(session.mobile_acct()).await?;

    log::info!(
        "report for cycle {}: {} cycles, {} nominee ballots, {} vote ballots, {} withdrawals",
        current_cycle_id,
        cycles.len(),
        nominee_ballots.items.len(),
        vote_ballots.len(),
        withdrawals.len()
    );
    Ok(Report {
        current_cycle_id,
        cycles,
        nominee_ballots,
        vote_ballots,
        withdrawals,
        mobile_balance,
    })
}

fn table<S: AsRef<str>>(titles: &[S], rows: Vec<Vec<String>>) -> Table {
    let mut table = Table::new();
    table.set_titles(Row::new(titles.iter().map(|t| Cell::new(t.as_ref())).collect()));
    for row in rows {
        table.add_row(Row::new(row.iter().map(|c| Cell::new(c)).collect()));
    }
    table
}

/// Untyped columns are whatever named fields the first entry carries.
fn extra_columns(first: Option<&Record>) -> Vec<String> {
    first
        .map(|fields| fields.iter().map(|(name, _)| name.to_string()).collect())
        .unwrap_or_default()
}

fn titles(fixed: &[&str], extra: &[String]) -> Vec<String> {
    fixed
        .iter()
        .map(|t| t.to_string())
        .chain(extra.iter().cloned())
        .collect()
}

fn row<const N: usize>(fixed: [String; N], extra: &[String], fields: &Record) -> Vec<String> {
    let mut row = fixed.to_vec();
    row.extend(
        extra
            .iter()
            .map(|name| fields.get(name).unwrap_or_default().to_string()),
    );
    row
}

impl Report {
    pub fn cycle_table(&self) -> Table {
        table(
            &[
                "cycleId",
                "status",
                "elected",
                "evicted",
                "totalPayments",
                "electedVotes",
                "evictionVotes",
            ],
            self.cycles
                .iter()
                .map(|c| {
                    vec![
                        c.cycle_id.to_string(),
                        c.status.to_string(),
                        c.elected.label(),
                        c.evicted.label(),
                        c.total_payments.to_string(),
                        c.elected_votes.to_string(),
                        c.eviction_votes.to_string(),
                    ]
                })
                .collect(),
        )
    }

    pub fn nominee_table(&self) -> Table {
        let ballots = &self.nominee_ballots.items;
        let extra = extra_columns(ballots.first().map(|b| &b.fields));
        table(
            titles(&["Nominee", "governanceCycleId"], &extra).as_slice(),
            ballots
                .iter()
                .map(|b| {
                    let fixed = [b.nominee.label(), b.governance_cycle_id.to_string()];
                    row(fixed, &extra, &b.fields)
                })
                .collect(),
        )
    }

    pub fn vote_table(&self) -> Table {
        let extra = extra_columns(self.vote_ballots.first().map(|b| &b.fields));
        table(
            titles(&["Ballot ID", "voter", "voted_for", "amount"], &extra).as_slice(),
            self.vote_ballots
                .iter()
                .map(|b| {
                    let fixed = [
                        b.ballot_id.to_string(),
                        b.voter.label(),
                        b.voted_for.label(),
                        b.amount.to_string(),
                    ];
                    row(fixed, &extra, &b.fields)
                })
                .collect(),
        )
    }

    pub fn withdrawal_table(&self) -> Table {
        let extra = extra_columns(self.withdrawals.first().map(|w| &w.fields));
        table(
            titles(&["withdrawalId", "status", "beneficiary", "amount"], &extra).as_slice(),
            self.withdrawals
                .iter()
                .map(|w| {
                    let fixed = [
                        w.withdrawal_id.to_string(),
                        w.status.to_string(),
                        w.beneficiary.label(),
                        w.amount.to_string(),
                    ];
                    row(fixed, &extra, &w.fields)
                })
                .collect(),
        )
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(RULE);
        let _ = writeln!(
            out,
            "\n  ==> Cycle {}, {} balance : {}\n",
            self.current_cycle_id, MOBILE_ACCT, self.mobile_balance
        );
        out.push_str(&self.cycle_table().to_string());

        if self.nominee_ballots.items.is_empty() {
            out.push_str("\n  ==> No nominee ballots made yet\n");
        } else {
            out.push_str("\n  ==> NOMINEE BALLOTS\n\n");
            out.push_str(&self.nominee_table().to_string());
        }
        if let Termination::Ambiguous { index, reason } = &self.nominee_ballots.termination {
            let _ = writeln!(
                out,
                "\n  !! nominee listing stopped at key {} on a read failure, it may be incomplete: {}",
                index, reason
            );
        }

        if self.vote_ballots.is_empty() {
            out.push_str("\n  ==> No vote ballots made yet\n");
        } else {
            out.push_str("\n  ==> VOTE BALLOTS\n\n");
            out.push_str(&self.vote_table().to_string());
        }

        if self.withdrawals.is_empty() {
            out.push_str("\n  ==> No withdrawals made yet\n");
        } else {
            out.push_str("\n  ==> All past withdrawals\n\n");
            out.push_str(&self.withdrawal_table().to_string());
        }
        out.push_str(RULE);
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BalanceRow {
    pub account: String,
    pub address: String,
    pub balance: Amount,
}

pub async fn balances(session: &Session) -> Result<Vec<BalanceRow>> {
    let ledger = session.ledger.as_ref();
    let accounts = [
        ("Weyl Contract", session.config.weyl_addr.as_str()),
        (LOCAL_ACCT, session.local_acct.as_str()),
        (MOBILE_ACCT, session.mobile_acct()),
    ];
    let mut rows = Vec::with_capacity(accounts.len());
    for (account, address) in accounts {
        rows.push(BalanceRow {
            account: account.to_string(),
            address: address.to_string(),
            balance: ledger.balance(address).await?,
        });
    }
    Ok(rows)
}

pub fn render_balances(rows: &[BalanceRow]) -> String {
    let body = table(
        &["Account", "Address", "Balance"],
        rows.iter()
            .map(|r| vec![r.account.clone(), r.address.clone(), r.balance.to_string()])
            .collect(),
    );
    format!("{}{}{}", RULE, body, RULE)
}

/// Full addresses, which every other view truncates.
pub fn render_addresses(session: &Session) -> String {
    let body = table(
        &["Name", "Address"],
        vec![
            vec![LOCAL_ACCT.to_string(), session.local_acct.clone()],
            vec![MOBILE_ACCT.to_string(), session.mobile_acct().to_string()],
            vec!["WEYL_ADDR".to_string(), session.config.weyl_addr.clone()],
            vec!["BLOCKVOTE_ADDR".to_string(), session.config.blockvote_addr.clone()],
        ],
    );
    format!("{}{}{}", RULE, body, RULE)
}

/// The configuration a command will run with, for `--debug`.
pub fn render_config(config: &ConsoleConfig, interface: &str) -> String {
    let body = table(
        &["Name", "Value"],
        vec![
            vec!["PROVIDER_URL".to_string(), config.provider_url.clone()],
            vec!["WEYL_FILE".to_string(), interface.to_string()],
            vec!["WEYL_ADDR".to_string(), config.weyl_addr.clone()],
            vec!["BLOCKVOTE_ADDR".to_string(), config.blockvote_addr.clone()],
            vec!["GAS_PRICE".to_string(), config.gas_price.clone()],
            vec!["GAS_LIMIT".to_string(), config.gas_limit.clone()],
            vec![
                "NOMINEE_ENUMERATION".to_string(),
                format!("{:?}", config.nominee_enumeration),
            ],
        ],
    );
    format!("{}{}{}", RULE, body, RULE)
}
