//! One short state machine per console command:
//!
//! ```text
//! Start → LocalAccountResolved → GuardEvaluated ─┬─► Skipped ────────────────────────────┐
//!                                                └─► Dispatched → ReceiptValidated ─► ReportRefreshed → Done
//! ```
//!
//! The local account is resolved once, when the `Session` is opened; every
//! workflow starts from that. Guards run before anything is sent, receipt
//! validation only ever warns, and nothing is retried.

use std::io::Write;

use crate::error::Result;
use crate::guard::{self, Decision};
use crate::ledger::{LedgerCall, Receipt};
use crate::names::{LOCAL_ACCT, MOBILE_ACCT};
use crate::receipt::{self, Verdict};
use crate::report::{self, CycleListing, Report};
use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Inspect { listing: CycleListing },
    Addresses,
    Balances,
    Init,
    Open,
    Close,
    Nominate,
    Fund,
    BeginWithdraw { cycle_id: u64, ballot_id: u64 },
    FinishWithdraw { withdrawal_id: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    LocalAccountResolved,
    GuardEvaluated,
    Skipped,
    Dispatched,
    ReceiptValidated,
    ReportRefreshed,
    Done,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Skipped {
        reason: String,
    },
    Dispatched {
        call: LedgerCall,
        receipt: Receipt,
        verdict: Verdict,
    },
}

/// What a workflow did, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    pub stages: Vec<Stage>,
    pub actions: Vec<Action>,
    pub report: Option<Report>,
}

impl Outcome {
    fn enter(&mut self, stage: Stage) {
        log::info!("workflow stage {:?}", stage);
        self.stages.push(stage);
    }

    pub fn dispatched(&self) -> impl Iterator<Item = &LedgerCall> {
        self.actions.iter().filter_map(|action| match action {
            Action::Dispatched { call, .. } => Some(call),
            Action::Skipped { .. } => None,
        })
    }

    pub fn skipped(&self) -> usize {
        self.actions
            .iter()
            .filter(|action| matches!(action, Action::Skipped { .. }))
            .count()
    }
}

fn success_message(call: &LedgerCall) -> String {
    match call {
        LedgerCall::RegisterGoverning { address } => {
            format!("{} now has governing privileges, receipt follows:", address)
        }
        LedgerCall::Vote { .. } => format!(
            "Detected no current ballot for {}, {} is voting for them. Here's the receipt:",
            MOBILE_ACCT, LOCAL_ACCT
        ),
        LedgerCall::NewGovernanceCycle => {
            "Successfully opened a governance cycle, receipt follows:".to_string()
        }
        LedgerCall::FinalizeGovernanceCycle => {
            "Successfully closed a governance cycle, receipt follows:".to_string()
        }
        LedgerCall::StartWithdraw {
            cycle_id,
            ballot_id,
        } => format!(
            "Successfully started a withdrawal, cycle {} & ballot {}, receipt follows:",
            cycle_id, ballot_id
        ),
        LedgerCall::FinalizeWithdraw { withdrawal_id } => format!(
            "Successfully finalized withdrawal ID {}, receipt follows:",
            withdrawal_id
        ),
        LedgerCall::Transfer { amount, .. } => format!(
            "Successfully sent {} {}, here's the receipt:",
            MOBILE_ACCT, amount
        ),
    }
}

/// Runs the skip-or-dispatch half of a workflow for one guarded action.
async fn act<W: Write>(
    session: &Session,
    decision: Decision,
    outcome: &mut Outcome,
    out: &mut W,
) -> Result<()> {
    outcome.enter(Stage::GuardEvaluated);
    match decision {
        Decision::Skip(reason) => {
            outcome.enter(Stage::Skipped);
            writeln!(out, "\n  ==> {}", reason)?;
            outcome.actions.push(Action::Skipped { reason });
        }
        Decision::Proceed(call) => {
            let receipt = session.ledger.send(&call, &session.envelope).await?;
            outcome.enter(Stage::Dispatched);
            writeln!(out, "\n  ==> {}\n", success_message(&call))?;
            writeln!(out, "{}", receipt)?;

            let verdict = receipt::validate(&receipt, session.envelope.gas_limit);
            outcome.enter(Stage::ReceiptValidated);
            if let Some(warning) = verdict.warning(session.envelope.gas_limit) {
                writeln!(out, "\n  !! {}", warning)?;
            }
            outcome.actions.push(Action::Dispatched {
                call,
                receipt,
                verdict,
            });
        }
    }
    Ok(())
}

pub async fn run<W: Write>(session: &Session, command: &Command, out: &mut W) -> Result<Outcome> {
    let mut outcome = Outcome::default();
    outcome.enter(Stage::Start);
    outcome.enter(Stage::LocalAccountResolved);
    let ledger = session.ledger.as_ref();

    match command {
        Command::Inspect { listing } => {
            let report = report::build_report(session, *listing).await?;
            write!(out, "{}", report.render())?;
            outcome.report = Some(report);
            outcome.enter(Stage::ReportRefreshed);
        }
        Command::Addresses => {
            write!(out, "{}", report::render_addresses(session))?;
        }
        Command::Balances => {
            let rows = report::balances(session).await?;
            write!(out, "{}", report::render_balances(&rows))?;
        }
        Command::Init => {
            for (name, address) in [
                (LOCAL_ACCT, session.local_acct.as_str()),
                (MOBILE_ACCT, session.mobile_acct()),
            ] {
                let decision = guard::evaluate_register(ledger, name, address).await?;
                act(session, decision, &mut outcome, out).await?;
            }
        }
        Command::Open => {
            let call = LedgerCall::NewGovernanceCycle;
            act(session, Decision::Proceed(call), &mut outcome, out).await?;
        }
        Command::Close => {
            let call = LedgerCall::FinalizeGovernanceCycle;
            act(session, Decision::Proceed(call), &mut outcome, out).await?;
        }
        Command::Nominate => {
            let decision =
                guard::evaluate_nominate(ledger, &session.names, session.mobile_acct()).await?;
            act(session, decision, &mut outcome, out).await?;
        }
        Command::Fund => {
            let decision = guard::evaluate_fund(ledger, session.mobile_acct()).await?;
            act(session, decision, &mut outcome, out).await?;
        }
        Command::BeginWithdraw {
            cycle_id,
            ballot_id,
        } => {
            let call = LedgerCall::StartWithdraw {
                cycle_id: *cycle_id,
                ballot_id: *ballot_id,
            };
            act(session, Decision::Proceed(call), &mut outcome, out).await?;
        }
        Command::FinishWithdraw { withdrawal_id } => {
            let call = LedgerCall::FinalizeWithdraw {
                withdrawal_id: *withdrawal_id,
            };
            act(session, Decision::Proceed(call), &mut outcome, out).await?;
        }
    }

    if outcome.dispatched().next().is_some() {
        let report = report::build_report(session, CycleListing::Current).await?;
        write!(out, "{}", report.render())?;
        outcome.report = Some(report);
        outcome.enter(Stage::ReportRefreshed);
    }
    outcome.enter(Stage::Done);
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::Amount;
    use crate::config::ConsoleConfig;
    use crate::ledger::mock::{MockLedger, MockState};
    use std::sync::Arc;

    const LOCAL: &str = "0x627306090abaB3A6e1400e9345bC60c78a8BEf57";
    const MOBILE: &str = "0x53fd44c705473ee2d780fe8f5278076f2171ca65";

    fn base_state() -> MockState {
        let mut state = MockState {
            accounts: vec![LOCAL.to_string()],
            current_cycle: 7,
            ..Default::default()
        };
        state.add_cycle(7, 1, LOCAL, MOBILE, "0");
        state.set_balance(LOCAL, Amount::from_units(1_000_000));
        state
    }

    async fn session(ledger: Arc<MockLedger>) -> Session {
        Session::open(ConsoleConfig::default(), ledger).await.unwrap()
    }

    #[tokio::test]
    async fn skipped_workflow_does_not_refresh() {
        let mut state = base_state();
        state.set_balance(MOBILE, Amount::from_units(10_000));
        let ledger = Arc::new(MockLedger::new(state));
        let session = session(ledger.clone()).await;
        let mut out: Vec<u8> = Vec::new();
        let outcome = run(&session, &Command::Fund, &mut out).await.unwrap();
        assert_eq!(
            outcome.stages,
            vec![
                Stage::Start,
                Stage::LocalAccountResolved,
                Stage::GuardEvaluated,
                Stage::Skipped,
                Stage::Done
            ]
        );
        assert!(ledger.sent().is_empty());
        assert!(outcome.report.is_none());
    }

    #[tokio::test]
    async fn dispatched_workflow_validates_and_refreshes() {
        let ledger = Arc::new(MockLedger::new(base_state()));
        let session = session(ledger.clone()).await;
        let mut out: Vec<u8> = Vec::new();
        let outcome = run(&session, &Command::Open, &mut out).await.unwrap();
        assert_eq!(
            outcome.stages,
            vec![
                Stage::Start,
                Stage::LocalAccountResolved,
                Stage::GuardEvaluated,
                Stage::Dispatched,
                Stage::ReceiptValidated,
                Stage::ReportRefreshed,
                Stage::Done
            ]
        );
        assert_eq!(outcome.report.as_ref().map(|r| r.current_cycle_id), Some(8));
        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("Successfully opened a governance cycle"));
        assert!(printed.contains("transactionHash"));
    }

    #[tokio::test]
    async fn every_send_uses_the_session_envelope() {
        let ledger = Arc::new(MockLedger::new(base_state()));
        let session = session(ledger.clone()).await;
        let mut out: Vec<u8> = Vec::new();
        for command in [
            Command::Open,
            Command::Fund,
            Command::Close,
            Command::FinishWithdraw { withdrawal_id: 1 },
        ] {
            // finishing an unknown withdrawal is rejected by the ledger
            let _ = run(&session, &command, &mut out).await;
        }
        let sent = ledger.sent();
        assert_eq!(sent.len(), 3);
        assert!(sent.iter().all(|(_, envelope)| *envelope == session.envelope));
    }

    #[tokio::test]
    async fn exhausted_gas_warns_but_completes() {
        let mut state = base_state();
        state.gas_used = Some(10_000_000);
        let ledger = Arc::new(MockLedger::new(state));
        let session = session(ledger.clone()).await;
        let mut out: Vec<u8> = Vec::new();
        let outcome = run(&session, &Command::Close, &mut out).await.unwrap();
        assert!(matches!(
            outcome.actions[0],
            Action::Dispatched {
                verdict: Verdict::SuspectedSilentFailure,
                ..
            }
        ));
        assert_eq!(outcome.stages.last(), Some(&Stage::Done));
        assert!(String::from_utf8(out).unwrap().contains("probably reverted"));
    }

    #[tokio::test]
    async fn rejected_send_aborts_without_retry() {
        let ledger = Arc::new(MockLedger::new(base_state()));
        let session = session(ledger.clone()).await;
        let mut out: Vec<u8> = Vec::new();
        let result = run(
            &session,
            &Command::BeginWithdraw {
                cycle_id: 7,
                ballot_id: 4,
            },
            &mut out,
        )
        .await;
        assert!(result.is_err());
        assert!(ledger.sent().is_empty());
    }
}
