use std::sync::Arc;

use weyl_console::amount::Amount;
use weyl_console::config::ConsoleConfig;
use weyl_console::decode::CycleStatus;
use weyl_console::ledger::mock::{MockLedger, MockState};
use weyl_console::ledger::LedgerCall;
use weyl_console::names::AccountRole;
use weyl_console::receipt::Verdict;
use weyl_console::report::CycleListing;
use weyl_console::session::Session;
use weyl_console::workflow::{self, Action, Command, Stage};

const LOCAL: &str = "0x627306090abaB3A6e1400e9345bC60c78a8BEf57";
const MOBILE: &str = "0x53fd44c705473ee2d780fe8f5278076f2171ca65";
const OTHER: &str = "0xf17f52151EbEF6C7334FAD080c5704D77216b732";

fn deployment() -> MockState {
    let mut state = MockState {
        accounts: vec![LOCAL.to_string()],
        current_cycle: 7,
        ..Default::default()
    };
    state.add_cycle(6, 2, OTHER, MOBILE, "5000000000000000000");
    state.add_cycle(7, 1, LOCAL, OTHER, "1234500000000000000000");
    state.set_balance(LOCAL, Amount::from_units(1_000_000));
    state
}

async fn open(state: MockState) -> (Arc<MockLedger>, Session) {
    let ledger = Arc::new(MockLedger::new(state));
    let session = Session::open(ConsoleConfig::default(), ledger.clone())
        .await
        .unwrap();
    (ledger, session)
}

#[tokio::test]
async fn init_registers_only_missing_governors() {
    let mut state = deployment();
    state.governing.insert(MOBILE.to_lowercase());
    let (ledger, session) = open(state).await;

    let mut out: Vec<u8> = Vec::new();
    let outcome = workflow::run(&session, &Command::Init, &mut out)
        .await
        .unwrap();

    let sent: Vec<LedgerCall> = ledger.sent().into_iter().map(|(call, _)| call).collect();
    assert_eq!(
        sent,
        vec![LedgerCall::RegisterGoverning {
            address: LOCAL.to_string()
        }]
    );
    assert_eq!(outcome.skipped(), 1);
    assert!(outcome.report.is_some());
    let printed = String::from_utf8(out).unwrap();
    assert!(printed.contains("already has governing privileges"));
}

#[tokio::test]
async fn init_with_both_governing_sends_nothing() {
    let mut state = deployment();
    state.governing.insert(MOBILE.to_lowercase());
    state.governing.insert(LOCAL.to_lowercase());
    let (ledger, session) = open(state).await;

    let outcome = workflow::run(&session, &Command::Init, &mut std::io::sink())
        .await
        .unwrap();
    assert!(ledger.sent().is_empty());
    assert_eq!(outcome.skipped(), 2);
    assert!(!outcome.stages.contains(&Stage::ReportRefreshed));
}

#[tokio::test]
async fn nominate_skips_candidate_with_ballot_in_current_cycle() {
    let mut state = deployment();
    state.add_nominee(MOBILE, 7, true);
    let (ledger, session) = open(state).await;
    let before = ledger.state().balances.clone();

    let outcome = workflow::run(&session, &Command::Nominate, &mut std::io::sink())
        .await
        .unwrap();
    assert!(ledger.sent().is_empty());
    assert_eq!(ledger.state().balances, before);
    assert!(outcome.report.is_none());
}

#[tokio::test]
async fn nominate_votes_and_refreshes_with_new_ballot() {
    let mut state = deployment();
    state.add_nominee(MOBILE, 6, true);
    let (ledger, session) = open(state).await;

    let outcome = workflow::run(&session, &Command::Nominate, &mut std::io::sink())
        .await
        .unwrap();

    let sent = ledger.sent();
    assert_eq!(sent.len(), 1);
    match &sent[0].0 {
        LedgerCall::Vote {
            candidate,
            promote,
            stake,
            ..
        } => {
            assert_eq!(candidate, MOBILE);
            assert!(*promote);
            assert_eq!(*stake, Amount::from_units(1764));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(
        ledger.state().balances[&LOCAL.to_lowercase()],
        Amount::from_units(1_000_000 - 1764)
    );

    let report = outcome.report.unwrap();
    assert_eq!(report.nominee_ballots.items.len(), 1);
    assert_eq!(
        report.nominee_ballots.items[0].nominee,
        AccountRole::MobileParticipant
    );
    assert_eq!(report.nominee_ballots.items[0].governance_cycle_id, 7);
    assert_eq!(report.vote_ballots.len(), 1);
    assert_eq!(report.vote_ballots[0].voter, AccountRole::LocalOperator);
}

#[tokio::test]
async fn nominating_a_block_maker_demotes() {
    let mut state = deployment();
    state.block_makers.insert(MOBILE.to_lowercase());
    let (ledger, session) = open(state).await;

    workflow::run(&session, &Command::Nominate, &mut std::io::sink())
        .await
        .unwrap();
    assert!(matches!(
        ledger.sent()[0].0,
        LedgerCall::Vote { promote: false, .. }
    ));
}

#[tokio::test]
async fn fund_tops_up_only_below_threshold() {
    let mut state = deployment();
    state.set_balance(MOBILE, "9999990000000000000000".parse().unwrap());
    let (ledger, session) = open(state).await;

    let outcome = workflow::run(&session, &Command::Fund, &mut std::io::sink())
        .await
        .unwrap();
    assert_eq!(outcome.dispatched().count(), 1);
    assert_eq!(
        ledger.state().balances[&MOBILE.to_lowercase()],
        "19999990000000000000000".parse::<Amount>().unwrap()
    );

    // now well above the threshold
    let outcome = workflow::run(&session, &Command::Fund, &mut std::io::sink())
        .await
        .unwrap();
    assert_eq!(outcome.skipped(), 1);
    assert_eq!(ledger.sent().len(), 1);
}

#[tokio::test]
async fn open_then_close_moves_cycle_forward() {
    let (_ledger, session) = open(deployment()).await;

    let opened = workflow::run(&session, &Command::Open, &mut std::io::sink())
        .await
        .unwrap();
    let report = opened.report.unwrap();
    assert_eq!(report.current_cycle_id, 8);
    assert_eq!(report.cycles[0].status, CycleStatus::Started);

    let closed = workflow::run(&session, &Command::Close, &mut std::io::sink())
        .await
        .unwrap();
    let report = closed.report.unwrap();
    assert_eq!(report.current_cycle_id, 8);
    assert_eq!(report.cycles[0].status, CycleStatus::Completed);
}

#[tokio::test]
async fn withdrawal_lifecycle() {
    let mut state = deployment();
    state.add_ballot(LOCAL, MOBILE, "1764000000000000000000");
    let (_ledger, session) = open(state).await;

    let begun = workflow::run(
        &session,
        &Command::BeginWithdraw {
            cycle_id: 7,
            ballot_id: 1,
        },
        &mut std::io::sink(),
    )
    .await
    .unwrap();
    let withdrawals = &begun.report.unwrap().withdrawals;
    assert_eq!(withdrawals.len(), 1);
    assert_eq!(withdrawals[0].status, CycleStatus::Started);
    assert_eq!(withdrawals[0].amount, Amount::from_units(1764));

    let finished = workflow::run(
        &session,
        &Command::FinishWithdraw { withdrawal_id: 1 },
        &mut std::io::sink(),
    )
    .await
    .unwrap();
    assert_eq!(
        finished.report.unwrap().withdrawals[0].status,
        CycleStatus::Completed
    );
}

#[tokio::test]
async fn exhausted_gas_prints_advisory() {
    let mut state = deployment();
    state.gas_used = Some(10_000_000);
    let (_ledger, session) = open(state).await;

    let mut out: Vec<u8> = Vec::new();
    let outcome = workflow::run(&session, &Command::Open, &mut out)
        .await
        .unwrap();
    assert!(matches!(
        &outcome.actions[0],
        Action::Dispatched {
            verdict: Verdict::SuspectedSilentFailure,
            ..
        }
    ));
    let printed = String::from_utf8(out).unwrap();
    assert!(printed.contains("gas used equals the gas limit (10000000)"));
}

#[tokio::test]
async fn inspect_renders_current_cycle_with_names() {
    let (ledger, session) = open(deployment()).await;

    let mut out: Vec<u8> = Vec::new();
    let outcome = workflow::run(
        &session,
        &Command::Inspect {
            listing: CycleListing::Current,
        },
        &mut out,
    )
    .await
    .unwrap();
    assert!(ledger.sent().is_empty());
    assert_eq!(outcome.report.unwrap().cycles.len(), 1);

    let printed = String::from_utf8(out).unwrap();
    assert!(printed.contains("Cycle 7"));
    assert!(printed.contains("1234.50"));
    assert!(printed.contains("LOCAL_ACCT"));
    assert!(printed.contains("No nominee ballots made yet"));
    assert!(printed.contains("No vote ballots made yet"));
    assert!(printed.contains("No withdrawals made yet"));
}

#[tokio::test]
async fn inspect_all_cycles_lists_newest_first() {
    let (_ledger, session) = open(deployment()).await;
    let outcome = workflow::run(
        &session,
        &Command::Inspect {
            listing: CycleListing::All,
        },
        &mut std::io::sink(),
    )
    .await
    .unwrap();
    let ids: Vec<u64> = outcome
        .report
        .unwrap()
        .cycles
        .iter()
        .map(|c| c.cycle_id)
        .collect();
    assert_eq!(ids, (0..=7).rev().collect::<Vec<u64>>());
}
