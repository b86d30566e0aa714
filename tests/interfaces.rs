use std::path::PathBuf;

use weyl_console::config::ConsoleConfig;
use weyl_console::ledger::abi::ContractBinding;
use weyl_console::ledger::{JsonRpcLedger, Ledger};

fn contracts_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("contracts")
}

#[test]
fn shipped_interfaces_expose_the_console_functions() {
    let governance = ContractBinding::load(&contracts_dir().join("WeylGovV2.json")).unwrap();
    for method in [
        "currentGovernanceCycle",
        "governanceCycleRecords",
        "nomineesInCycle",
        "nomineeBallotKeys",
        "nomineeBallots",
        "ballotIndex",
        "ballotRecords",
        "withdrawRecordsIndex",
        "withdrawRecords",
        "canGovern",
        "registerGoverning",
        "vote",
        "newGovernanceCycle",
        "finalizeGovernanceCycle",
        "startWithdraw",
        "finalizeWithdraw",
    ] {
        assert!(governance.has_function(method), "missing {}", method);
    }

    let block_voting =
        ContractBinding::load(&contracts_dir().join("BlockVotingDeployable.json")).unwrap();
    assert!(block_voting.has_function("isBlockMaker"));
}

#[test]
fn deployable_interface_has_no_nominee_count() {
    let config = ConsoleConfig {
        contracts_dir: contracts_dir(),
        ..Default::default()
    };
    let dev = JsonRpcLedger::from_config(&config, false).unwrap();
    let prod = JsonRpcLedger::from_config(&config, true).unwrap();
    assert!(dev.supports_nominee_count());
    assert!(!prod.supports_nominee_count());
}

#[test]
fn missing_interface_is_a_config_error() {
    let config = ConsoleConfig {
        contracts_dir: PathBuf::from("/nonexistent"),
        ..Default::default()
    };
    assert!(matches!(
        JsonRpcLedger::from_config(&config, false),
        Err(weyl_console::ConsoleError::Config(_))
    ));
}
