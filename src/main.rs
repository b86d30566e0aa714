use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use weyl_console::config::{self, ConsoleConfig, NomineeEnumeration};
use weyl_console::ledger::rpc::{governance_interface, JsonRpcLedger};
use weyl_console::report::{self, CycleListing};
use weyl_console::session::Session;
use weyl_console::workflow::{self, Command};

#[derive(clap::Parser, Debug)]
#[clap(name = "weyl-console", author, version, about, long_about = None)]
struct Args {
    /// Path to a JSON config whose parameters override the defaults
    #[clap(short, long, global = true, value_parser)]
    config: Option<PathBuf>,

    /// Bind against the deployable governance interface
    #[clap(short, long, global = true)]
    prod: bool,

    /// Print the configuration before running the command
    #[clap(short, long, global = true)]
    debug: bool,

    /// Override NOMINEE_ENUMERATION from the config
    #[clap(long, value_enum, global = true)]
    nominees: Option<NomineeEnumeration>,

    #[clap(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand, Debug)]
enum CliCommand {
    /// Print the default config and how to regenerate MOBILE_ACCT
    Defaults,
    /// Ask for each parameter and write the answers to conf.json
    #[clap(name = "initConfig")]
    InitConfig,
    /// Summarize cycles, ballots and withdrawals
    Inspect {
        /// List every governance cycle instead of only the current one
        #[clap(long)]
        all_cycles: bool,
    },
    /// Print the full addresses of the accounts and contracts in use
    Addresses,
    /// Print the balances of the contract, LOCAL_ACCT and MOBILE_ACCT
    Balances,
    /// Give LOCAL_ACCT and MOBILE_ACCT governing privileges
    Init,
    /// Open a new governance cycle
    Open,
    /// Close the current governance cycle
    Close,
    /// Have LOCAL_ACCT vote for MOBILE_ACCT in the current cycle
    Nominate,
    /// Send MOBILE_ACCT 10000 if it holds less than that
    Fund,
    /// Start a withdrawal of the stake behind a vote ballot
    #[clap(name = "beginWithdraw")]
    BeginWithdraw { cycle_id: u64, ballot_id: u64 },
    /// Finalize a started withdrawal
    #[clap(name = "finishWithdraw")]
    FinishWithdraw { withdrawal_id: u64 },
}

impl CliCommand {
    /// `None` for the commands that never touch the ledger.
    fn workflow(&self) -> Option<Command> {
        let command = match self {
            CliCommand::Defaults | CliCommand::InitConfig => return None,
            CliCommand::Inspect { all_cycles } => Command::Inspect {
                listing: if *all_cycles {
                    CycleListing::All
                } else {
                    CycleListing::Current
                },
            },
            CliCommand::Addresses => Command::Addresses,
            CliCommand::Balances => Command::Balances,
            CliCommand::Init => Command::Init,
            CliCommand::Open => Command::Open,
            CliCommand::Close => Command::Close,
            CliCommand::Nominate => Command::Nominate,
            CliCommand::Fund => Command::Fund,
            CliCommand::BeginWithdraw {
                cycle_id,
                ballot_id,
            } => Command::BeginWithdraw {
                cycle_id: *cycle_id,
                ballot_id: *ballot_id,
            },
            CliCommand::FinishWithdraw { withdrawal_id } => Command::FinishWithdraw {
                withdrawal_id: *withdrawal_id,
            },
        };
        Some(command)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    let command = match args.command.workflow() {
        Some(command) => command,
        None => {
            if let CliCommand::InitConfig = args.command {
                let path = config::init_config().await?;
                println!("\n  ==> Wrote {}", path.display());
            } else {
                println!("{}", ConsoleConfig::default().to_pretty_json()?);
                println!("\n{}", config::MOBILE_ACCT_DETAILS);
            }
            return Ok(());
        }
    };

    let mut config = ConsoleConfig::load(args.config.as_deref())?;
    if let Some(nominees) = args.nominees {
        config.nominee_enumeration = nominees;
    }
    if args.debug {
        print!("{}", report::render_config(&config, governance_interface(args.prod)));
    }

    let ledger = Arc::new(JsonRpcLedger::from_config(&config, args.prod)?);
    let session = Session::open(config, ledger).await?;

    let mut stdout = std::io::stdout();
    let outcome = workflow::run(&session, &command, &mut stdout).await?;
    log::info!(
        "{:?} finished: {} dispatched, {} skipped",
        command,
        outcome.dispatched().count(),
        outcome.skipped()
    );
    Ok(())
}
