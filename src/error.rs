/// Everything that can abort a console command.
///
/// Guard skips, suspected silent failures and ambiguous probe terminations are
/// not errors; see `guard::Decision`, `receipt::Verdict` and
/// `collector::Termination`.
#[derive(thiserror::Error, Debug)]
pub enum ConsoleError {
    /// The ledger could not be reached or answered with something that is not JSON-RPC.
    #[error("transport error: {0}")]
    Transport(String),
    /// The ledger answered but refused the call (revert, index out of range, ...).
    #[error("call {method} rejected by ledger: {reason}")]
    Rejected { method: String, reason: String },
    #[error("cannot decode {what}: {reason}")]
    Decode { what: String, reason: String },
    #[error("configuration error: {0}")]
    Config(String),
    #[error("no local account: none configured and the transport exposes no accounts")]
    NoLocalAccount,
    #[error("invalid argument {name}: {reason}")]
    InvalidArgument { name: String, reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ConsoleError {
    pub fn decode(what: impl Into<String>, reason: impl ToString) -> Self {
        ConsoleError::Decode {
            what: what.into(),
            reason: reason.to_string(),
        }
    }

    /// True when the ledger itself refused the call, as opposed to the call never
    /// reaching it.
    pub fn is_rejection(&self) -> bool {
        matches!(self, ConsoleError::Rejected { .. })
    }
}

impl From<reqwest::Error> for ConsoleError {
    fn from(e: reqwest::Error) -> Self {
        ConsoleError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for ConsoleError {
    fn from(e: serde_json::Error) -> Self {
        ConsoleError::decode("json", e)
    }
}

pub type Result<T> = std::result::Result<T, ConsoleError>;
