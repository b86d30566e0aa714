use std::sync::Arc;

use crate::collector::Bound;
use crate::config::{ConsoleConfig, NomineeEnumeration};
use crate::error::{ConsoleError, Result};
use crate::ledger::{Envelope, Ledger};
use crate::names::NameResolver;

/// Everything a workflow needs, fixed for the life of the process. The local
/// account is resolved once here and reused by every command.
pub struct Session {
    pub config: ConsoleConfig,
    pub ledger: Arc<dyn Ledger>,
    pub local_acct: String,
    pub envelope: Envelope,
    pub names: NameResolver,
}

impl Session {
    pub async fn open(config: ConsoleConfig, ledger: Arc<dyn Ledger>) -> Result<Session> {
        let local_acct = match &config.local_acct {
            Some(address) => address.clone(),
            None => ledger
                .accounts()
                .await?
                .into_iter()
                .next()
                .ok_or(ConsoleError::NoLocalAccount)?,
        };
        if config.nominee_enumeration == NomineeEnumeration::Count
            && !ledger.supports_nominee_count()
        {
            return Err(ConsoleError::Config(
                "NOMINEE_ENUMERATION is count but the governance interface has no nomineesInCycle"
                    .into(),
            ));
        }
        log::info!("LOCAL_ACCT resolved to {}", local_acct);
        let envelope = config.envelope(&local_acct)?;
        let names = NameResolver::new(&local_acct, &config.mobile_acct);
        Ok(Session {
            config,
            ledger,
            local_acct,
            envelope,
            names,
        })
    }

    pub fn mobile_acct(&self) -> &str {
        &self.config.mobile_acct
    }

    /// How nominee ballots are enumerated for this deployment.
    pub async fn nominee_bound(&self) -> Result<Bound> {
        match self.config.nominee_enumeration {
            NomineeEnumeration::Probe => Ok(Bound::Probe),
            NomineeEnumeration::Count => Ok(Bound::Count(self.ledger.nominee_count().await?)),
        }
    }
}
