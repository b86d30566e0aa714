use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{ConsoleError, Result};
use crate::ledger::Envelope;

pub const DEFAULT_PROVIDER_URL: &str = "http://localhost:8545";
pub const DEFAULT_GAS_PRICE: &str = "2000000";
pub const DEFAULT_GAS_LIMIT: &str = "10000000";
pub const DEFAULT_WEYL_ADDR: &str = "0x9d60084dd3fa8a5f0f352f27f0062cfd8f11f6e2";
pub const DEFAULT_BLOCKVOTE_ADDR: &str = "0xf9459c4a0385a28163b65a3739f4651b7b8ccc9a";
pub const DEFAULT_MOBILE_ACCT: &str = "0x53fd44c705473ee2d780fe8f5278076f2171ca65";
pub const DEFAULT_CONTRACTS_DIR: &str = "./contracts";

/// Where `initConfig` writes its answers.
pub const GENERATED_CONFIG_FILE: &str = "conf.json";

/// How to regenerate the default MOBILE_ACCT with the mobile wallet.
pub const MOBILE_ACCT_DETAILS: &str = r#"    > MOBILE_ACCT seed: "dial worth chase zebra hip art copper upgrade right asset earn caution"
    > MOBILE_ACCT password: "password"
    > MOBILE_ACCT HD_PATH: "m/0'/0'/0'""#;

fn default_provider_url() -> String {
    DEFAULT_PROVIDER_URL.to_string()
}
fn default_gas_price() -> String {
    DEFAULT_GAS_PRICE.to_string()
}
fn default_gas_limit() -> String {
    DEFAULT_GAS_LIMIT.to_string()
}
fn default_weyl_addr() -> String {
    DEFAULT_WEYL_ADDR.to_string()
}
fn default_blockvote_addr() -> String {
    DEFAULT_BLOCKVOTE_ADDR.to_string()
}
fn default_mobile_acct() -> String {
    DEFAULT_MOBILE_ACCT.to_string()
}
fn default_contracts_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CONTRACTS_DIR)
}

/// Nominee ballots can be listed by probing keys until the ledger refuses one,
/// or by asking for the count first when the interface exposes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NomineeEnumeration {
    #[default]
    Probe,
    Count,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleConfig {
    #[serde(rename = "PROVIDER_URL", default = "default_provider_url")]
    pub provider_url: String,
    #[serde(rename = "GAS_PRICE", default = "default_gas_price")]
    pub gas_price: String,
    #[serde(rename = "GAS_LIMIT", default = "default_gas_limit")]
    pub gas_limit: String,
    #[serde(rename = "WEYL_ADDR", default = "default_weyl_addr")]
    pub weyl_addr: String,
    #[serde(rename = "BLOCKVOTE_ADDR", default = "default_blockvote_addr")]
    pub blockvote_addr: String,
    #[serde(rename = "MOBILE_ACCT", default = "default_mobile_acct")]
    pub mobile_acct: String,
    /// Discovered from the transport when absent.
    #[serde(rename = "LOCAL_ACCT", default, skip_serializing_if = "Option::is_none")]
    pub local_acct: Option<String>,
    #[serde(rename = "NOMINEE_ENUMERATION", default)]
    pub nominee_enumeration: NomineeEnumeration,
    #[serde(rename = "CONTRACTS_DIR", default = "default_contracts_dir")]
    pub contracts_dir: PathBuf,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        ConsoleConfig {
            provider_url: default_provider_url(),
            gas_price: default_gas_price(),
            gas_limit: default_gas_limit(),
            weyl_addr: default_weyl_addr(),
            blockvote_addr: default_blockvote_addr(),
            mobile_acct: default_mobile_acct(),
            local_acct: None,
            nominee_enumeration: NomineeEnumeration::default(),
            contracts_dir: default_contracts_dir(),
        }
    }
}

fn parse_gas(name: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|e| ConsoleError::Config(format!("{} {:?}: {}", name, value, e)))
}

impl ConsoleConfig {
    /// Reads `path` if given; every key missing from the file keeps its default.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(ConsoleConfig::default());
        };
        let json = std::fs::read_to_string(path)
            .map_err(|e| ConsoleError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: ConsoleConfig = serde_json::from_str(json)
            .map_err(|e| ConsoleError::Config(format!("invalid config: {}", e)))?;
        config.gas()?;
        Ok(config)
    }

    /// `(gas price, gas limit)` parsed from their decimal strings.
    pub fn gas(&self) -> Result<(u64, u64)> {
        Ok((
            parse_gas("GAS_PRICE", &self.gas_price)?,
            parse_gas("GAS_LIMIT", &self.gas_limit)?,
        ))
    }

    pub fn envelope(&self, from: &str) -> Result<Envelope> {
        let (gas_price, gas_limit) = self.gas()?;
        Ok(Envelope {
            from: from.to_string(),
            gas_price,
            gas_limit,
        })
    }

    pub fn to_pretty_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

async fn prompt<R, W>(input: &mut R, output: &mut W, label: &str, default: &str) -> Result<String>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    output
        .write_all(format!("{} ({}): ", label, default).as_bytes())
        .await?;
    output.flush().await?;
    let mut answer = String::new();
    input.read_line(&mut answer).await?;
    let answer = answer.trim();
    Ok(if answer.is_empty() {
        default.to_string()
    } else {
        answer.to_string()
    })
}

/// Asks for each value in turn; an empty answer takes the suggested default.
pub async fn build_config<R, W>(mut input: R, mut output: W) -> Result<ConsoleConfig>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut config = ConsoleConfig::default();
    config.provider_url =
        prompt(&mut input, &mut output, "Full Provider URL", DEFAULT_PROVIDER_URL).await?;
    config.gas_price = prompt(&mut input, &mut output, "Gas Price", "20000000000").await?;
    config.gas_limit = prompt(&mut input, &mut output, "Gas Limit", "2000000").await?;
    config.weyl_addr = prompt(
        &mut input,
        &mut output,
        "WeylGovernance Address",
        "0x000000000000000000000000000000000000002A",
    )
    .await?;
    config.blockvote_addr = prompt(
        &mut input,
        &mut output,
        "BlockVoting Address",
        "0x0000000000000000000000000000000000000020",
    )
    .await?;
    config.mobile_acct =
        prompt(&mut input, &mut output, "Mobile Account Address", DEFAULT_MOBILE_ACCT).await?;
    config.gas()?;
    Ok(config)
}

/// Interactive `initConfig`: prompts on stdin and writes `conf.json`.
pub async fn init_config() -> Result<PathBuf> {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let config = build_config(stdin, tokio::io::stdout()).await?;
    let path = PathBuf::from(GENERATED_CONFIG_FILE);
    tokio::fs::write(&path, config.to_pretty_json()?).await?;
    log::info!("wrote {}", path.display());
    Ok(path)
}
