use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{hex, U256};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::abi::{address_arg, uint_arg, ContractBinding};
use super::{Envelope, Ledger, LedgerCall, Receipt};
use crate::amount::Amount;
use crate::config::ConsoleConfig;
use crate::decode::RawRecord;
use crate::error::{ConsoleError, Result};

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: String,
    block_number: Option<String>,
    gas_used: String,
    #[serde(default)]
    status: Option<String>,
}

/// A deployed contract and its interface description.
#[derive(Debug, Clone)]
pub struct Contract {
    pub address: String,
    pub binding: ContractBinding,
}

/// `Ledger` over Ethereum-style JSON-RPC. Transactions are signed by the node,
/// which must hold the sending account unlocked.
pub struct JsonRpcLedger {
    url: String,
    client: reqwest::Client,
    next_id: AtomicU64,
    governance: Contract,
    block_voting: Contract,
}

/// Interface description file of the governance contract.
pub fn governance_interface(prod: bool) -> &'static str {
    if prod {
        "WeylGovV2Deployable.json"
    } else {
        "WeylGovV2.json"
    }
}

impl JsonRpcLedger {
    pub fn new(url: &str, governance: Contract, block_voting: Contract) -> Self {
        JsonRpcLedger {
            url: url.to_string(),
            client: reqwest::Client::new(),
            next_id: AtomicU64::new(1),
            governance,
            block_voting,
        }
    }

    /// Binds against the interface descriptions in `CONTRACTS_DIR`; `prod`
    /// selects the deployable governance variant.
    pub fn from_config(config: &ConsoleConfig, prod: bool) -> Result<Self> {
        let governance_file = governance_interface(prod);
        let governance = Contract {
            address: config.weyl_addr.clone(),
            binding: ContractBinding::load(&config.contracts_dir.join(governance_file))?,
        };
        let block_voting = Contract {
            address: config.blockvote_addr.clone(),
            binding: ContractBinding::load(
                &config.contracts_dir.join("BlockVotingDeployable.json"),
            )?,
        };
        log::debug!(
            "bound {} at {} and {} at {}",
            governance.binding.name(),
            governance.address,
            block_voting.binding.name(),
            block_voting.address
        );
        Ok(Self::new(&config.provider_url, governance, block_voting))
    }

    async fn rpc<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        log::debug!("rpc #{} {}", id, method);
        let response = self.client.post(&self.url).json(&body).send().await?;
        let status = response.status();
        let text = response.text().await?;
        let parsed: RpcResponse = serde_json::from_str(&text).map_err(|e| {
            ConsoleError::Transport(format!(
                "{} returned HTTP {} with unreadable body: {}",
                method, status, e
            ))
        })?;
        if let Some(error) = parsed.error {
            return Err(ConsoleError::Rejected {
                method: method.to_string(),
                reason: format!("{} (code {})", error.message, error.code),
            });
        }
        let result = parsed.result.unwrap_or(Value::Null);
        serde_json::from_value(result)
            .map_err(|e| ConsoleError::decode(format!("{} result", method), e))
    }

    async fn call(
        &self,
        contract: &Contract,
        method: &str,
        args: &[DynSolValue],
    ) -> Result<RawRecord> {
        let data = contract.binding.encode(method, args)?;
        let params = json!([
            { "to": contract.address, "data": hex::encode_prefixed(&data) },
            "latest"
        ]);
        let output: String = self
            .rpc("eth_call", params)
            .await
            .map_err(|e| match e {
                ConsoleError::Rejected { reason, .. } => ConsoleError::Rejected {
                    method: method.to_string(),
                    reason,
                },
                other => other,
            })?;
        let bytes = hex::decode(output.trim_start_matches("0x"))
            .map_err(|e| ConsoleError::decode(format!("{} output", method), e))?;
        contract.binding.decode(method, &bytes)
    }

    async fn call_u64(&self, method: &str, args: &[DynSolValue]) -> Result<u64> {
        let raw = self.call(&self.governance, method, args).await?;
        first_u64(&raw, method)
    }

    async fn wait_for_receipt(&self, hash: &str) -> Result<Receipt> {
        loop {
            let receipt: Option<RpcReceipt> = self
                .rpc("eth_getTransactionReceipt", json!([hash]))
                .await?;
            if let Some(receipt) = receipt {
                return Ok(Receipt {
                    transaction_hash: receipt.transaction_hash,
                    block_number: receipt
                        .block_number
                        .as_deref()
                        .map(parse_quantity)
                        .transpose()?,
                    gas_used: parse_quantity(&receipt.gas_used)?,
                    status: receipt
                        .status
                        .as_deref()
                        .map(parse_quantity)
                        .transpose()?
                        .map(|s| s == 1),
                });
            }
            log::debug!("receipt for {} not available yet", hash);
            tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
        }
    }
}

fn first_u64(raw: &RawRecord, method: &str) -> Result<u64> {
    raw.get("0")
        .and_then(Value::as_str)
        .ok_or_else(|| ConsoleError::decode(format!("{} output", method), "no value"))?
        .parse::<u64>()
        .map_err(|e| ConsoleError::decode(format!("{} output", method), e))
}

fn first_bool(raw: &RawRecord, method: &str) -> Result<bool> {
    raw.get("0")
        .and_then(Value::as_bool)
        .ok_or_else(|| ConsoleError::decode(format!("{} output", method), "not a bool"))
}

fn first_string(raw: &RawRecord, method: &str) -> Result<String> {
    raw.get("0")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ConsoleError::decode(format!("{} output", method), "not a string"))
}

fn parse_quantity(value: &str) -> Result<u64> {
    u64::from_str_radix(value.trim_start_matches("0x"), 16)
        .map_err(|e| ConsoleError::decode(format!("quantity {:?}", value), e))
}

fn quantity(value: U256) -> String {
    format!("0x{:x}", value)
}

#[async_trait]
impl Ledger for JsonRpcLedger {
    async fn accounts(&self) -> Result<Vec<String>> {
        self.rpc("eth_accounts", json!([])).await
    }

    async fn balance(&self, address: &str) -> Result<Amount> {
        let balance: String = self.rpc("eth_getBalance", json!([address, "latest"])).await?;
        balance.parse()
    }

    async fn current_cycle_id(&self) -> Result<u64> {
        self.call_u64("currentGovernanceCycle", &[]).await
    }

    async fn cycle_record(&self, cycle_id: u64) -> Result<RawRecord> {
        self.call(&self.governance, "governanceCycleRecords", &[uint_arg(cycle_id)])
            .await
    }

    async fn nominee_count(&self) -> Result<u64> {
        self.call_u64("nomineesInCycle", &[]).await
    }

    fn supports_nominee_count(&self) -> bool {
        self.governance.binding.has_function("nomineesInCycle")
    }

    async fn nominee_ballot_key(&self, index: u64) -> Result<String> {
        let raw = self
            .call(&self.governance, "nomineeBallotKeys", &[uint_arg(index)])
            .await?;
        first_string(&raw, "nomineeBallotKeys")
    }

    async fn nominee_ballot(&self, nominee: &str) -> Result<RawRecord> {
        self.call(&self.governance, "nomineeBallots", &[address_arg(nominee)?])
            .await
    }

    async fn ballot_index(&self) -> Result<u64> {
        self.call_u64("ballotIndex", &[]).await
    }

    async fn ballot_record(&self, ballot_id: u64) -> Result<RawRecord> {
        self.call(&self.governance, "ballotRecords", &[uint_arg(ballot_id)])
            .await
    }

    async fn withdraw_index(&self) -> Result<u64> {
        self.call_u64("withdrawRecordsIndex", &[]).await
    }

    async fn withdraw_record(&self, withdrawal_id: u64) -> Result<RawRecord> {
        self.call(&self.governance, "withdrawRecords", &[uint_arg(withdrawal_id)])
            .await
    }

    async fn can_govern(&self, address: &str) -> Result<bool> {
        let raw = self
            .call(&self.governance, "canGovern", &[address_arg(address)?])
            .await?;
        first_bool(&raw, "canGovern")
    }

    async fn is_block_maker(&self, address: &str) -> Result<bool> {
        let raw = self
            .call(&self.block_voting, "isBlockMaker", &[address_arg(address)?])
            .await?;
        first_bool(&raw, "isBlockMaker")
    }

    async fn send(&self, call: &LedgerCall, envelope: &Envelope) -> Result<Receipt> {
        let (to, data) = match call {
            LedgerCall::Transfer { to, .. } => (to.clone(), None),
            LedgerCall::RegisterGoverning { address } => (
                self.governance.address.clone(),
                Some(
                    self.governance
                        .binding
                        .encode("registerGoverning", &[address_arg(address)?])?,
                ),
            ),
            LedgerCall::Vote {
                candidate,
                promote,
                confirm,
                weight,
                ..
            } => (
                self.governance.address.clone(),
                Some(self.governance.binding.encode(
                    "vote",
                    &[
                        address_arg(candidate)?,
                        DynSolValue::Bool(*promote),
                        DynSolValue::Bool(*confirm),
                        uint_arg(*weight),
                    ],
                )?),
            ),
            LedgerCall::NewGovernanceCycle => (
                self.governance.address.clone(),
                Some(self.governance.binding.encode("newGovernanceCycle", &[])?),
            ),
            LedgerCall::FinalizeGovernanceCycle => (
                self.governance.address.clone(),
                Some(self.governance.binding.encode("finalizeGovernanceCycle", &[])?),
            ),
            LedgerCall::StartWithdraw {
                cycle_id,
                ballot_id,
            } => (
                self.governance.address.clone(),
                Some(self.governance.binding.encode(
                    "startWithdraw",
                    &[uint_arg(*cycle_id), uint_arg(*ballot_id)],
                )?),
            ),
            LedgerCall::FinalizeWithdraw { withdrawal_id } => (
                self.governance.address.clone(),
                Some(
                    self.governance
                        .binding
                        .encode("finalizeWithdraw", &[uint_arg(*withdrawal_id)])?,
                ),
            ),
        };

        let mut tx = json!({
            "from": envelope.from,
            "to": to,
            "gas": quantity(U256::from(envelope.gas_limit)),
            "gasPrice": quantity(U256::from(envelope.gas_price)),
            "value": quantity(call.value().smallest()),
        });
        if let Some(data) = data {
            tx["data"] = Value::String(hex::encode_prefixed(&data));
        }

        log::info!("sending {} from {}", call, envelope.from);
        let hash: String = self.rpc("eth_sendTransaction", json!([tx])).await?;
        log::info!("submitted {}, waiting for receipt", hash);
        self.wait_for_receipt(&hash).await
    }
}
