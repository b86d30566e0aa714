use alloy_dyn_abi::{DynSolValue, FunctionExt, JsonAbiExt};
use alloy_json_abi::{Function, JsonAbi};
use alloy_primitives::{hex, Address, U256};
use serde_json::Value;
use std::path::Path;

use crate::decode::RawRecord;
use crate::error::{ConsoleError, Result};

/// Truffle-style build artifact; only the interface is needed.
#[derive(Debug, serde::Deserialize)]
struct Artifact {
    abi: JsonAbi,
}

/// A contract interface description, used to encode calls and to turn return
/// data into raw records.
#[derive(Debug, Clone)]
pub struct ContractBinding {
    name: String,
    abi: JsonAbi,
}

impl ContractBinding {
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            ConsoleError::Config(format!("cannot read interface {}: {}", path.display(), e))
        })?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::from_json(&name, &json)
    }

    pub fn from_json(name: &str, json: &str) -> Result<Self> {
        let artifact: Artifact = serde_json::from_str(json)
            .map_err(|e| ConsoleError::Config(format!("invalid interface {}: {}", name, e)))?;
        Ok(ContractBinding {
            name: name.to_string(),
            abi: artifact.abi,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_function(&self, method: &str) -> bool {
        self.abi.function(method).is_some_and(|f| !f.is_empty())
    }

    fn function(&self, method: &str) -> Result<&Function> {
        self.abi
            .function(method)
            .and_then(|overloads| overloads.first())
            .ok_or_else(|| {
                ConsoleError::Config(format!("{} has no function {}", self.name, method))
            })
    }

    /// Selector followed by the encoded arguments.
    pub fn encode(&self, method: &str, args: &[DynSolValue]) -> Result<Vec<u8>> {
        self.function(method)?
            .abi_encode_input(args)
            .map_err(|e| ConsoleError::decode(format!("{} arguments", method), e))
    }

    /// Decodes return data into the positional-and-named record shape.
    ///
    /// Empty data for a function that declares outputs is how older nodes
    /// report a reverted call, so it is a rejection rather than a decode error.
    pub fn decode(&self, method: &str, data: &[u8]) -> Result<RawRecord> {
        let function = self.function(method)?;
        if data.is_empty() && !function.outputs.is_empty() {
            return Err(ConsoleError::Rejected {
                method: method.to_string(),
                reason: "call returned no data".into(),
            });
        }
        let values = function
            .abi_decode_output(data, true)
            .map_err(|e| ConsoleError::decode(format!("{} output", method), e))?;

        let mut raw = RawRecord::new();
        for (index, value) in values.iter().enumerate() {
            raw.insert(index.to_string(), to_json(value));
        }
        for (param, value) in function.outputs.iter().zip(values.iter()) {
            if !param.name.is_empty() {
                raw.insert(param.name.clone(), to_json(value));
            }
        }
        Ok(raw)
    }
}

fn to_json(value: &DynSolValue) -> Value {
    match value {
        DynSolValue::Bool(b) => Value::Bool(*b),
        DynSolValue::Uint(v, _) => Value::String(v.to_string()),
        DynSolValue::Int(v, _) => Value::String(v.to_string()),
        DynSolValue::Address(a) => Value::String(a.to_checksum(None)),
        DynSolValue::String(s) => Value::String(s.clone()),
        DynSolValue::Bytes(b) => Value::String(hex::encode_prefixed(b)),
        DynSolValue::FixedBytes(word, size) => {
            Value::String(hex::encode_prefixed(&word[..*size]))
        }
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
            Value::Array(items.iter().map(to_json).collect())
        }
        other => Value::String(format!("{:?}", other)),
    }
}

pub fn address_arg(address: &str) -> Result<DynSolValue> {
    address
        .parse::<Address>()
        .map(DynSolValue::Address)
        .map_err(|e| ConsoleError::InvalidArgument {
            name: "address".into(),
            reason: format!("{:?}: {}", address, e),
        })
}

pub fn uint_arg(value: u64) -> DynSolValue {
    DynSolValue::Uint(U256::from(value), 256)
}
