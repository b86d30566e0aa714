use crate::ledger::Receipt;

/// Advisory outcome of looking at a mined transaction's receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Ok,
    /// Every unit of supplied gas was consumed, which on older ledgers is what a
    /// revert looks like. Successful gas-heavy calls trip this too.
    SuspectedSilentFailure,
}

impl Verdict {
    pub fn warning(&self, gas_limit: u64) -> Option<String> {
        match self {
            Verdict::Ok => None,
            Verdict::SuspectedSilentFailure => Some(format!(
                "gas used equals the gas limit ({}); the transaction was mined but probably reverted",
                gas_limit
            )),
        }
    }
}

/// Never blocks a workflow; the caller only prints the warning.
pub fn validate(receipt: &Receipt, gas_limit: u64) -> Verdict {
    if receipt.gas_used == gas_limit {
        log::warn!(
            "transaction {} used all {} gas supplied, suspected silent failure",
            receipt.transaction_hash,
            gas_limit
        );
        Verdict::SuspectedSilentFailure
    } else {
        Verdict::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receipt(gas_used: u64) -> Receipt {
        Receipt {
            transaction_hash: "0x01".into(),
            block_number: Some(9),
            gas_used,
            status: None,
        }
    }

    #[test]
    fn exhausted_gas_is_suspect() {
        assert_eq!(
            validate(&receipt(10_000_000), 10_000_000),
            Verdict::SuspectedSilentFailure
        );
        assert!(Verdict::SuspectedSilentFailure.warning(10_000_000).is_some());
    }

    #[test]
    fn partial_gas_is_fine() {
        assert_eq!(validate(&receipt(52_114), 10_000_000), Verdict::Ok);
        assert_eq!(Verdict::Ok.warning(10_000_000), None);
    }
}
