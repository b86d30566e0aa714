use std::fmt;

pub const LOCAL_ACCT: &str = "LOCAL_ACCT";
pub const MOBILE_ACCT: &str = "MOBILE_ACCT";

/// Length of a canonical `0x`-prefixed account address.
pub const ADDRESS_LEN: usize = 42;

/// What the ledger reports for an address slot that was never written.
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Which of the monitored accounts an address is, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountRole {
    LocalOperator,
    MobileParticipant,
    Other(String),
}

impl AccountRole {
    pub fn label(&self) -> String {
        match self {
            AccountRole::LocalOperator => LOCAL_ACCT.to_string(),
            AccountRole::MobileParticipant => MOBILE_ACCT.to_string(),
            AccountRole::Other(address) => truncate_address(address),
        }
    }
}

impl fmt::Display for AccountRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// `0x53fd...ca65` for canonical addresses; anything else is returned untouched.
pub fn truncate_address(address: &str) -> String {
    if address.len() == ADDRESS_LEN && address.is_ascii() {
        format!("{}...{}", &address[..6], &address[ADDRESS_LEN - 4..])
    } else {
        address.to_string()
    }
}

pub fn is_zero_address(address: &str) -> bool {
    let digits = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .unwrap_or(address);
    !digits.is_empty() && digits.bytes().all(|b| b == b'0')
}

/// Maps raw addresses onto the two monitored accounts.
#[derive(Debug, Clone)]
pub struct NameResolver {
    local: String,
    mobile: String,
}

impl NameResolver {
    pub fn new(local: &str, mobile: &str) -> Self {
        NameResolver {
            local: local.to_lowercase(),
            mobile: mobile.to_lowercase(),
        }
    }

    pub fn role(&self, address: &str) -> AccountRole {
        let lowered = address.to_lowercase();
        if lowered == self.mobile {
            AccountRole::MobileParticipant
        } else if lowered == self.local {
            AccountRole::LocalOperator
        } else {
            AccountRole::Other(address.to_string())
        }
    }

    pub fn resolve(&self, address: &str) -> String {
        self.role(address).label()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCAL: &str = "0x627306090abaB3A6e1400e9345bC60c78a8BEf57";
    const MOBILE: &str = "0x53fd44c705473ee2d780fe8f5278076f2171ca65";

    #[test]
    fn resolves_case_insensitively() {
        let resolver = NameResolver::new(LOCAL, MOBILE);
        for addr in [LOCAL, MOBILE] {
            let name = resolver.resolve(addr);
            assert_eq!(resolver.resolve(&addr.to_uppercase()), name);
            assert_eq!(resolver.resolve(&addr.to_lowercase()), name);
            assert_eq!(resolver.resolve(&name), resolver.resolve(&name));
        }
        assert_eq!(resolver.resolve(LOCAL), LOCAL_ACCT);
        assert_eq!(resolver.resolve(MOBILE), MOBILE_ACCT);
    }

    #[test]
    fn truncates_only_canonical_addresses() {
        let resolver = NameResolver::new(LOCAL, MOBILE);
        assert_eq!(
            resolver.resolve("0xf9459c4a0385a28163b65a3739f4651b7b8ccc9a"),
            "0xf945...cc9a"
        );
        assert_eq!(resolver.resolve("0x1234"), "0x1234");
        assert_eq!(resolver.resolve(""), "");
    }

    #[test]
    fn zero_address_detection() {
        assert!(is_zero_address(ZERO_ADDRESS));
        assert!(is_zero_address("0X0000000000000000000000000000000000000000"));
        assert!(!is_zero_address(MOBILE));
        assert!(!is_zero_address("0x"));
    }

    #[test]
    fn mobile_wins_when_both_configured_alike() {
        let resolver = NameResolver::new(MOBILE, MOBILE);
        assert_eq!(resolver.role(MOBILE), AccountRole::MobileParticipant);
    }
}
