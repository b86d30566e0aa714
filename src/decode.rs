//! Raw call results come back as a hybrid of positional and named keys that
//! point at the same values (`{"0": .., "status": .., "1": .., "elected": ..}`).
//! `decode` drops the positional half and stringifies the rest; the typed
//! records below are built from that named-only form and nothing else.

use alloy_primitives::U256;
use serde_json::Value;
use std::fmt;

use crate::amount::Amount;
use crate::error::{ConsoleError, Result};
use crate::names::{AccountRole, NameResolver};

pub type RawRecord = serde_json::Map<String, Value>;

/// Named fields of a decoded call result, in ledger order, all as canonical strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let pos = self.fields.iter().position(|(key, _)| key == name)?;
        Some(self.fields.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn required(&self, what: &str, name: &str) -> Result<&str> {
        self.get(name)
            .ok_or_else(|| ConsoleError::decode(what, format!("missing field {}", name)))
    }

    fn take(&mut self, what: &str, name: &str) -> Result<String> {
        self.remove(name)
            .ok_or_else(|| ConsoleError::decode(what, format!("missing field {}", name)))
    }
}

fn is_positional(key: &str) -> bool {
    let digits = key.strip_prefix('-').unwrap_or(key);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Never fails: unknown shapes just lose their positional keys.
pub fn decode(raw: &RawRecord) -> Record {
    let fields = raw
        .iter()
        .filter(|(key, _)| !is_positional(key))
        .map(|(key, value)| (key.clone(), stringify(value)))
        .collect();
    Record { fields }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStatus {
    NoRecord,
    Started,
    Completed,
}

impl CycleStatus {
    pub fn from_code(code: &str) -> Result<Self> {
        match code.trim() {
            "0" => Ok(CycleStatus::NoRecord),
            "1" => Ok(CycleStatus::Started),
            "2" => Ok(CycleStatus::Completed),
            other => Err(ConsoleError::decode("cycle status", format!("unknown code {}", other))),
        }
    }
}

impl fmt::Display for CycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CycleStatus::NoRecord => "NoRecord",
            CycleStatus::Started => "Started",
            CycleStatus::Completed => "Completed",
        };
        f.write_str(name)
    }
}

fn parse_u64(what: &str, field: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|e| ConsoleError::decode(what, format!("{} {:?}: {}", field, value, e)))
}

fn parse_u256(what: &str, field: &str, value: &str) -> Result<U256> {
    value
        .trim()
        .parse::<U256>()
        .map_err(|e| ConsoleError::decode(what, format!("{} {:?}: {}", field, value, e)))
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleRecord {
    pub cycle_id: u64,
    pub status: CycleStatus,
    pub elected: AccountRole,
    pub evicted: AccountRole,
    pub total_payments: Amount,
    pub elected_votes: U256,
    pub eviction_votes: U256,
}

impl CycleRecord {
    pub fn from_record(cycle_id: u64, record: &Record, names: &NameResolver) -> Result<Self> {
        const WHAT: &str = "governance cycle record";
        Ok(CycleRecord {
            cycle_id,
            status: CycleStatus::from_code(record.required(WHAT, "status")?)?,
            elected: names.role(record.required(WHAT, "elected")?),
            evicted: names.role(record.required(WHAT, "evicted")?),
            total_payments: record.required(WHAT, "totalPayments")?.parse()?,
            elected_votes: parse_u256(
                WHAT,
                "electedVotes",
                record.required(WHAT, "electedVotes")?,
            )?,
            eviction_votes: parse_u256(
                WHAT,
                "evictionVotes",
                record.required(WHAT, "evictionVotes")?,
            )?,
        })
    }
}

/// An open promotion/demotion proposal. Fields other than the cycle id are
/// shown as the ledger reports them.
#[derive(Debug, Clone, PartialEq)]
pub struct NomineeBallot {
    pub nominee: AccountRole,
    pub governance_cycle_id: u64,
    pub fields: Record,
}

impl NomineeBallot {
    pub fn from_record(nominee: &str, mut record: Record, names: &NameResolver) -> Result<Self> {
        const WHAT: &str = "nominee ballot";
        let cycle = record.take(WHAT, "governanceCycleId")?;
        record.remove("nominee");
        Ok(NomineeBallot {
            nominee: names.role(nominee),
            governance_cycle_id: parse_u64(WHAT, "governanceCycleId", &cycle)?,
            fields: record,
        })
    }
}

/// A cast vote. Named fields beyond the typed ones (e.g. `governanceCycleId`)
/// are kept as the ledger reports them.
#[derive(Debug, Clone, PartialEq)]
pub struct VoteBallot {
    pub ballot_id: u64,
    pub voter: AccountRole,
    pub voted_for: AccountRole,
    pub amount: Amount,
    pub fields: Record,
}

impl VoteBallot {
    pub fn from_record(ballot_id: u64, mut record: Record, names: &NameResolver) -> Result<Self> {
        const WHAT: &str = "vote ballot";
        let voter = record.take(WHAT, "voter")?;
        let voted_for = record.take(WHAT, "voted_for")?;
        let amount = record.take(WHAT, "amount")?;
        Ok(VoteBallot {
            ballot_id,
            voter: names.role(&voter),
            voted_for: names.role(&voted_for),
            amount: amount.parse()?,
            fields: record,
        })
    }
}

/// One phase of a two-phase withdrawal; `fields` carries the cycle and ballot
/// it releases.
#[derive(Debug, Clone, PartialEq)]
pub struct WithdrawalRecord {
    pub withdrawal_id: u64,
    pub status: CycleStatus,
    pub beneficiary: AccountRole,
    pub amount: Amount,
    pub fields: Record,
}

impl WithdrawalRecord {
    pub fn from_record(
        withdrawal_id: u64,
        mut record: Record,
        names: &NameResolver,
    ) -> Result<Self> {
        const WHAT: &str = "withdrawal record";
        let status = record.take(WHAT, "status")?;
        let beneficiary = record.take(WHAT, "beneficiary")?;
        let amount = record.take(WHAT, "amount")?;
        Ok(WithdrawalRecord {
            withdrawal_id,
            status: CycleStatus::from_code(&status)?,
            beneficiary: names.role(&beneficiary),
            amount: amount.parse()?,
            fields: record,
        })
    }
}

/// Builds the hybrid positional-and-named shape a ledger client hands back.
pub fn hybrid<I, K>(named: I) -> RawRecord
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    let mut raw = RawRecord::new();
    let mut named_fields = Vec::new();
    for (index, (key, value)) in named.into_iter().enumerate() {
        raw.insert(index.to_string(), value.clone());
        named_fields.push((key.into(), value));
    }
    for (key, value) in named_fields {
        raw.insert(key, value);
    }
    raw
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn names() -> NameResolver {
        NameResolver::new(
            "0x627306090abaB3A6e1400e9345bC60c78a8BEf57",
            "0x53fd44c705473ee2d780fe8f5278076f2171ca65",
        )
    }

    #[test]
    fn positional_keys_never_survive() {
        let mut raw = hybrid([
            ("status", json!("2")),
            ("open", json!(true)),
            ("weight", json!(12345678901234567890u64)),
        ]);
        raw.insert("-1".into(), json!("x"));
        raw.insert("007".into(), json!("x"));
        let record = decode(&raw);
        assert_eq!(record.len(), 3);
        assert!(record.iter().all(|(k, _)| k.parse::<i64>().is_err()));
        assert_eq!(record.get("open"), Some("true"));
        assert_eq!(record.get("weight"), Some("12345678901234567890"));
        assert_eq!(record.get("0"), None);
    }

    #[test]
    fn keeps_ledger_field_order() {
        let raw = hybrid([("b", json!("1")), ("a", json!("2"))]);
        let names: Vec<_> = decode(&raw).iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn missing_field_is_omitted_not_an_error() {
        let record = decode(&hybrid([("status", json!("1"))]));
        assert_eq!(record.get("elected"), None);
        assert!(CycleRecord::from_record(1, &record, &names()).is_err());
    }

    #[test]
    fn cycle_record_resolves_names_and_amounts() {
        let raw = hybrid([
            ("status", json!("2")),
            ("elected", json!("0x627306090ABAB3A6E1400E9345BC60C78A8BEF57")),
            ("evicted", json!("0xf9459c4a0385a28163b65a3739f4651b7b8ccc9a")),
            ("totalPayments", json!("1234500000000000000000")),
            ("electedVotes", json!("3")),
            ("evictionVotes", json!("0")),
        ]);
        let cycle = CycleRecord::from_record(3, &decode(&raw), &names()).unwrap();
        assert_eq!(cycle.status, CycleStatus::Completed);
        assert_eq!(cycle.status.to_string(), "Completed");
        assert_eq!(cycle.elected.label(), "LOCAL_ACCT");
        assert_eq!(cycle.evicted.label(), "0xf945...cc9a");
        assert_eq!(cycle.total_payments.display_rounded(), "1234.50");
        assert_eq!(cycle.elected_votes, U256::from(3u64));
    }

    #[test]
    fn unknown_status_code_is_a_decode_error() {
        assert!(CycleStatus::from_code("3").is_err());
        assert_eq!(CycleStatus::from_code("0").unwrap(), CycleStatus::NoRecord);
    }

    #[test]
    fn vote_ballot_keeps_cycle_id() {
        let raw = hybrid([
            ("voter", json!("0x627306090abaB3A6e1400e9345bC60c78a8BEf57")),
            ("voted_for", json!("0x53fd44c705473ee2d780fe8f5278076f2171ca65")),
            ("amount", json!("1764000000000000000000")),
            ("governanceCycleId", json!("7")),
        ]);
        let ballot = VoteBallot::from_record(1, decode(&raw), &names()).unwrap();
        assert_eq!(ballot.voter, AccountRole::LocalOperator);
        assert_eq!(ballot.voted_for, AccountRole::MobileParticipant);
        assert_eq!(ballot.amount.display_rounded(), "1764.00");
        assert_eq!(ballot.fields.get("governanceCycleId"), Some("7"));
        assert_eq!(ballot.fields.len(), 1);
    }

    #[test]
    fn withdrawal_keeps_cycle_and_ballot() {
        let raw = hybrid([
            ("status", json!("1")),
            ("beneficiary", json!("0x627306090abaB3A6e1400e9345bC60c78a8BEf57")),
            ("amount", json!("5")),
            ("governanceCycleId", json!("7")),
            ("ballotId", json!("2")),
        ]);
        let withdrawal = WithdrawalRecord::from_record(1, decode(&raw), &names()).unwrap();
        assert_eq!(withdrawal.status, CycleStatus::Started);
        let extra: Vec<_> = withdrawal.fields.iter().collect();
        assert_eq!(extra, vec![("governanceCycleId", "7"), ("ballotId", "2")]);

        let missing = decode(&hybrid([("status", json!("1"))]));
        assert!(WithdrawalRecord::from_record(1, missing, &names()).is_err());
    }

    #[test]
    fn nominee_ballot_keeps_remaining_fields() {
        let raw = hybrid([
            ("nominee", json!("0x53fd44c705473ee2d780fe8f5278076f2171ca65")),
            ("governanceCycleId", json!("7")),
            ("promote", json!(true)),
        ]);
        let ballot = NomineeBallot::from_record(
            "0x53fd44c705473ee2d780fe8f5278076f2171ca65",
            decode(&raw),
            &names(),
        )
        .unwrap();
        assert_eq!(ballot.nominee, AccountRole::MobileParticipant);
        assert_eq!(ballot.governance_cycle_id, 7);
        assert_eq!(ballot.fields.get("promote"), Some("true"));
        assert_eq!(ballot.fields.get("nominee"), None);
    }
}
