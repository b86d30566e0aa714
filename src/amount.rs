use alloy_primitives::U256;
use std::fmt;
use std::str::FromStr;

use crate::error::{ConsoleError, Result};

/// Smallest units per whole unit (18 decimal places).
pub const SMALLEST_PER_UNIT: u64 = 1_000_000_000_000_000_000;

/// Fractional digits shown to the operator.
pub const DISPLAY_DECIMALS: u32 = 2;

/// A ledger balance or transfer value, kept in smallest units.
///
/// Ordering and equality are on the full-precision integer. The rounded form
/// produced by `Display` is for people only and never flows back into a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct Amount(U256);

impl Amount {
    pub const ZERO: Amount = Amount(U256::ZERO);

    pub fn from_smallest(value: U256) -> Self {
        Amount(value)
    }

    /// Whole units, e.g. `from_units(10_000)` is 10,000 units.
    pub fn from_units(units: u64) -> Self {
        Amount(U256::from(units) * U256::from(SMALLEST_PER_UNIT))
    }

    pub fn smallest(&self) -> U256 {
        self.0
    }

    /// Round half up to `DISPLAY_DECIMALS` digits, in integer arithmetic.
    pub fn display_rounded(&self) -> String {
        let step = U256::from(SMALLEST_PER_UNIT / 10u64.pow(DISPLAY_DECIMALS));
        let half = step / U256::from(2u64);
        let hundredths = self.0.saturating_add(half) / step;
        let divisor = U256::from(10u64.pow(DISPLAY_DECIMALS));
        let whole = hundredths / divisor;
        let frac = (hundredths % divisor).as_limbs()[0];
        format!(
            "{}.{:0width$}",
            whole,
            frac,
            width = DISPLAY_DECIMALS as usize
        )
    }
}

impl FromStr for Amount {
    type Err = ConsoleError;

    /// Parses an integer count of smallest units, decimal or `0x` hex.
    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<U256>()
            .map(Amount)
            .map_err(|e| ConsoleError::decode(format!("amount {:?}", s), e))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_rounded())
    }
}
