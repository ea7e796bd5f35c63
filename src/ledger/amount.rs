//! Native asset amounts as 7-decimal fixed-point values.

use std::fmt;
use std::io;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::consensus::{self, Decodable, Encodable};

/// Number of indivisible units (stroops) in one whole asset unit.
pub const STROOPS_PER_UNIT: u64 = 10_000_000;

/// An amount of the ledger's native asset, counted in stroops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(u64);

impl Amount {
    /// The zero amount.
    pub const ZERO: Amount = Amount(0);

    /// Create an amount from a raw stroop count.
    pub fn from_stroops(stroops: u64) -> Self {
        Self(stroops)
    }

    /// Create an amount from a count of whole asset units.
    pub fn from_units(units: u64) -> Self {
        Self(units * STROOPS_PER_UNIT)
    }

    /// Return the raw stroop count.
    pub fn as_stroops(&self) -> u64 {
        self.0
    }

    /// Checked addition, `None` on overflow.
    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    /// Checked subtraction, `None` when `other` exceeds `self`.
    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}.{:07}",
            self.0 / STROOPS_PER_UNIT,
            self.0 % STROOPS_PER_UNIT
        )
    }
}

impl FromStr for Amount {
    type Err = consensus::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (units, frac) = match s.split_once('.') {
            Some((units, frac)) => (units, frac),
            None => (s, ""),
        };
        if frac.len() > 7 {
            return Err(consensus::Error::ParseFailed(
                "Amounts carry at most 7 decimal places",
            ));
        }
        let units = units
            .parse::<u64>()
            .map_err(|_| consensus::Error::ParseFailed("Failed parsing amount units"))?;
        let mut stroops = units
            .checked_mul(STROOPS_PER_UNIT)
            .ok_or(consensus::Error::ParseFailed("Amount overflow"))?;
        if !frac.is_empty() {
            let scale = 10u64.pow(7 - frac.len() as u32);
            let frac = frac
                .parse::<u64>()
                .map_err(|_| consensus::Error::ParseFailed("Failed parsing amount fraction"))?;
            stroops = stroops
                .checked_add(frac * scale)
                .ok_or(consensus::Error::ParseFailed("Amount overflow"))?;
        }
        Ok(Amount(stroops))
    }
}

impl Encodable for Amount {
    fn consensus_encode<W: io::Write>(&self, writer: &mut W) -> Result<usize, io::Error> {
        self.0.consensus_encode(writer)
    }
}

impl Decodable for Amount {
    fn consensus_decode<D: io::Read>(d: &mut D) -> Result<Self, consensus::Error> {
        Ok(Amount(Decodable::consensus_decode(d)?))
    }
}

// Amounts travel as decimal strings in JSON, the way ledger APIs report
// balances.
impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
