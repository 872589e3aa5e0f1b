//! Coin catalog: the closed set of coin denominations and their canonical value in QAR.
//!
//! This module is the only place conversion rates are defined. Every other component asks
//! [`CoinDenomination::canonical_value`] (or [`canonical_value_of`] for raw symbols) instead of
//! hardcoding a rate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::error::{Result, WalletError};

/// Coin tier. Ordering follows canonical value (Bronze lowest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CoinDenomination {
    /// Bronze, 5 QAR.
    GBC,
    /// Silver, 10 QAR.
    GSC,
    /// Gold, 50 QAR.
    GGC,
    /// Platinum, 100 QAR.
    GPC,
    /// Diamond, 200 QAR.
    GDC,
    /// Royal, 500 QAR.
    GRC,
}

impl CoinDenomination {
    /// Full catalog, ascending by canonical value.
    pub const ALL: [CoinDenomination; 6] = [
        CoinDenomination::GBC,
        CoinDenomination::GSC,
        CoinDenomination::GGC,
        CoinDenomination::GPC,
        CoinDenomination::GDC,
        CoinDenomination::GRC,
    ];

    /// Value of one coin in the canonical unit (QAR). Always > 0.
    pub const fn canonical_value(&self) -> u64 {
        match self {
            CoinDenomination::GBC => 5,
            CoinDenomination::GSC => 10,
            CoinDenomination::GGC => 50,
            CoinDenomination::GPC => 100,
            CoinDenomination::GDC => 200,
            CoinDenomination::GRC => 500,
        }
    }

    pub const fn symbol(&self) -> &'static str {
        match self {
            CoinDenomination::GBC => "GBC",
            CoinDenomination::GSC => "GSC",
            CoinDenomination::GGC => "GGC",
            CoinDenomination::GPC => "GPC",
            CoinDenomination::GDC => "GDC",
            CoinDenomination::GRC => "GRC",
        }
    }

    pub const fn display_name(&self) -> &'static str {
        match self {
            CoinDenomination::GBC => "Bronze",
            CoinDenomination::GSC => "Silver",
            CoinDenomination::GGC => "Gold",
            CoinDenomination::GPC => "Platinum",
            CoinDenomination::GDC => "Diamond",
            CoinDenomination::GRC => "Royal",
        }
    }

    /// Smallest canonical value in the catalog. Every representable amount is a multiple of it.
    pub const fn smallest_value() -> u64 {
        CoinDenomination::GBC.canonical_value()
    }

    /// Whether `amount` can be paid out of catalog coins.
    pub const fn is_representable(amount: u64) -> bool {
        amount % Self::smallest_value() == 0
    }
}

impl FromStr for CoinDenomination {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self> {
        CoinDenomination::ALL
            .iter()
            .copied()
            .find(|d| d.symbol() == s)
            .ok_or_else(|| WalletError::UnknownDenomination(s.to_string()))
    }
}

impl TryFrom<String> for CoinDenomination {
    type Error = WalletError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<CoinDenomination> for String {
    fn from(d: CoinDenomination) -> Self {
        d.symbol().to_string()
    }
}

impl fmt::Display for CoinDenomination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Canonical value of a raw symbol. Fails with `UnknownDenomination` for symbols outside the catalog.
pub fn canonical_value_of(symbol: &str) -> Result<u64> {
    symbol.parse::<CoinDenomination>().map(|d| d.canonical_value())
}
