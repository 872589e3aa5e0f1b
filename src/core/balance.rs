//! Wallet balances and value aggregation.
//!
//! A [`WalletBalance`] holds coin quantities only. Its total value is never stored: it is
//! recomputed from the quantity map by [`total_value`] every time it is needed, so a cached
//! balance can never carry a stale total.
//!
//! Also hosts the change planner used by ledger debits: a debit is expressed in canonical
//! value, and [`plan_debit`] decides which coins leave the wallet and which come back as change.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use crate::core::denomination::CoinDenomination;
use crate::core::validator::{ensure_debitable, ensure_sufficient};
use crate::error::{Result, WalletError};

/// Per-denomination coin quantities. Absent denominations hold zero coins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletBalance {
    quantities: BTreeMap<CoinDenomination, u64>,
}

impl WalletBalance {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a balance from raw `symbol -> quantity` pairs, as returned by the wallet endpoint.
    pub fn from_symbols<'a, I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, u64)>,
    {
        let mut balance = Self::new();
        for (symbol, qty) in entries {
            let denomination: CoinDenomination = symbol.parse()?;
            balance.add(denomination, qty)?;
        }
        Ok(balance)
    }

    /// Builder-style helper for fixtures. The quantity is capped at `u64::MAX`.
    pub fn with(mut self, denomination: CoinDenomination, qty: u64) -> Self {
        if qty > 0 {
            let entry = self.quantities.entry(denomination).or_insert(0);
            *entry = entry.saturating_add(qty);
        }
        self
    }

    pub fn quantity(&self, denomination: CoinDenomination) -> u64 {
        self.quantities.get(&denomination).copied().unwrap_or(0)
    }

    /// Non-zero holdings in ascending denomination order.
    pub fn iter(&self) -> impl Iterator<Item = (CoinDenomination, u64)> + '_ {
        self.quantities
            .iter()
            .filter(|(_, qty)| **qty > 0)
            .map(|(d, qty)| (*d, *qty))
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn total_value(&self) -> u64 {
        total_value(self)
    }

    pub(crate) fn add(&mut self, denomination: CoinDenomination, qty: u64) -> Result<()> {
        if qty == 0 {
            return Ok(());
        }
        let entry = self.quantities.entry(denomination).or_insert(0);
        *entry = entry.checked_add(qty).ok_or_else(|| {
            WalletError::InvalidAmount(format!("{} quantity out of range", denomination))
        })?;
        Ok(())
    }

    /// Applies signed per-denomination deltas. Fails without modifying the balance if any
    /// quantity would go negative.
    pub(crate) fn apply_deltas(&mut self, deltas: &BTreeMap<CoinDenomination, i64>) -> Result<()> {
        let mut next = self.quantities.clone();
        for (denomination, delta) in deltas {
            let current = next.get(denomination).copied().unwrap_or(0);
            let updated = if *delta >= 0 {
                current.checked_add(delta.unsigned_abs())
            } else {
                current.checked_sub(delta.unsigned_abs())
            };
            match updated {
                Some(0) => {
                    next.remove(denomination);
                }
                Some(qty) => {
                    next.insert(*denomination, qty);
                }
                None => {
                    return Err(WalletError::InvalidAmount(format!(
                        "applying {} {} to a holding of {} would go negative",
                        delta, denomination, current
                    )));
                }
            }
        }
        self.quantities = next;
        Ok(())
    }
}

/// Total canonical value of a balance: Σ quantity × canonical value. Empty balances are worth 0.
pub fn total_value(balance: &WalletBalance) -> u64 {
    balance
        .iter()
        .map(|(d, qty)| qty.saturating_mul(d.canonical_value()))
        .fold(0u64, |acc, v| acc.saturating_add(v))
}

/// Decomposes a value into catalog coins, largest first. `value` must be a multiple of the
/// smallest denomination.
fn decompose(mut value: u64) -> BTreeMap<CoinDenomination, u64> {
    let mut coins = BTreeMap::new();
    for d in CoinDenomination::ALL.iter().rev() {
        let n = value / d.canonical_value();
        if n > 0 {
            coins.insert(*d, n);
            value -= n * d.canonical_value();
        }
    }
    coins
}

/// Plans the net per-denomination deltas for debiting `amount` from `balance`.
///
/// Coins are taken largest-first without overshooting the amount. If a remainder is left,
/// the smallest held coin larger than the remainder is broken and the difference is returned
/// as change, itself decomposed largest-first. The plan is deterministic for a given balance
/// and amount, and never takes more coins of a denomination than are held.
pub fn plan_debit(balance: &WalletBalance, amount: u64) -> Result<BTreeMap<CoinDenomination, i64>> {
    ensure_debitable(amount)?;
    ensure_sufficient(amount, total_value(balance))?;

    let mut taken: BTreeMap<CoinDenomination, u64> = BTreeMap::new();
    let mut remaining = amount;
    for d in CoinDenomination::ALL.iter().rev() {
        let held = balance.quantity(*d);
        let n = held.min(remaining / d.canonical_value());
        if n > 0 {
            taken.insert(*d, n);
            remaining -= n * d.canonical_value();
        }
    }

    let mut change = BTreeMap::new();
    if remaining > 0 {
        // Some denomination still has coins left whose value exceeds the remainder,
        // otherwise the total would have been below `amount`.
        let breakable = CoinDenomination::ALL
            .iter()
            .copied()
            .find(|d| {
                d.canonical_value() > remaining
                    && balance.quantity(*d) > taken.get(d).copied().unwrap_or(0)
            })
            .ok_or_else(|| {
                WalletError::InvalidAmount(format!("no coin available to make change for {}", amount))
            })?;
        *taken.entry(breakable).or_insert(0) += 1;
        change = decompose(breakable.canonical_value() - remaining);
    }

    let mut deltas: BTreeMap<CoinDenomination, i64> = BTreeMap::new();
    for (d, n) in taken {
        *deltas.entry(d).or_insert(0) -= n as i64;
    }
    for (d, n) in change {
        *deltas.entry(d).or_insert(0) += n as i64;
    }
    deltas.retain(|_, v| *v != 0);
    Ok(deltas)
}

/// Canonical value represented by a set of signed deltas.
pub fn deltas_value(deltas: &BTreeMap<CoinDenomination, i64>) -> i64 {
    deltas
        .iter()
        .map(|(d, n)| n * d.canonical_value() as i64)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use CoinDenomination::*;

    #[test]
    fn test_total_value_empty() {
        assert_eq!(total_value(&WalletBalance::new()), 0);
    }

    #[test]
    fn test_total_value_sum() {
        let b = WalletBalance::new().with(GPC, 1).with(GGC, 1).with(GSC, 2);
        assert_eq!(total_value(&b), 100 + 50 + 20);

        let all = CoinDenomination::ALL
            .iter()
            .fold(WalletBalance::new(), |b, d| b.with(*d, 3));
        let expected: u64 = CoinDenomination::ALL.iter().map(|d| 3 * d.canonical_value()).sum();
        assert_eq!(all.total_value(), expected);
    }

    #[test]
    fn test_zero_quantities_contribute_nothing() {
        let b = WalletBalance::from_symbols(vec![("GPC", 0), ("GBC", 2)]).unwrap();
        assert_eq!(b.total_value(), 10);
        assert_eq!(b.quantity(GPC), 0);
        assert_eq!(b.iter().count(), 1);
    }

    #[test]
    fn test_from_symbols_quantity_overflow() {
        let err = WalletBalance::from_symbols([("GBC", u64::MAX), ("GBC", 1)]).unwrap_err();
        assert!(matches!(err, WalletError::InvalidAmount(_)), "got {:?}", err);
        let repeated = WalletBalance::from_symbols([("GBC", 2), ("GBC", 3)]).unwrap();
        assert_eq!(repeated.quantity(GBC), 5);
    }

    #[test]
    fn test_from_symbols_unknown() {
        let err = WalletBalance::from_symbols(vec![("GPC", 1), ("ABC", 1)]).unwrap_err();
        assert_eq!(err, WalletError::UnknownDenomination("ABC".to_string()));
    }

    #[test]
    fn test_plan_exact_coins() {
        let b = WalletBalance::new().with(GPC, 1).with(GGC, 1);
        let plan = plan_debit(&b, 150).unwrap();
        assert_eq!(plan.get(&GPC), Some(&-1));
        assert_eq!(plan.get(&GGC), Some(&-1));
        assert_eq!(deltas_value(&plan), -150);
    }

    #[test]
    fn test_plan_breaks_coin_for_change() {
        let b = WalletBalance::new().with(GPC, 1);
        let plan = plan_debit(&b, 50).unwrap();
        // One Platinum out, one Gold back as change
        assert_eq!(plan.get(&GPC), Some(&-1));
        assert_eq!(plan.get(&GGC), Some(&1));
        assert_eq!(deltas_value(&plan), -50);
    }

    #[test]
    fn test_plan_breaks_smallest_sufficient_coin() {
        let b = WalletBalance::new().with(GRC, 1).with(GGC, 1).with(GSC, 1);
        // 10 + 50 cannot cover 70 without breaking; the Royal coin is the only candidate
        let plan = plan_debit(&b, 70).unwrap();
        assert_eq!(deltas_value(&plan), -70);
        let mut after = b.clone();
        after.apply_deltas(&plan).unwrap();
        assert_eq!(after.total_value(), b.total_value() - 70);
    }

    #[test]
    fn test_plan_never_negative() {
        let b = WalletBalance::new().with(GBC, 3).with(GDC, 2).with(GSC, 1);
        for amount in (5..=b.total_value()).step_by(5) {
            let plan = plan_debit(&b, amount).unwrap();
            let mut after = b.clone();
            after.apply_deltas(&plan).unwrap();
            assert_eq!(after.total_value(), b.total_value() - amount, "amount {}", amount);
        }
    }

    #[test]
    fn test_plan_rejects_bad_amounts() {
        let b = WalletBalance::new().with(GPC, 1);
        assert!(matches!(plan_debit(&b, 0), Err(WalletError::InvalidAmount(_))));
        assert!(matches!(plan_debit(&b, 7), Err(WalletError::InvalidAmount(_))));
        assert_eq!(
            plan_debit(&b, 150).unwrap_err(),
            WalletError::InsufficientBalance { required: 150, available: 100, shortfall: 50 }
        );
    }

    #[test]
    fn test_apply_deltas_is_atomic() {
        let mut b = WalletBalance::new().with(GGC, 1).with(GBC, 1);
        let mut deltas = BTreeMap::new();
        deltas.insert(GBC, -1);
        deltas.insert(GGC, -2);
        assert!(b.apply_deltas(&deltas).is_err());
        assert_eq!(b.quantity(GBC), 1);
        assert_eq!(b.quantity(GGC), 1);
    }
}
