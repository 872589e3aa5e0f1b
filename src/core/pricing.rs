//! Promotion pricing: cumulative cost of the paid feature flags on a job posting.
//!
//! **Model:** `cost = Σ policy.cost_of(flag)` over every enabled flag. The cost is always
//! recomputed from the complete flag state; there is no "previous cost + delta" path, so a
//! price change between two toggles can never make the total drift.
//!
//! Prices come from an injected [`PricingPolicy`]. [`PriceTable`] carries the displayed
//! prices; [`PendingAdminPricing`] is the all-zero policy used while admin pricing is not
//! configured. Swapping one for the other touches neither the validator nor the toggle protocol.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use crate::core::denomination::CoinDenomination;
use crate::error::{Result, WalletError};

/// Displayed price of the Featured promotion, in QAR.
pub const DEFAULT_FEATURED_COST: u64 = 50;

/// Displayed price of the Boost promotion, in QAR.
pub const DEFAULT_BOOST_COST: u64 = 100;

/// A paid promotion feature on a job posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromotionFlag {
    Featured,
    Boost,
}

impl PromotionFlag {
    pub const ALL: [PromotionFlag; 2] = [PromotionFlag::Featured, PromotionFlag::Boost];
}

impl fmt::Display for PromotionFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromotionFlag::Featured => f.write_str("featured"),
            PromotionFlag::Boost => f.write_str("boost"),
        }
    }
}

/// Complete promotion flag state of one job draft.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionFlags {
    pub featured: bool,
    pub boost: bool,
}

impl PromotionFlags {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn get(&self, flag: PromotionFlag) -> bool {
        match flag {
            PromotionFlag::Featured => self.featured,
            PromotionFlag::Boost => self.boost,
        }
    }

    pub fn set(&mut self, flag: PromotionFlag, enabled: bool) {
        match flag {
            PromotionFlag::Featured => self.featured = enabled,
            PromotionFlag::Boost => self.boost = enabled,
        }
    }

    /// Copy of these flags with one flag changed.
    pub fn with(mut self, flag: PromotionFlag, enabled: bool) -> Self {
        self.set(flag, enabled);
        self
    }

    pub fn enabled(&self) -> impl Iterator<Item = PromotionFlag> + '_ {
        PromotionFlag::ALL.into_iter().filter(move |f| self.get(*f))
    }

    pub fn any(&self) -> bool {
        self.featured || self.boost
    }
}

/// Source of per-flag prices in the canonical unit.
pub trait PricingPolicy: Send + Sync + fmt::Debug {
    fn cost_of(&self, flag: PromotionFlag) -> u64;
}

/// Fixed price table, defaulting to the displayed prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceTable {
    pub featured: u64,
    pub boost: u64,
}

impl Default for PriceTable {
    fn default() -> Self {
        Self {
            featured: DEFAULT_FEATURED_COST,
            boost: DEFAULT_BOOST_COST,
        }
    }
}

impl PriceTable {
    /// Builds a table whose every price can be settled in catalog coins.
    pub fn new(featured: u64, boost: u64) -> Result<Self> {
        for (flag, price) in [(PromotionFlag::Featured, featured), (PromotionFlag::Boost, boost)] {
            if !CoinDenomination::is_representable(price) {
                return Err(WalletError::InvalidAmount(format!(
                    "{} price {} is not a multiple of {}",
                    flag,
                    price,
                    CoinDenomination::smallest_value()
                )));
            }
        }
        Ok(Self { featured, boost })
    }
}

impl PricingPolicy for PriceTable {
    fn cost_of(&self, flag: PromotionFlag) -> u64 {
        match flag {
            PromotionFlag::Featured => self.featured,
            PromotionFlag::Boost => self.boost,
        }
    }
}

/// Every promotion is free until admin pricing is configured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingAdminPricing;

impl PricingPolicy for PendingAdminPricing {
    fn cost_of(&self, _flag: PromotionFlag) -> u64 {
        0
    }
}

/// Computes the total promotion cost of a flag set against the injected policy.
#[derive(Debug, Clone)]
pub struct PromotionCostCalculator {
    policy: Arc<dyn PricingPolicy>,
}

impl PromotionCostCalculator {
    pub fn new(policy: Arc<dyn PricingPolicy>) -> Self {
        Self { policy }
    }

    pub fn with_price_table(table: PriceTable) -> Self {
        Self::new(Arc::new(table))
    }

    /// Total cost of every enabled flag. Must be given the complete current flag state.
    pub fn total_cost(&self, flags: &PromotionFlags) -> u64 {
        flags
            .enabled()
            .map(|f| self.policy.cost_of(f))
            .fold(0u64, |acc, c| acc.saturating_add(c))
    }

    pub fn cost_of(&self, flag: PromotionFlag) -> u64 {
        self.policy.cost_of(flag)
    }

    pub fn policy(&self) -> &Arc<dyn PricingPolicy> {
        &self.policy
    }
}

impl Default for PromotionCostCalculator {
    fn default() -> Self {
        Self::with_price_table(PriceTable::default())
    }
}
