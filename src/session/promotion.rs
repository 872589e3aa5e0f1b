//! Promotion toggles on a job draft.
//!
//! Each flag moves `Off -> Validating -> On` when the cached balance covers the new cumulative
//! cost, or falls back to `Off` with a recoverable rejection. `On -> Off` never validates.
//! The cost checked is always the total of the full flag state after the toggle.

use tracing::{debug, info};
use crate::core::pricing::{PromotionCostCalculator, PromotionFlag, PromotionFlags};
use crate::core::validator::{ensure_sufficient, validate, BalanceCheck};
use crate::error::{Result, WalletError};
use crate::session::store::WalletStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ToggleState {
    #[default]
    Off,
    Validating,
    On,
}

/// What the UI should offer after a rejected toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    PurchaseCoins,
    RetryBalanceFetch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleRejection {
    pub flag: PromotionFlag,
    /// `InsufficientBalance` or `BalanceUnknown`.
    pub error: WalletError,
    pub action: RecoveryAction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    Enabled { required_cost: u64 },
    Disabled { required_cost: u64 },
    Rejected(ToggleRejection),
}

impl ToggleOutcome {
    pub fn required_cost(&self) -> Option<u64> {
        match self {
            ToggleOutcome::Enabled { required_cost } | ToggleOutcome::Disabled { required_cost } => {
                Some(*required_cost)
            }
            ToggleOutcome::Rejected(_) => None,
        }
    }
}

/// Promotion section of the job posting form.
#[derive(Debug, Clone)]
pub struct PromotionForm {
    flags: PromotionFlags,
    featured: ToggleState,
    boost: ToggleState,
    calculator: PromotionCostCalculator,
}

impl PromotionForm {
    pub fn new(calculator: PromotionCostCalculator) -> Self {
        Self {
            flags: PromotionFlags::none(),
            featured: ToggleState::Off,
            boost: ToggleState::Off,
            calculator,
        }
    }

    pub fn flags(&self) -> PromotionFlags {
        self.flags
    }

    pub fn toggle_state(&self, flag: PromotionFlag) -> ToggleState {
        match flag {
            PromotionFlag::Featured => self.featured,
            PromotionFlag::Boost => self.boost,
        }
    }

    fn set_state(&mut self, flag: PromotionFlag, state: ToggleState) {
        match flag {
            PromotionFlag::Featured => self.featured = state,
            PromotionFlag::Boost => self.boost = state,
        }
    }

    /// Cumulative cost of the currently enabled flags.
    pub fn get_promotion_cost(&self) -> u64 {
        self.calculator.total_cost(&self.flags)
    }

    pub fn get_wallet_value(&self, store: &WalletStore) -> Result<u64> {
        store.available_value()
    }

    /// Checks the current flag state against the cached balance.
    pub fn validate_balance(&self, store: &WalletStore) -> Result<BalanceCheck> {
        let required = self.get_promotion_cost();
        if required == 0 {
            return Ok(validate(0, store.available_value().unwrap_or(0)));
        }
        Ok(validate(required, store.available_value()?))
    }

    /// Handles a press on `flag`, whose value before the press is `current_value`.
    pub fn handle_promotion_toggle(
        &mut self,
        flag: PromotionFlag,
        current_value: bool,
        store: &WalletStore,
    ) -> ToggleOutcome {
        if current_value {
            self.flags.set(flag, false);
            self.set_state(flag, ToggleState::Off);
            let required_cost = self.get_promotion_cost();
            debug!(%flag, required_cost, "promotion disabled");
            return ToggleOutcome::Disabled { required_cost };
        }

        self.set_state(flag, ToggleState::Validating);
        let proposed = self.flags.with(flag, true);
        let required = self.calculator.total_cost(&proposed);

        let rejection = match store.available_value() {
            Ok(available) => ensure_sufficient(required, available).err().map(|error| ToggleRejection {
                flag,
                error,
                action: RecoveryAction::PurchaseCoins,
            }),
            // Free promotions never need a balance.
            Err(_) if required == 0 => None,
            Err(e) => Some(ToggleRejection {
                flag,
                error: e,
                action: RecoveryAction::RetryBalanceFetch,
            }),
        };

        match rejection {
            None => {
                self.flags = proposed;
                self.set_state(flag, ToggleState::On);
                info!(%flag, required_cost = required, "promotion enabled");
                ToggleOutcome::Enabled { required_cost: required }
            }
            Some(rejection) => {
                self.flags.set(flag, false);
                self.set_state(flag, ToggleState::Off);
                info!(%flag, required, "promotion rejected: {}", rejection.error);
                ToggleOutcome::Rejected(rejection)
            }
        }
    }
}

impl Default for PromotionForm {
    fn default() -> Self {
        Self::new(PromotionCostCalculator::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::core::balance::WalletBalance;
    use crate::core::denomination::CoinDenomination;
    use crate::core::pricing::PendingAdminPricing;
    use crate::session::testing::ScriptedApi;

    async fn loaded(balance: WalletBalance) -> WalletStore {
        let mut store = WalletStore::new(Arc::new(ScriptedApi::with_balance(balance)));
        store.refresh().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_featured_then_boost_is_cumulative() {
        let store = loaded(WalletBalance::new().with(CoinDenomination::GPC, 1)).await;
        let mut form = PromotionForm::default();

        let featured = form.handle_promotion_toggle(PromotionFlag::Featured, false, &store);
        assert_eq!(featured, ToggleOutcome::Enabled { required_cost: 50 });

        // 100 available covers Boost alone but not Featured + Boost
        let boost = form.handle_promotion_toggle(PromotionFlag::Boost, false, &store);
        match boost {
            ToggleOutcome::Rejected(rejection) => {
                assert_eq!(rejection.action, RecoveryAction::PurchaseCoins);
                assert_eq!(
                    rejection.error,
                    WalletError::InsufficientBalance { required: 150, available: 100, shortfall: 50 }
                );
            }
            other => panic!("expected rejection, got {:?}", other),
        }
        assert_eq!(form.toggle_state(PromotionFlag::Boost), ToggleState::Off);
        assert_eq!(form.toggle_state(PromotionFlag::Featured), ToggleState::On);
        assert_eq!(form.get_promotion_cost(), 50);
    }

    #[tokio::test]
    async fn test_disable_always_allowed() {
        let store = loaded(WalletBalance::new().with(CoinDenomination::GDC, 1)).await;
        let mut form = PromotionForm::default();
        form.handle_promotion_toggle(PromotionFlag::Featured, false, &store);
        form.handle_promotion_toggle(PromotionFlag::Boost, false, &store);
        assert_eq!(form.get_promotion_cost(), 150);

        // Even with the balance gone, turning off never validates
        let mut empty = loaded(WalletBalance::new()).await;
        empty.invalidate();
        let outcome = form.handle_promotion_toggle(PromotionFlag::Boost, true, &empty);
        assert_eq!(outcome, ToggleOutcome::Disabled { required_cost: 50 });
        assert_eq!(form.toggle_state(PromotionFlag::Boost), ToggleState::Off);
    }

    #[tokio::test]
    async fn test_reenable_uses_current_cost() {
        let store = loaded(WalletBalance::new().with(CoinDenomination::GDC, 1)).await;
        let mut form = PromotionForm::default();
        form.handle_promotion_toggle(PromotionFlag::Featured, false, &store);
        form.handle_promotion_toggle(PromotionFlag::Boost, false, &store);
        form.handle_promotion_toggle(PromotionFlag::Boost, true, &store);
        let outcome = form.handle_promotion_toggle(PromotionFlag::Boost, false, &store);
        assert_eq!(outcome, ToggleOutcome::Enabled { required_cost: 150 });
    }

    #[tokio::test]
    async fn test_unknown_balance_blocks_enable() {
        let api = ScriptedApi::failing(WalletError::Network("timeout".to_string()));
        let mut store = WalletStore::new(Arc::new(api));
        assert!(store.refresh().await.is_err());

        let mut form = PromotionForm::default();
        match form.handle_promotion_toggle(PromotionFlag::Featured, false, &store) {
            ToggleOutcome::Rejected(rejection) => {
                assert_eq!(rejection.action, RecoveryAction::RetryBalanceFetch);
                assert!(matches!(rejection.error, WalletError::BalanceUnknown(_)));
            }
            other => panic!("expected rejection, got {:?}", other),
        }
        assert!(!form.flags().featured);
    }

    #[tokio::test]
    async fn test_empty_wallet() {
        let store = loaded(WalletBalance::new()).await;
        let mut form = PromotionForm::default();
        assert!(form.validate_balance(&store).unwrap().valid);
        let outcome = form.handle_promotion_toggle(PromotionFlag::Featured, false, &store);
        assert!(matches!(outcome, ToggleOutcome::Rejected(_)));
        assert_eq!(form.get_wallet_value(&store).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_zero_pricing_needs_no_balance() {
        let store = WalletStore::new(Arc::new(ScriptedApi::with_balance(WalletBalance::new())));
        let mut form = PromotionForm::new(PromotionCostCalculator::new(Arc::new(PendingAdminPricing)));
        let outcome = form.handle_promotion_toggle(PromotionFlag::Boost, false, &store);
        assert_eq!(outcome, ToggleOutcome::Enabled { required_cost: 0 });
        assert!(form.validate_balance(&store).unwrap().valid);
    }
}
