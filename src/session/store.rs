//! Session-scoped wallet cache.
//!
//! The store is owned by the screen that needs it and passed explicitly to the toggle and
//! submission paths. A failed fetch moves it to [`BalanceState::Unknown`]; nothing reads an
//! unknown balance as sufficient.

use std::sync::Arc;
use chrono::{DateTime, Utc};
use tracing::{debug, error, warn};
use crate::client::WalletApi;
use crate::core::balance::WalletBalance;
use crate::core::ledger::WalletStats;
use crate::core::transaction::Transaction;
use crate::error::{Result, WalletError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BalanceState {
    NotLoaded,
    Loaded {
        balance: WalletBalance,
        stats: Option<WalletStats>,
        fetched_at: DateTime<Utc>,
    },
    Unknown {
        reason: WalletError,
    },
}

pub struct WalletStore {
    api: Arc<dyn WalletApi>,
    state: BalanceState,
}

impl std::fmt::Debug for WalletStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletStore").field("state", &self.state).finish()
    }
}

impl WalletStore {
    pub fn new(api: Arc<dyn WalletApi>) -> Self {
        Self {
            api,
            state: BalanceState::NotLoaded,
        }
    }

    pub fn api(&self) -> &Arc<dyn WalletApi> {
        &self.api
    }

    pub fn state(&self) -> &BalanceState {
        &self.state
    }

    /// Re-fetches the balance and returns its total value. On failure the cache becomes
    /// `Unknown` and the error is returned unchanged.
    pub async fn refresh(&mut self) -> Result<u64> {
        match self.api.get_wallet().await {
            Ok(snapshot) => {
                let total = snapshot.balance.total_value();
                debug!(total, "wallet balance refreshed");
                self.state = BalanceState::Loaded {
                    balance: snapshot.balance,
                    stats: snapshot.stats,
                    fetched_at: Utc::now(),
                };
                Ok(total)
            }
            Err(e) => {
                if e.is_transient() {
                    warn!("wallet balance unavailable: {}", e);
                } else {
                    error!("wallet balance rejected: {}", e);
                }
                self.state = BalanceState::Unknown { reason: e.clone() };
                Err(e)
            }
        }
    }

    /// Drops the cached balance. Paid toggles stay blocked until the next `refresh`.
    pub fn invalidate(&mut self) {
        self.state = BalanceState::NotLoaded;
    }

    pub fn balance(&self) -> Result<&WalletBalance> {
        match &self.state {
            BalanceState::Loaded { balance, .. } => Ok(balance),
            BalanceState::NotLoaded => Err(WalletError::BalanceUnknown("balance not loaded".to_string())),
            BalanceState::Unknown { reason } => Err(WalletError::BalanceUnknown(reason.to_string())),
        }
    }

    /// Stats reported with the cached balance, if the server sent any.
    pub fn stats(&self) -> Option<&WalletStats> {
        match &self.state {
            BalanceState::Loaded { stats, .. } => stats.as_ref(),
            _ => None,
        }
    }

    /// Total value of the cached balance, recomputed from the quantities.
    pub fn available_value(&self) -> Result<u64> {
        self.balance().map(WalletBalance::total_value)
    }

    pub async fn transactions(&self, limit: usize) -> Result<Vec<Transaction>> {
        self.api.get_transactions(limit).await
    }
}
