//! Wallet API boundary consumed by the session layer.
//!
//! [`WalletApi`] is the only way the client side learns about holdings. Two implementations
//! exist: [`HttpWalletClient`] talks to the coin backend, [`LocalWalletApi`] reads an in-process
//! [`TransactionLedger`](crate::core::ledger::TransactionLedger).

pub mod http;
pub mod local;

pub use http::HttpWalletClient;
pub use local::LocalWalletApi;

use std::collections::BTreeMap;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use crate::core::balance::WalletBalance;
use crate::core::ledger::WalletStats;
use crate::core::transaction::Transaction;
use crate::core::validator::BalanceCheckResponse;
use crate::error::Result;

/// Holdings plus the aggregates the wallet endpoint reports next to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletSnapshot {
    pub balance: WalletBalance,
    pub stats: Option<WalletStats>,
}

#[async_trait]
pub trait WalletApi: Send + Sync {
    /// Current holdings and stats. Failure means the balance is unknown, never that it is
    /// sufficient.
    async fn get_wallet(&self) -> Result<WalletSnapshot>;

    async fn get_balance(&self) -> Result<WalletBalance> {
        Ok(self.get_wallet().await?.balance)
    }

    /// Transaction history, newest first.
    async fn get_transactions(&self, limit: usize) -> Result<Vec<Transaction>>;

    /// Authoritative affordability check, called immediately before a paid action.
    async fn check_balance(&self, amount: u64) -> Result<BalanceCheckResponse>;
}

/// Body of `GET /coins/wallet`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletResponse {
    pub balances: BTreeMap<String, u64>,
    /// Informational only; the total is recomputed from `balances`.
    #[serde(rename = "totalValueQAR", default, skip_serializing_if = "Option::is_none")]
    pub total_value_qar: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<WalletStats>,
}

impl WalletResponse {
    pub fn from_balance(balance: &WalletBalance, stats: Option<WalletStats>) -> Self {
        Self {
            balances: balance
                .iter()
                .map(|(d, qty)| (d.symbol().to_string(), qty))
                .collect(),
            total_value_qar: Some(balance.total_value()),
            stats,
        }
    }

    pub fn into_balance(self) -> Result<WalletBalance> {
        self.into_snapshot().map(|snapshot| snapshot.balance)
    }

    /// Parses the symbol map. An unrecognised symbol fails the whole response.
    pub fn into_snapshot(self) -> Result<WalletSnapshot> {
        let balance = WalletBalance::from_symbols(
            self.balances.iter().map(|(symbol, qty)| (symbol.as_str(), *qty)),
        )
        .map_err(|e| {
            error!("wallet response rejected: {}", e);
            e
        })?;
        if let Some(reported) = self.total_value_qar {
            let computed = balance.total_value();
            if reported != computed {
                warn!(reported, computed, "server total disagrees with recomputed total");
            }
        }
        Ok(WalletSnapshot {
            balance,
            stats: self.stats,
        })
    }
}

/// Body of `POST /coins/check-balance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckBalanceRequest {
    pub amount: u64,
}

/// Orders history newest first. The sort is stable, so equal timestamps keep server order.
pub fn sort_newest_first(transactions: &mut [Transaction]) {
    transactions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
