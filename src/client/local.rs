//! In-process wallet API over a shared ledger.

use std::sync::Arc;
use async_trait::async_trait;
use crate::client::{WalletApi, WalletSnapshot};
use crate::core::ledger::{TransactionLedger, WalletId};
use crate::core::transaction::Transaction;
use crate::core::validator::BalanceCheckResponse;
use crate::error::Result;

/// Serves one wallet straight from a [`TransactionLedger`]. Reported balances are the full
/// holdings; `check_balance` answers against the available value (holdings minus reservations),
/// the same figure settlement checks.
#[derive(Debug, Clone)]
pub struct LocalWalletApi {
    ledger: Arc<TransactionLedger>,
    wallet: WalletId,
}

impl LocalWalletApi {
    pub fn new(ledger: Arc<TransactionLedger>, wallet: impl Into<WalletId>) -> Self {
        Self {
            ledger,
            wallet: wallet.into(),
        }
    }

    pub fn wallet(&self) -> &WalletId {
        &self.wallet
    }
}

#[async_trait]
impl WalletApi for LocalWalletApi {
    async fn get_wallet(&self) -> Result<WalletSnapshot> {
        Ok(WalletSnapshot {
            balance: self.ledger.balance(&self.wallet),
            stats: Some(self.ledger.stats(&self.wallet)),
        })
    }

    async fn get_transactions(&self, limit: usize) -> Result<Vec<Transaction>> {
        Ok(self.ledger.transactions(&self.wallet, limit))
    }

    async fn check_balance(&self, amount: u64) -> Result<BalanceCheckResponse> {
        Ok(self.ledger.check_balance(&self.wallet, amount))
    }
}
