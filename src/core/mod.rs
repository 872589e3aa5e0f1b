// Server-side wallet engine.
//
// Everything that moves coins goes through `TransactionLedger`; this module wires the ledger
// to the coin store (credits), withdrawals (reservations), and job approval (settlement).
//
// INVARIANTS:
// - Conversion rates live only in `denomination`.
// - Every spend path validates with `validator::validate`.
// - Every mutation carries an idempotency key.

pub mod denomination;
pub mod balance;
pub mod pricing;
pub mod validator;
pub mod transaction;
pub mod ledger;
pub mod job;
pub mod settlement;

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;
use crate::core::denomination::CoinDenomination;
use crate::core::job::JobRecord;
use crate::core::ledger::{CreditRequest, DebitRequest, LedgerOutcome, TransactionLedger, WalletId};
use crate::core::settlement::{settle_job_promotion, SettlementOutcome};
use crate::core::transaction::{Transaction, TransactionPurpose};
use crate::error::Result;

/// Coin service: the operations the backend exposes on top of the ledger.
#[derive(Debug, Clone, Default)]
pub struct CoinService {
    ledger: Arc<TransactionLedger>,
}

impl CoinService {
    pub fn new(ledger: Arc<TransactionLedger>) -> Self {
        Self { ledger }
    }

    /// Credits a coin store cart once payment has cleared. `payment_reference` identifies the
    /// payment and is recorded on the transaction.
    pub fn purchase_coins(
        &self,
        wallet: &WalletId,
        cart: BTreeMap<CoinDenomination, u64>,
        idempotency_key: String,
        payment_reference: Option<String>,
    ) -> Result<LedgerOutcome> {
        let coins = cart.values().fold(0u64, |acc, qty| acc.saturating_add(*qty));
        let outcome = self.ledger.credit(
            wallet,
            CreditRequest {
                idempotency_key,
                coins: cart,
                purpose: TransactionPurpose::CoinPurchase,
                description: format!("Purchased {} coins", coins),
                reference: payment_reference,
            },
        )?;
        info!(wallet = %wallet, coins, replay = outcome.is_replay(), "coin purchase processed");
        Ok(outcome)
    }

    /// Reserves `amount` for a cash-out until an administrator processes it.
    pub fn request_withdrawal(
        &self,
        wallet: &WalletId,
        amount: u64,
        idempotency_key: String,
        note: Option<String>,
    ) -> Result<LedgerOutcome> {
        self.ledger.reserve(
            wallet,
            DebitRequest {
                idempotency_key,
                amount,
                purpose: TransactionPurpose::Withdrawal,
                description: format!("Withdrawal request of {} QAR", amount),
                reference: note,
            },
        )
    }

    pub fn approve_withdrawal(&self, tx_id: &str) -> Result<Transaction> {
        self.ledger.settle(tx_id)
    }

    pub fn reject_withdrawal(&self, tx_id: &str, reason: &str) -> Result<Transaction> {
        self.ledger.cancel(tx_id, reason)
    }

    /// Settles the promotion cost of an approved job.
    pub fn approve_job(&self, job: &JobRecord) -> Result<SettlementOutcome> {
        settle_job_promotion(&self.ledger, job)
    }

    pub fn ledger(&self) -> &Arc<TransactionLedger> {
        &self.ledger
    }
}
