//! Admin-side settlement of job promotion costs.
//!
//! Runs when a job posting is approved. Debits the record's stored `promotion_cost` under the
//! record's `settlement_key`, so approving the same job twice debits once. A settlement that
//! finds the balance short fails the ledger transaction and reports `InsufficientBalance`;
//! the paid feature must not go live in that case.

use tracing::{error, info};
use crate::core::job::JobRecord;
use crate::core::ledger::{DebitRequest, LedgerOutcome, TransactionLedger};
use crate::core::transaction::{Transaction, TransactionPurpose};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementOutcome {
    /// The job carries no promotion cost.
    NothingToSettle,
    Settled(Transaction),
    /// The job was settled before; the original debit is returned.
    AlreadySettled(Transaction),
}

impl SettlementOutcome {
    pub fn transaction(&self) -> Option<&Transaction> {
        match self {
            SettlementOutcome::NothingToSettle => None,
            SettlementOutcome::Settled(tx) | SettlementOutcome::AlreadySettled(tx) => Some(tx),
        }
    }
}

pub fn settle_job_promotion(ledger: &TransactionLedger, job: &JobRecord) -> Result<SettlementOutcome> {
    let cost = job.promotion_cost();
    if cost == 0 {
        return Ok(SettlementOutcome::NothingToSettle);
    }

    let request = DebitRequest {
        idempotency_key: job.settlement_key().to_string(),
        amount: cost,
        purpose: TransactionPurpose::JobPromotion {
            job_id: job.job_id().to_string(),
        },
        description: format!("Promotion cost for job: {}", job.title()),
        reference: Some(job.job_id().to_string()),
    };

    match ledger.debit(&job.client_id().to_string(), request) {
        Ok(LedgerOutcome::Applied(tx)) => {
            info!(job = %job.job_id(), tx = %tx.id, cost, "promotion cost settled");
            Ok(SettlementOutcome::Settled(tx))
        }
        Ok(LedgerOutcome::Replayed(tx)) => {
            info!(job = %job.job_id(), tx = %tx.id, "promotion already settled");
            Ok(SettlementOutcome::AlreadySettled(tx))
        }
        Err(e) => {
            error!(job = %job.job_id(), cost, "promotion settlement failed: {}", e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::denomination::CoinDenomination;
    use crate::core::job::JobDraft;
    use crate::core::ledger::CreditRequest;
    use crate::core::pricing::PromotionFlags;
    use crate::core::transaction::TransactionStatus;
    use crate::error::WalletError;

    fn fund(ledger: &TransactionLedger, coins: &[(CoinDenomination, u64)]) {
        ledger
            .credit(
                &"client-1".to_string(),
                CreditRequest {
                    idempotency_key: uuid::Uuid::new_v4().to_string(),
                    coins: coins.iter().copied().collect(),
                    purpose: TransactionPurpose::CoinPurchase,
                    description: String::new(),
                    reference: None,
                },
            )
            .unwrap();
    }

    fn job(cost: u64) -> JobRecord {
        JobRecord::new(
            JobDraft {
                client_id: "client-1".to_string(),
                title: "Paint fence".to_string(),
                description: String::new(),
            },
            PromotionFlags { featured: cost > 0, boost: false },
            cost,
        )
    }

    #[test]
    fn test_zero_cost_settles_nothing() {
        let ledger = TransactionLedger::new();
        assert_eq!(settle_job_promotion(&ledger, &job(0)).unwrap(), SettlementOutcome::NothingToSettle);
        assert!(ledger.transactions(&"client-1".to_string(), 10).is_empty());
    }

    #[test]
    fn test_repeated_approval_debits_once() {
        let ledger = TransactionLedger::new();
        fund(&ledger, &[(CoinDenomination::GPC, 1)]);
        let record = job(50);

        let first = settle_job_promotion(&ledger, &record).unwrap();
        let second = settle_job_promotion(&ledger, &record).unwrap();
        assert!(matches!(first, SettlementOutcome::Settled(_)));
        assert!(matches!(second, SettlementOutcome::AlreadySettled(_)));
        assert_eq!(first.transaction(), second.transaction());
        assert_eq!(first.transaction().and_then(|t| t.job_id()), Some(record.job_id()));
        assert_eq!(ledger.balance(&"client-1".to_string()).total_value(), 50);
    }

    #[test]
    fn test_settlement_fails_when_balance_dropped() {
        let ledger = TransactionLedger::new();
        fund(&ledger, &[(CoinDenomination::GGC, 1)]);
        let err = settle_job_promotion(&ledger, &job(150)).unwrap_err();
        assert_eq!(
            err,
            WalletError::InsufficientBalance { required: 150, available: 50, shortfall: 100 }
        );
        let history = ledger.transactions(&"client-1".to_string(), 1);
        assert_eq!(history[0].status, TransactionStatus::Failed);
        assert_eq!(ledger.balance(&"client-1".to_string()).total_value(), 50);
    }
}
