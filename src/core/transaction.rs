//! Ledger transaction record and its status lifecycle.
//!
//! **Lifecycle:** every transaction is created `Pending` and moves exactly once to `Completed`
//! or `Failed`. Terminal states never change; any other transition is rejected with
//! `InvalidStatusTransition`.
//!
//! **Fingerprint:** a request fingerprint is computed from the request data (canonical JSON,
//! SHA-256) so the ledger can tell a retry of the same request from a different request that
//! reuses an idempotency key. Same request data yields the same fingerprint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use crate::core::denomination::CoinDenomination;
use crate::error::{Result, WalletError};

const FINGERPRINT_DOMAIN: &str = "CoinLedgerRequest:";

/// Direction of a balance-affecting event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Credit,
    Debit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }

    /// Only `Pending -> Completed` and `Pending -> Failed` are allowed.
    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        matches!(
            (self, next),
            (TransactionStatus::Pending, TransactionStatus::Completed)
                | (TransactionStatus::Pending, TransactionStatus::Failed)
        )
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionStatus::Pending => f.pad("pending"),
            TransactionStatus::Completed => f.pad("completed"),
            TransactionStatus::Failed => f.pad("failed"),
        }
    }
}

/// Why coins moved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransactionPurpose {
    /// Coins bought from the coin store.
    CoinPurchase,
    /// Promotion cost of a job posting, debited at admin approval.
    JobPromotion {
        #[serde(rename = "jobId")]
        job_id: String,
    },
    /// Cash-out request awaiting admin processing.
    Withdrawal,
    /// Manual correction by an administrator.
    Adjustment,
    #[serde(other)]
    Other,
}

impl TransactionPurpose {
    /// Rebuilds the purpose from the optional `kind` and `jobId` fields of a history entry.
    /// Entries without a `kind` are job promotions when they carry a `jobId`.
    fn from_wire(kind: Option<&str>, job_id: Option<String>) -> Self {
        match (kind, job_id) {
            (Some("coin_purchase"), _) => TransactionPurpose::CoinPurchase,
            (Some("withdrawal"), _) => TransactionPurpose::Withdrawal,
            (Some("adjustment"), _) => TransactionPurpose::Adjustment,
            (None | Some("job_promotion"), Some(job_id)) => TransactionPurpose::JobPromotion { job_id },
            _ => TransactionPurpose::Other,
        }
    }
}

/// A single balance-affecting event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "TransactionRecord")]
pub struct Transaction {
    pub id: String,

    #[serde(rename = "type")]
    pub tx_type: TransactionType,

    /// Net coin movement per denomination. Empty while a reserved debit is pending.
    #[serde(default)]
    pub denomination_deltas: BTreeMap<CoinDenomination, i64>,

    /// Signed value movement in the canonical unit (negative for debits).
    pub canonical_value_delta: i64,

    #[serde(default)]
    pub description: String,

    pub status: TransactionStatus,

    pub created_at: DateTime<Utc>,

    pub idempotency_key: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(flatten)]
    pub purpose: TransactionPurpose,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

/// Wire shape of a history entry. `kind` and `jobId` are both optional.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionRecord {
    id: String,
    #[serde(rename = "type")]
    tx_type: TransactionType,
    #[serde(default)]
    denomination_deltas: BTreeMap<CoinDenomination, i64>,
    canonical_value_delta: i64,
    #[serde(default)]
    description: String,
    status: TransactionStatus,
    created_at: DateTime<Utc>,
    idempotency_key: String,
    #[serde(default)]
    reference: Option<String>,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    job_id: Option<String>,
    #[serde(default)]
    failure_reason: Option<String>,
}

impl From<TransactionRecord> for Transaction {
    fn from(record: TransactionRecord) -> Self {
        Self {
            purpose: TransactionPurpose::from_wire(record.kind.as_deref(), record.job_id),
            id: record.id,
            tx_type: record.tx_type,
            denomination_deltas: record.denomination_deltas,
            canonical_value_delta: record.canonical_value_delta,
            description: record.description,
            status: record.status,
            created_at: record.created_at,
            idempotency_key: record.idempotency_key,
            reference: record.reference,
            failure_reason: record.failure_reason,
        }
    }
}

impl Transaction {
    /// Creates a pending transaction with a fresh id.
    pub fn pending(
        tx_type: TransactionType,
        canonical_value_delta: i64,
        description: String,
        idempotency_key: String,
        reference: Option<String>,
        purpose: TransactionPurpose,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tx_type,
            denomination_deltas: BTreeMap::new(),
            canonical_value_delta,
            description,
            status: TransactionStatus::Pending,
            created_at: Utc::now(),
            idempotency_key,
            reference,
            purpose,
            failure_reason: None,
        }
    }

    pub fn job_id(&self) -> Option<&str> {
        match &self.purpose {
            TransactionPurpose::JobPromotion { job_id } => Some(job_id.as_str()),
            _ => None,
        }
    }

    /// Absolute value moved, in the canonical unit.
    pub fn amount(&self) -> u64 {
        self.canonical_value_delta.unsigned_abs()
    }

    pub fn is_pending(&self) -> bool {
        self.status == TransactionStatus::Pending
    }

    fn transition(&mut self, next: TransactionStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(WalletError::InvalidStatusTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Marks the transaction completed with the coin movement that was actually applied.
    pub fn complete(&mut self, deltas: BTreeMap<CoinDenomination, i64>) -> Result<()> {
        self.transition(TransactionStatus::Completed)?;
        self.denomination_deltas = deltas;
        Ok(())
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> Result<()> {
        self.transition(TransactionStatus::Failed)?;
        self.failure_reason = Some(reason.into());
        Ok(())
    }

    /// Checks that the record is internally consistent: credits move value up, debits down.
    pub fn validate_basic(&self) -> Result<()> {
        if self.idempotency_key.trim().is_empty() {
            return Err(WalletError::InvalidAmount("idempotency key must not be empty".to_string()));
        }
        let consistent = match self.tx_type {
            TransactionType::Credit => self.canonical_value_delta > 0,
            TransactionType::Debit => self.canonical_value_delta < 0,
        };
        if !consistent {
            return Err(WalletError::InvalidAmount(format!(
                "{:?} transaction with value delta {}",
                self.tx_type, self.canonical_value_delta
            )));
        }
        Ok(())
    }
}

/// Hashes request data into a hex fingerprint. Same data yields the same fingerprint.
pub fn fingerprint<T: Serialize>(request: &T) -> Result<String> {
    let json = serde_json::to_string(request)
        .map_err(|e| WalletError::InvalidAmount(format!("failed to serialize request: {}", e)))?;
    let mut hasher = Sha256::new();
    hasher.update(FINGERPRINT_DOMAIN.as_bytes());
    hasher.update(json.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_debit() -> Transaction {
        Transaction::pending(
            TransactionType::Debit,
            -50,
            "Promotion cost for job: Plumber".to_string(),
            "key-1".to_string(),
            None,
            TransactionPurpose::JobPromotion { job_id: "job-1".to_string() },
        )
    }

    #[test]
    fn test_pending_to_completed_once() {
        let mut tx = sample_debit();
        assert!(tx.is_pending());
        let mut deltas = BTreeMap::new();
        deltas.insert(CoinDenomination::GGC, -1);
        tx.complete(deltas).unwrap();
        assert_eq!(tx.status, TransactionStatus::Completed);

        // Terminal: no further transitions
        assert!(tx.fail("late").is_err());
        assert!(tx.complete(BTreeMap::new()).is_err());
        assert_eq!(tx.status, TransactionStatus::Completed);
        assert_eq!(tx.denomination_deltas.get(&CoinDenomination::GGC), Some(&-1));
    }

    #[test]
    fn test_pending_to_failed_once() {
        let mut tx = sample_debit();
        tx.fail("balance changed").unwrap();
        assert_eq!(tx.failure_reason.as_deref(), Some("balance changed"));
        let err = tx.complete(BTreeMap::new()).unwrap_err();
        assert_eq!(
            err,
            WalletError::InvalidStatusTransition {
                from: TransactionStatus::Failed,
                to: TransactionStatus::Completed,
            }
        );
    }

    #[test]
    fn test_job_id_from_purpose() {
        assert_eq!(sample_debit().job_id(), Some("job-1"));
        let credit = Transaction::pending(
            TransactionType::Credit,
            100,
            String::new(),
            "k".to_string(),
            None,
            TransactionPurpose::CoinPurchase,
        );
        assert_eq!(credit.job_id(), None);
    }

    #[test]
    fn test_validate_basic() {
        assert!(sample_debit().validate_basic().is_ok());
        let mut wrong = sample_debit();
        wrong.canonical_value_delta = 50;
        assert!(wrong.validate_basic().is_err());
        let mut no_key = sample_debit();
        no_key.idempotency_key = "  ".to_string();
        assert!(no_key.validate_basic().is_err());
    }

    #[test]
    fn test_wire_format() {
        let tx = sample_debit();
        let value = serde_json::to_value(&tx).unwrap();
        assert_eq!(value["type"], "debit");
        assert_eq!(value["status"], "pending");
        assert_eq!(value["kind"], "job_promotion");
        assert_eq!(value["jobId"], "job-1");
        assert_eq!(value["canonicalValueDelta"], -50);
        assert_eq!(value["idempotencyKey"], "key-1");

        let back: Transaction = serde_json::from_value(value).unwrap();
        assert_eq!(back, tx);
    }

    #[test]
    fn test_unknown_purpose_kind_is_other() {
        let json = serde_json::json!({
            "id": "t1",
            "type": "credit",
            "canonicalValueDelta": 100,
            "status": "completed",
            "createdAt": "2025-01-01T00:00:00Z",
            "idempotencyKey": "k",
            "kind": "referral_bonus"
        });
        let tx: Transaction = serde_json::from_value(json).unwrap();
        assert_eq!(tx.purpose, TransactionPurpose::Other);
        assert!(tx.denomination_deltas.is_empty());
    }

    #[test]
    fn test_entry_without_kind() {
        let json = serde_json::json!([
            {
                "id": "t1",
                "type": "debit",
                "denominationDeltas": { "GGC": -1 },
                "canonicalValueDelta": -50,
                "description": "Promotion cost for job: Plumber",
                "status": "completed",
                "createdAt": "2025-01-01T00:00:00Z",
                "idempotencyKey": "k1",
                "jobId": "job-1"
            },
            {
                "id": "t2",
                "type": "credit",
                "canonicalValueDelta": 100,
                "status": "completed",
                "createdAt": "2025-01-02T00:00:00Z",
                "idempotencyKey": "k2"
            }
        ]);
        let txs: Vec<Transaction> = serde_json::from_value(json).unwrap();
        assert_eq!(txs[0].job_id(), Some("job-1"));
        assert_eq!(
            txs[0].purpose,
            TransactionPurpose::JobPromotion { job_id: "job-1".to_string() }
        );
        assert_eq!(txs[1].purpose, TransactionPurpose::Other);
        assert_eq!(txs[1].job_id(), None);
    }

    #[test]
    fn test_kind_wins_over_job_id() {
        let json = serde_json::json!({
            "id": "t1",
            "type": "credit",
            "canonicalValueDelta": 100,
            "status": "completed",
            "createdAt": "2025-01-01T00:00:00Z",
            "idempotencyKey": "k",
            "kind": "coin_purchase",
            "jobId": "job-1"
        });
        let tx: Transaction = serde_json::from_value(json).unwrap();
        assert_eq!(tx.purpose, TransactionPurpose::CoinPurchase);
    }

    #[test]
    fn test_fingerprint_deterministic() {
        #[derive(Serialize)]
        struct Req {
            amount: u64,
        }
        let a = fingerprint(&Req { amount: 5 }).unwrap();
        let b = fingerprint(&Req { amount: 5 }).unwrap();
        let c = fingerprint(&Req { amount: 10 }).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }
}
