//! Job records as they leave the submission flow.
//!
//! The promotion cost is fixed when the record is created and has no setter: settlement debits
//! exactly this value, never a re-derived one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use crate::core::pricing::PromotionFlags;

const SETTLEMENT_DOMAIN: &str = "JobPromotionSettlement:";

/// User input for a new job posting, before any cost is attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDraft {
    pub client_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    job_id: String,
    client_id: String,
    title: String,
    description: String,
    promotion: PromotionFlags,
    promotion_cost: u64,
    settlement_key: String,
    submitted_at: DateTime<Utc>,
}

impl JobRecord {
    pub(crate) fn new(draft: JobDraft, promotion: PromotionFlags, promotion_cost: u64) -> Self {
        let job_id = uuid::Uuid::new_v4().to_string();
        let settlement_key = settlement_key_for(&job_id);
        Self {
            job_id,
            client_id: draft.client_id,
            title: draft.title,
            description: draft.description,
            promotion,
            promotion_cost,
            settlement_key,
            submitted_at: Utc::now(),
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn promotion(&self) -> PromotionFlags {
        self.promotion
    }

    /// Cost computed at submission time.
    pub fn promotion_cost(&self) -> u64 {
        self.promotion_cost
    }

    /// Idempotency key used when the promotion cost is debited.
    pub fn settlement_key(&self) -> &str {
        &self.settlement_key
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }
}

/// Deterministic settlement key for a job: the same job always settles under the same key.
pub fn settlement_key_for(job_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(SETTLEMENT_DOMAIN.as_bytes());
    hasher.update(job_id.as_bytes());
    hex::encode(hasher.finalize())
}
