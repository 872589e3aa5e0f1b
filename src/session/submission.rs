//! Job submission: the last client-side gate before a job record exists.
//!
//! The cached balance only drives the toggles. Submission asks the wallet API again
//! (`check_balance`) and accepts only when the server's answer and the local predicate agree.
//! The cost on the created record is final; settlement debits exactly that value.

use tracing::{info, warn};
use crate::core::job::{JobDraft, JobRecord};
use crate::core::pricing::{PromotionCostCalculator, PromotionFlags};
use crate::core::validator::{ensure_debitable, ensure_sufficient, validate};
use crate::error::{Result, WalletError};
use crate::session::store::WalletStore;

#[derive(Debug, Clone, Default)]
pub struct JobSubmitter {
    calculator: PromotionCostCalculator,
}

impl JobSubmitter {
    pub fn new(calculator: PromotionCostCalculator) -> Self {
        Self { calculator }
    }

    /// Creates the job record for `draft` with the promotion `flags`.
    ///
    /// # Errors
    /// - `InvalidAmount` when the policy prices the flags at a value no coins can settle.
    /// - `InsufficientBalance` when the authoritative check does not confirm the cost.
    /// - `Network` / `Auth` from the check itself; nothing is created.
    ///
    /// The store is invalidated after any failed check so the next toggle re-fetches.
    pub async fn submit(
        &self,
        store: &mut WalletStore,
        draft: JobDraft,
        flags: PromotionFlags,
    ) -> Result<JobRecord> {
        let cost = self.calculator.total_cost(&flags);
        if cost == 0 {
            let record = JobRecord::new(draft, flags, 0);
            info!(job = %record.job_id(), "job submitted without promotion cost");
            return Ok(record);
        }
        if let Err(e) = ensure_debitable(cost) {
            warn!(cost, "promotion cost cannot be settled in coins");
            return Err(e);
        }

        let response = match store.api().check_balance(cost).await {
            Ok(response) => response,
            Err(e) => {
                warn!(cost, "balance check failed: {}", e);
                store.invalidate();
                return Err(e);
            }
        };

        let local = validate(cost, response.available);
        if !(response.sufficient && response.confirmed() && local.valid) {
            store.invalidate();
            warn!(cost, available = response.available, missing = response.missing, "submission rejected");
            return Err(match ensure_sufficient(cost, response.available) {
                Err(e) => e,
                // The server refused an amount its own figures cover
                Ok(()) => WalletError::InsufficientBalance {
                    required: cost,
                    available: response.available,
                    shortfall: response.missing,
                },
            });
        }

        let record = JobRecord::new(draft, flags, cost);
        info!(job = %record.job_id(), cost, "job submitted with promotion");
        Ok(record)
    }
}
