//! Balance validation shared by every spend path.
//!
//! The same predicate gates promotion toggles (against the session cache), job submission
//! (against the authoritative `check_balance` answer), and ledger settlement (against the
//! ledger's own holdings). Client-side results are advisory; only settlement moves coins.

use serde::{Deserialize, Serialize};
use crate::core::denomination::CoinDenomination;
use crate::error::{Result, WalletError};

/// Outcome of comparing a required cost against an available value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceCheck {
    pub valid: bool,
    pub shortfall: u64,
}

/// `valid` iff `available >= required`; `shortfall = max(0, required - available)`.
pub fn validate(required: u64, available: u64) -> BalanceCheck {
    BalanceCheck {
        valid: available >= required,
        shortfall: required.saturating_sub(available),
    }
}

/// Answer of the authoritative balance check (`POST /coins/check-balance`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceCheckResponse {
    pub sufficient: bool,
    pub required: u64,
    pub available: u64,
    pub missing: u64,
}

impl BalanceCheckResponse {
    pub fn evaluate(required: u64, available: u64) -> Self {
        let check = validate(required, available);
        Self {
            sufficient: check.valid,
            required,
            available,
            missing: check.shortfall,
        }
    }

    /// Re-runs the shared predicate on the reported figures. A response is only trusted when
    /// the server's verdict and the local predicate agree.
    pub fn confirmed(&self) -> bool {
        self.sufficient && validate(self.required, self.available).valid
    }
}

/// Like [`validate`] but turns an invalid check into `InsufficientBalance`.
pub fn ensure_sufficient(required: u64, available: u64) -> Result<()> {
    let check = validate(required, available);
    if check.valid {
        Ok(())
    } else {
        Err(WalletError::InsufficientBalance {
            required,
            available,
            shortfall: check.shortfall,
        })
    }
}

/// Rejects amounts the ledger could never debit: zero, or not a multiple of the smallest coin.
pub fn ensure_debitable(amount: u64) -> Result<()> {
    if amount == 0 || !CoinDenomination::is_representable(amount) {
        return Err(WalletError::InvalidAmount(format!(
            "debit amount must be a positive multiple of {}, got {}",
            CoinDenomination::smallest_value(),
            amount
        )));
    }
    Ok(())
}
