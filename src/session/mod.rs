//! Client session: the wallet cache, promotion toggles, and job submission.

pub mod store;
pub mod promotion;
pub mod submission;

pub use promotion::{PromotionForm, RecoveryAction, ToggleOutcome, ToggleRejection, ToggleState};
pub use store::{BalanceState, WalletStore};
pub use submission::JobSubmitter;
