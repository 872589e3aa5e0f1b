pub mod utils;
pub mod error;
pub mod config;
pub mod core;
pub mod client;
pub mod session;

pub use error::{WalletError, Result};
pub use utils::{format_qar, format_delta, generate_idempotency_key, random_alphanumeric};
pub use config::{ApiConfig, PricingConfig, WalletConfig};

// Ledger side
pub use core::CoinService;
pub use core::denomination::{CoinDenomination, canonical_value_of};
pub use core::balance::{WalletBalance, total_value, plan_debit};
pub use core::pricing::{
    PromotionFlag,
    PromotionFlags,
    PricingPolicy,
    PriceTable,
    PendingAdminPricing,
    PromotionCostCalculator,
    DEFAULT_FEATURED_COST,
    DEFAULT_BOOST_COST,
};
pub use core::validator::{validate, ensure_sufficient, BalanceCheck, BalanceCheckResponse};
pub use core::transaction::{
    Transaction,
    TransactionType,
    TransactionStatus,
    TransactionPurpose,
};
pub use core::ledger::{
    TransactionLedger,
    CreditRequest,
    DebitRequest,
    LedgerOutcome,
    WalletId,
    WalletStats,
};
pub use core::job::{JobDraft, JobRecord, settlement_key_for};
pub use core::settlement::{settle_job_promotion, SettlementOutcome};

// Client side
pub use client::{WalletApi, WalletSnapshot, HttpWalletClient, LocalWalletApi, WalletResponse, CheckBalanceRequest};
pub use session::{
    WalletStore,
    BalanceState,
    PromotionForm,
    ToggleState,
    ToggleOutcome,
    ToggleRejection,
    RecoveryAction,
    JobSubmitter,
};
