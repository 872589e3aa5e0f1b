//! Authoritative coin ledger: single source of truth for wallet holdings and transaction history.
//!
//! # Idempotency
//! Every mutating request carries a client-generated idempotency key, scoped per wallet. A request
//! whose key matches a completed or pending transaction returns that transaction as
//! [`LedgerOutcome::Replayed`] and applies nothing. A key whose previous attempt failed may be
//! retried. Reusing a key for a different request (different fingerprint) is rejected with
//! `IdempotencyConflict`.
//!
//! # Reservations
//! A reserved debit stays `Pending` and holds its value: `available = total - reserved`.
//! [`TransactionLedger::settle`] re-validates at settlement time and completes or fails it.
//!
//! # Invariants
//! - All mutation happens under one write lock; check-and-decrement is atomic.
//! - Holdings never go negative after a completed debit.
//! - No two completed transactions in one wallet share an idempotency key.
//! - `sequence` is a monotonic, ledger-local counter used only to order history entries
//!   created within the same instant.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};
use crate::core::balance::{plan_debit, WalletBalance};
use crate::core::denomination::CoinDenomination;
use crate::core::transaction::{
    fingerprint, Transaction, TransactionPurpose, TransactionStatus, TransactionType,
};
use crate::core::validator::{ensure_debitable, ensure_sufficient, BalanceCheckResponse};
use crate::error::{Result, WalletError};

/// Wallet owner identifier (alias for String).
pub type WalletId = String;

/// Adds coins to a wallet (coin purchase, adjustment).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditRequest {
    pub idempotency_key: String,
    pub coins: BTreeMap<CoinDenomination, u64>,
    pub purpose: TransactionPurpose,
    pub description: String,
    pub reference: Option<String>,
}

/// Removes value from a wallet, expressed in the canonical unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebitRequest {
    pub idempotency_key: String,
    pub amount: u64,
    pub purpose: TransactionPurpose,
    pub description: String,
    pub reference: Option<String>,
}

/// Result of a mutating ledger call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerOutcome {
    /// The request was applied now.
    Applied(Transaction),
    /// The idempotency key was already used; the original transaction is returned unchanged.
    Replayed(Transaction),
}

impl LedgerOutcome {
    pub fn transaction(&self) -> &Transaction {
        match self {
            LedgerOutcome::Applied(tx) | LedgerOutcome::Replayed(tx) => tx,
        }
    }

    pub fn into_transaction(self) -> Transaction {
        match self {
            LedgerOutcome::Applied(tx) | LedgerOutcome::Replayed(tx) => tx,
        }
    }

    pub fn is_replay(&self) -> bool {
        matches!(self, LedgerOutcome::Replayed(_))
    }

    /// Surfaces a replay as `DuplicateTransaction`, for callers that must report it.
    pub fn ensure_fresh(self) -> Result<Transaction> {
        match self {
            LedgerOutcome::Applied(tx) => Ok(tx),
            LedgerOutcome::Replayed(tx) => Err(WalletError::DuplicateTransaction(tx.idempotency_key)),
        }
    }
}

/// Aggregates reported next to the balance by the wallet endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WalletStats {
    pub total_credited: u64,
    pub total_debited: u64,
    pub reserved: u64,
    pub completed_transactions: u64,
}

#[derive(Debug, Default)]
struct Account {
    holdings: WalletBalance,
    reserved: u64,
}

impl Account {
    fn available(&self) -> u64 {
        self.holdings.total_value().saturating_sub(self.reserved)
    }
}

#[derive(Debug)]
struct LedgerEntry {
    wallet: WalletId,
    tx: Transaction,
    fingerprint: String,
    sequence: u64,
}

#[derive(Debug, Default)]
struct LedgerInner {
    accounts: HashMap<WalletId, Account>,
    entries: HashMap<String, LedgerEntry>,
    /// (wallet, idempotency key) -> latest transaction id for that key.
    idempotency: HashMap<(WalletId, String), String>,
    next_sequence: u64,
}

impl LedgerInner {
    /// Returns the original transaction when the key was already used for this request.
    fn replay(&self, wallet: &WalletId, key: &str, fp: &str) -> Result<Option<Transaction>> {
        let Some(tx_id) = self.idempotency.get(&(wallet.clone(), key.to_string())) else {
            return Ok(None);
        };
        let Some(entry) = self.entries.get(tx_id) else {
            return Ok(None);
        };
        if entry.fingerprint != fp {
            return Err(WalletError::IdempotencyConflict(key.to_string()));
        }
        match entry.tx.status {
            TransactionStatus::Completed | TransactionStatus::Pending => Ok(Some(entry.tx.clone())),
            TransactionStatus::Failed => Ok(None),
        }
    }

    fn record(&mut self, wallet: &WalletId, tx: Transaction, fp: String) {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.saturating_add(1);
        self.idempotency
            .insert((wallet.clone(), tx.idempotency_key.clone()), tx.id.clone());
        self.entries.insert(
            tx.id.clone(),
            LedgerEntry {
                wallet: wallet.clone(),
                tx,
                fingerprint: fp,
                sequence,
            },
        );
    }
}

/// Thread-safe authoritative ledger for every wallet.
#[derive(Debug, Default)]
pub struct TransactionLedger {
    inner: RwLock<LedgerInner>,
}

#[derive(Serialize)]
struct Fingerprinted<'a, T> {
    op: &'static str,
    request: &'a T,
}

/// The operation name is part of the fingerprint: a debit and a reservation never match.
fn request_fingerprint<T: Serialize>(op: &'static str, request: &T) -> Result<String> {
    fingerprint(&Fingerprinted { op, request })
}

fn check_key(key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(WalletError::InvalidAmount("idempotency key must not be empty".to_string()));
    }
    Ok(())
}

fn to_delta(amount: u64) -> Result<i64> {
    i64::try_from(amount)
        .map_err(|_| WalletError::InvalidAmount(format!("amount {} out of range", amount)))
}

impl TransactionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, LedgerInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, LedgerInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Credits coins to a wallet. Completes immediately.
    pub fn credit(&self, wallet: &WalletId, request: CreditRequest) -> Result<LedgerOutcome> {
        check_key(&request.idempotency_key)?;
        let fp = request_fingerprint("credit", &request)?;

        let mut inner = self.write();
        if let Some(original) = inner.replay(wallet, &request.idempotency_key, &fp)? {
            info!(wallet = %wallet, key = %request.idempotency_key, "credit replayed");
            return Ok(LedgerOutcome::Replayed(original));
        }

        let mut deltas = BTreeMap::new();
        let mut value: u64 = 0;
        for (d, qty) in request.coins.iter().filter(|(_, q)| **q > 0) {
            deltas.insert(*d, to_delta(*qty)?);
            value = qty
                .checked_mul(d.canonical_value())
                .and_then(|v| v.checked_add(value))
                .ok_or_else(|| WalletError::InvalidAmount("credit value out of range".to_string()))?;
        }
        if value == 0 {
            return Err(WalletError::InvalidAmount("credit must add at least one coin".to_string()));
        }

        let mut tx = Transaction::pending(
            TransactionType::Credit,
            to_delta(value)?,
            request.description,
            request.idempotency_key,
            request.reference,
            request.purpose,
        );
        tx.validate_basic()?;

        let account = inner.accounts.entry(wallet.clone()).or_default();
        account.holdings.apply_deltas(&deltas)?;
        tx.complete(deltas)?;

        info!(wallet = %wallet, tx = %tx.id, value, "credit applied");
        inner.record(wallet, tx.clone(), fp);
        Ok(LedgerOutcome::Applied(tx))
    }

    /// Debits `amount` from a wallet in one atomic step (settlement).
    ///
    /// On insufficient funds the attempt is recorded as `Failed` and `InsufficientBalance` is
    /// returned; nothing is deducted.
    pub fn debit(&self, wallet: &WalletId, request: DebitRequest) -> Result<LedgerOutcome> {
        check_key(&request.idempotency_key)?;
        ensure_debitable(request.amount)?;
        let fp = request_fingerprint("debit", &request)?;

        let mut inner = self.write();
        if let Some(original) = inner.replay(wallet, &request.idempotency_key, &fp)? {
            info!(wallet = %wallet, key = %request.idempotency_key, "debit replayed");
            return Ok(LedgerOutcome::Replayed(original));
        }

        let amount = request.amount;
        let mut tx = Transaction::pending(
            TransactionType::Debit,
            -to_delta(amount)?,
            request.description,
            request.idempotency_key,
            request.reference,
            request.purpose,
        );
        tx.validate_basic()?;

        let account = inner.accounts.entry(wallet.clone()).or_default();
        let available = account.available();
        if let Err(e) = ensure_sufficient(amount, available) {
            tx.fail(e.to_string())?;
            warn!(wallet = %wallet, tx = %tx.id, amount, available, "debit failed at settlement");
            inner.record(wallet, tx, fp);
            return Err(e);
        }

        let plan = plan_debit(&account.holdings, amount)?;
        account.holdings.apply_deltas(&plan)?;
        tx.complete(plan)?;

        info!(wallet = %wallet, tx = %tx.id, amount, "debit applied");
        inner.record(wallet, tx.clone(), fp);
        Ok(LedgerOutcome::Applied(tx))
    }

    /// Opens a pending debit that holds `amount` until it is settled or cancelled.
    pub fn reserve(&self, wallet: &WalletId, request: DebitRequest) -> Result<LedgerOutcome> {
        check_key(&request.idempotency_key)?;
        ensure_debitable(request.amount)?;
        let fp = request_fingerprint("reserve", &request)?;

        let mut inner = self.write();
        if let Some(original) = inner.replay(wallet, &request.idempotency_key, &fp)? {
            info!(wallet = %wallet, key = %request.idempotency_key, "reservation replayed");
            return Ok(LedgerOutcome::Replayed(original));
        }

        let amount = request.amount;
        let mut tx = Transaction::pending(
            TransactionType::Debit,
            -to_delta(amount)?,
            request.description,
            request.idempotency_key,
            request.reference,
            request.purpose,
        );
        tx.validate_basic()?;

        let account = inner.accounts.entry(wallet.clone()).or_default();
        let available = account.available();
        if let Err(e) = ensure_sufficient(amount, available) {
            tx.fail(e.to_string())?;
            warn!(wallet = %wallet, tx = %tx.id, amount, available, "reservation rejected");
            inner.record(wallet, tx, fp);
            return Err(e);
        }
        account.reserved = account.reserved.saturating_add(amount);

        info!(wallet = %wallet, tx = %tx.id, amount, "value reserved");
        inner.record(wallet, tx.clone(), fp);
        Ok(LedgerOutcome::Applied(tx))
    }

    /// Completes a pending debit, re-validating against the holdings at settlement time.
    pub fn settle(&self, tx_id: &str) -> Result<Transaction> {
        let mut inner = self.write();
        let inner = &mut *inner;
        let entry = inner
            .entries
            .get_mut(tx_id)
            .ok_or_else(|| WalletError::TransactionNotFound(tx_id.to_string()))?;
        if entry.tx.status.is_terminal() {
            return Err(WalletError::InvalidStatusTransition {
                from: entry.tx.status,
                to: TransactionStatus::Completed,
            });
        }

        let amount = entry.tx.amount();
        let account = inner.accounts.entry(entry.wallet.clone()).or_default();
        account.reserved = account.reserved.saturating_sub(amount);
        let available = account.available();
        if let Err(e) = ensure_sufficient(amount, available) {
            entry.tx.fail(format!("balance changed before settlement: {}", e))?;
            warn!(wallet = %entry.wallet, tx = %tx_id, amount, available, "settlement failed");
            return Err(e);
        }

        let plan = plan_debit(&account.holdings, amount)?;
        account.holdings.apply_deltas(&plan)?;
        entry.tx.complete(plan)?;
        info!(wallet = %entry.wallet, tx = %tx_id, amount, "reservation settled");
        Ok(entry.tx.clone())
    }

    /// Fails a pending debit and releases its reservation.
    pub fn cancel(&self, tx_id: &str, reason: &str) -> Result<Transaction> {
        let mut inner = self.write();
        let inner = &mut *inner;
        let entry = inner
            .entries
            .get_mut(tx_id)
            .ok_or_else(|| WalletError::TransactionNotFound(tx_id.to_string()))?;
        entry.tx.fail(reason)?;
        let amount = entry.tx.amount();
        if let Some(account) = inner.accounts.get_mut(&entry.wallet) {
            account.reserved = account.reserved.saturating_sub(amount);
        }
        info!(wallet = %entry.wallet, tx = %tx_id, reason, "reservation cancelled");
        Ok(entry.tx.clone())
    }

    /// Coin holdings of a wallet. Unknown wallets hold nothing.
    pub fn balance(&self, wallet: &WalletId) -> WalletBalance {
        self.read()
            .accounts
            .get(wallet)
            .map(|a| a.holdings.clone())
            .unwrap_or_default()
    }

    /// Total value minus reserved value.
    pub fn available_value(&self, wallet: &WalletId) -> u64 {
        self.read()
            .accounts
            .get(wallet)
            .map(Account::available)
            .unwrap_or(0)
    }

    /// Authoritative balance check against available (unreserved) value.
    pub fn check_balance(&self, wallet: &WalletId, amount: u64) -> BalanceCheckResponse {
        let response = BalanceCheckResponse::evaluate(amount, self.available_value(wallet));
        debug!(wallet = %wallet, amount, sufficient = response.sufficient, "balance checked");
        response
    }

    pub fn get_transaction(&self, tx_id: &str) -> Option<Transaction> {
        self.read().entries.get(tx_id).map(|e| e.tx.clone())
    }

    /// Most recent transactions of a wallet, newest first, at most `limit`.
    pub fn transactions(&self, wallet: &WalletId, limit: usize) -> Vec<Transaction> {
        let inner = self.read();
        let mut entries: Vec<&LedgerEntry> = inner
            .entries
            .values()
            .filter(|e| &e.wallet == wallet)
            .collect();
        entries.sort_by(|a, b| {
            (b.tx.created_at, b.sequence).cmp(&(a.tx.created_at, a.sequence))
        });
        entries.into_iter().take(limit).map(|e| e.tx.clone()).collect()
    }

    pub fn stats(&self, wallet: &WalletId) -> WalletStats {
        let inner = self.read();
        let mut stats = WalletStats {
            reserved: inner.accounts.get(wallet).map(|a| a.reserved).unwrap_or(0),
            ..WalletStats::default()
        };
        for entry in inner.entries.values().filter(|e| &e.wallet == wallet) {
            if entry.tx.status != TransactionStatus::Completed {
                continue;
            }
            stats.completed_transactions += 1;
            match entry.tx.tx_type {
                TransactionType::Credit => {
                    stats.total_credited = stats.total_credited.saturating_add(entry.tx.amount())
                }
                TransactionType::Debit => {
                    stats.total_debited = stats.total_debited.saturating_add(entry.tx.amount())
                }
            }
        }
        stats
    }
}
