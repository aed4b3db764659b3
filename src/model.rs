//! Core domain types for the authorization engine.

use serde::{Deserialize, Serialize};

/// Epoch timestamp supplied by the event producer; carried through unchanged.
pub type TransactionTime = i64;

/// Epoch-millisecond timestamp stamped by the engine when it observes a
/// transaction; all eviction and rule horizons are measured against it.
pub type ProcessingTime = i64;

/// The sole cardholder record maintained in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    #[serde(rename = "active-card")]
    pub active_card: bool,
    #[serde(rename = "available-limit")]
    pub available_limit: i64,
}

/// A transaction as supplied on the wire. The processing timestamp is not
/// part of the value; it is assigned by the engine on admission.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Transaction {
    pub merchant: String,
    pub amount: i64,
    #[serde(rename = "time")]
    pub transaction_time: TransactionTime,
}

/// A business-rule violation reported in an output snapshot.
///
/// Violations are normal outcomes of authorization, not errors. The wire
/// tags are stable and part of the output contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Violation {
    #[serde(rename = "account-already-initialized")]
    AccountAlreadyInitialized,
    #[serde(rename = "account-not-initialized")]
    AccountNotInitialized,
    #[serde(rename = "card-not-active")]
    CardNotActive,
    #[serde(rename = "insufficient-limit")]
    InsufficientLimit,
    #[serde(rename = "high-frequency-small-interval")]
    HighFrequencySmallInterval,
    #[serde(rename = "doubled-transaction")]
    DoubledTransaction,
}

/// The snapshot emitted after each processed event.
///
/// `account` is `None` only when a transaction arrives before any account
/// has been initialized; it serializes as JSON `null` in that case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    pub account: Option<Account>,
    pub violations: Vec<Violation>,
}

/// A classified input event.
///
/// `Start` is a synthetic sentinel emitted ahead of the stream; it is
/// dispatched like any other event but produces no snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalEvent {
    Start,
    Account(Account),
    Transaction(Transaction),
}
