//! Transaction-event processing: the authorization rule set.
//!
//! Rules run in a fixed order and accumulate every applicable violation.
//! Only an uninitialized account short-circuits. State changes (the limit
//! debit and the window insertion) happen only when no rule fired, so a
//! rejected transaction is never visible to later rule checks.

use tracing::info;

use super::store::AccountStore;
use crate::config::Config;
use crate::model::{Account, AccountState, ProcessingTime, Transaction, Violation};
use crate::window::{duration_ms, TransactionWindow};

/// Authorize `tx` against the store and the window, observed at `now`.
///
/// `now` is the transaction's processing timestamp; it becomes part of the
/// window entry only on admission.
pub(super) async fn apply(
    store: &AccountStore,
    window: &TransactionWindow,
    config: &Config,
    tx: &Transaction,
    now: ProcessingTime,
) -> AccountState {
    let Some(account) = store.get().await else {
        info!(merchant = %tx.merchant, amount = tx.amount, "transaction rejected, no account");
        return AccountState {
            account: None,
            violations: vec![Violation::AccountNotInitialized],
        };
    };

    let mut violations = Vec::new();

    if !account.active_card {
        violations.push(Violation::CardNotActive);
    }

    if tx.amount > account.available_limit {
        violations.push(Violation::InsufficientLimit);
    }

    // The window only ever holds admitted transactions, so the candidate is
    // counted by adding one.
    let recent = window.count_recent(now, config.high_frequency_interval).await;
    if recent + 1 > config.high_frequency_threshold {
        violations.push(Violation::HighFrequencySmallInterval);
    }

    if let Some(observations) = window.get(&tx.merchant, tx.amount).await {
        let horizon_ms = duration_ms(config.eviction_interval);
        if observations
            .iter()
            .any(|obs| now.saturating_sub(obs.processing_time) <= horizon_ms)
        {
            violations.push(Violation::DoubledTransaction);
        }
    }

    if violations.is_empty() {
        let updated = Account {
            active_card: account.active_card,
            available_limit: account.available_limit - tx.amount,
        };
        store.put(updated).await;
        window
            .put(&tx.merchant, tx.amount, tx.transaction_time, now)
            .await;
        info!(
            merchant = %tx.merchant,
            amount = tx.amount,
            available_limit = updated.available_limit,
            "transaction authorized"
        );
        AccountState {
            account: Some(updated),
            violations,
        }
    } else {
        info!(
            merchant = %tx.merchant,
            amount = tx.amount,
            violations = ?violations,
            "transaction rejected"
        );
        AccountState {
            account: Some(account),
            violations,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    const T0: ProcessingTime = 1_581_256_200_000;

    fn txn(merchant: &str, amount: i64, transaction_time: i64) -> Transaction {
        Transaction {
            merchant: merchant.to_owned(),
            amount,
            transaction_time,
        }
    }

    async fn initialized(limit: i64, active_card: bool) -> AccountStore {
        let store = AccountStore::new();
        store
            .put(Account {
                active_card,
                available_limit: limit,
            })
            .await;
        store
    }

    #[tokio::test]
    async fn rejects_when_no_account_exists() {
        let config = Config::default();
        let store = AccountStore::new();
        let window = TransactionWindow::new(&config);

        let state = apply(&store, &window, &config, &txn("Nike", 240, 1), T0).await;

        assert_eq!(state.account, None);
        assert_eq!(state.violations, vec![Violation::AccountNotInitialized]);
        assert_eq!(window.size().await, 0);
    }

    #[tokio::test]
    async fn rejects_inactive_card() {
        let config = Config::default();
        let store = initialized(100, false).await;
        let window = TransactionWindow::new(&config);

        let state = apply(&store, &window, &config, &txn("Nike", 40, 1), T0).await;

        assert_eq!(state.violations, vec![Violation::CardNotActive]);
        assert_eq!(store.get().await.unwrap().available_limit, 100);
    }

    #[tokio::test]
    async fn rejects_amount_above_limit() {
        let config = Config::default();
        let store = initialized(10, true).await;
        let window = TransactionWindow::new(&config);

        let state = apply(&store, &window, &config, &txn("Burger King", 20, 1), T0).await;

        assert_eq!(state.violations, vec![Violation::InsufficientLimit]);
        assert_eq!(store.get().await.unwrap().available_limit, 10);
        assert_eq!(window.size().await, 0);
    }

    #[tokio::test]
    async fn admits_amount_equal_to_limit() {
        let config = Config::default();
        let store = initialized(100, true).await;
        let window = TransactionWindow::new(&config);

        let state = apply(&store, &window, &config, &txn("Nike", 100, 1), T0).await;

        assert!(state.violations.is_empty());
        assert_eq!(state.account.unwrap().available_limit, 0);
    }

    #[tokio::test]
    async fn admission_debits_and_records_in_window() {
        let config = Config::default();
        let store = initialized(100, true).await;
        let window = TransactionWindow::new(&config);

        let state = apply(&store, &window, &config, &txn("Nike", 40, 7), T0).await;

        assert!(state.violations.is_empty());
        assert_eq!(store.get().await.unwrap().available_limit, 60);

        let observations = window.get("Nike", 40).await.unwrap();
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].transaction_time, 7);
        assert_eq!(observations[0].processing_time, T0);
    }

    #[tokio::test]
    async fn flags_doubled_transaction_within_the_horizon() {
        let config = Config::default();
        let store = initialized(1_000, true).await;
        let window = TransactionWindow::new(&config);

        apply(&store, &window, &config, &txn("Nike", 240, 1), T0).await;
        let state = apply(&store, &window, &config, &txn("Nike", 240, 2), T0 + 5_000).await;

        assert_eq!(state.violations, vec![Violation::DoubledTransaction]);
        assert_eq!(store.get().await.unwrap().available_limit, 760);
    }

    #[tokio::test]
    async fn same_pair_outside_the_horizon_is_admitted() {
        let config = Config::default()
            .with_eviction_interval(Duration::from_secs(10))
            .with_high_frequency_interval(Duration::from_secs(10));
        let store = initialized(1_000, true).await;
        let window = TransactionWindow::new(&config);

        apply(&store, &window, &config, &txn("Nike", 240, 1), T0).await;
        let state = apply(&store, &window, &config, &txn("Nike", 240, 2), T0 + 20_000).await;

        assert!(state.violations.is_empty());
        assert_eq!(store.get().await.unwrap().available_limit, 520);
    }

    #[tokio::test]
    async fn doubled_transaction_detected_across_the_cache_ttl() {
        // Default configuration: the dup horizon (120 s) outlives the cache
        // expiration (30 s). A repeat 60 s later must still be flagged,
        // with the sweep having run in between.
        let config = Config::default();
        let store = initialized(1_000, true).await;
        let window = TransactionWindow::new(&config);

        apply(&store, &window, &config, &txn("Nike", 240, 1), T0).await;
        window.evict_expired(T0 + 55_000, config.eviction_interval).await;

        let state = apply(&store, &window, &config, &txn("Nike", 240, 2), T0 + 60_000).await;
        assert_eq!(state.violations, vec![Violation::DoubledTransaction]);
        assert_eq!(store.get().await.unwrap().available_limit, 760);
    }

    #[tokio::test]
    async fn high_frequency_counts_across_the_cache_ttl() {
        // Admissions spaced more than the cache expiration apart still add
        // up inside the 120 s high-frequency horizon.
        let config = Config::default();
        let store = initialized(10_000, true).await;
        let window = TransactionWindow::new(&config);

        apply(&store, &window, &config, &txn("Nike", 100, 1), T0).await;
        apply(&store, &window, &config, &txn("Adidas", 110, 2), T0 + 40_000).await;
        apply(&store, &window, &config, &txn("Puma", 120, 3), T0 + 80_000).await;
        window.evict_expired(T0 + 85_000, config.eviction_interval).await;

        let state = apply(&store, &window, &config, &txn("Reebok", 130, 4), T0 + 90_000).await;
        assert_eq!(state.violations, vec![Violation::HighFrequencySmallInterval]);
    }

    #[tokio::test]
    async fn fourth_transaction_in_the_horizon_is_high_frequency() {
        let config = Config::default();
        let store = initialized(10_000, true).await;
        let window = TransactionWindow::new(&config);

        for (idx, merchant) in ["Nike", "Adidas", "Puma"].iter().enumerate() {
            let state = apply(
                &store,
                &window,
                &config,
                &txn(merchant, 100 + idx as i64, idx as i64),
                T0 + idx as i64 * 1_000,
            )
            .await;
            assert!(state.violations.is_empty(), "transaction {idx} should pass");
        }

        let state = apply(&store, &window, &config, &txn("Reebok", 50, 9), T0 + 4_000).await;
        assert_eq!(state.violations, vec![Violation::HighFrequencySmallInterval]);
        // Rejected, so the limit and the window stay put.
        assert_eq!(store.get().await.unwrap().available_limit, 10_000 - 100 - 101 - 102);
        assert_eq!(window.size().await, 3);
    }

    #[tokio::test]
    async fn violations_accumulate_in_rule_order() {
        let config = Config::default();
        let store = initialized(10, false).await;
        let window = TransactionWindow::new(&config);

        let state = apply(&store, &window, &config, &txn("Nike", 240, 1), T0).await;

        assert_eq!(
            state.violations,
            vec![Violation::CardNotActive, Violation::InsufficientLimit]
        );
    }

    #[tokio::test]
    async fn high_frequency_and_doubled_accumulate() {
        let config = Config::default();
        let store = initialized(10_000, true).await;
        let window = TransactionWindow::new(&config);

        apply(&store, &window, &config, &txn("Nike", 240, 1), T0).await;
        apply(&store, &window, &config, &txn("Adidas", 220, 2), T0 + 1_000).await;
        apply(&store, &window, &config, &txn("Puma", 200, 3), T0 + 2_000).await;

        let state = apply(&store, &window, &config, &txn("Nike", 240, 4), T0 + 3_000).await;
        assert_eq!(
            state.violations,
            vec![
                Violation::HighFrequencySmallInterval,
                Violation::DoubledTransaction
            ]
        );
    }
}
