//! Account-event processing.

use tracing::info;

use super::store::AccountStore;
use crate::model::{Account, AccountState, Violation};

/// Install the account on first sight; later events leave the store
/// untouched and report the violation with the current account.
pub(super) async fn apply(store: &AccountStore, account: Account) -> AccountState {
    match store.get().await {
        None => {
            let installed = store.put(account).await;
            info!(
                active_card = installed.active_card,
                available_limit = installed.available_limit,
                "account initialized"
            );
            AccountState {
                account: Some(installed),
                violations: Vec::new(),
            }
        }
        Some(current) => {
            info!("account event rejected, already initialized");
            AccountState {
                account: Some(current),
                violations: vec![Violation::AccountAlreadyInitialized],
            }
        }
    }
}
