//! Single-account persistence.

use tokio::sync::RwLock;

use crate::model::Account;

/// Holds zero or one [`Account`] for the life of the process.
///
/// The dispatcher serializes all access behind its event gate, so the
/// internal lock only guards against torn reads.
#[derive(Debug, Default)]
pub struct AccountStore {
    account: RwLock<Option<Account>>,
}

impl AccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self) -> Option<Account> {
        *self.account.read().await
    }

    /// Replace the stored account. The write is total; the returned value is
    /// what the store now holds.
    pub async fn put(&self, account: Account) -> Account {
        let mut slot = self.account.write().await;
        *slot = Some(account);
        account
    }
}
