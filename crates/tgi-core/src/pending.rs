use std::collections::HashMap;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::{domain::AccountId, protocol::TelegramClient};

/// A connected client waiting for its verification code.
pub struct PendingVerification {
    pub client: Box<dyn TelegramClient>,
    pub phone_code_hash: String,
    pub created_at: Instant,
}

impl PendingVerification {
    pub fn new(client: Box<dyn TelegramClient>, phone_code_hash: impl Into<String>) -> Self {
        Self {
            client,
            phone_code_hash: phone_code_hash.into(),
            created_at: Instant::now(),
        }
    }
}

/// In-memory table of pending verifications, at most one per account.
///
/// Not persisted: a restart drops every entry.
#[derive(Default)]
pub struct PendingVerifications {
    inner: Mutex<HashMap<AccountId, PendingVerification>>,
}

impl PendingVerifications {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `pending`, returning the entry it replaced.
    pub async fn insert(
        &self,
        account_id: AccountId,
        pending: PendingVerification,
    ) -> Option<PendingVerification> {
        self.inner.lock().await.insert(account_id, pending)
    }

    /// Remove and return the entry for `account_id`.
    pub async fn take(&self, account_id: &AccountId) -> Option<PendingVerification> {
        self.inner.lock().await.remove(account_id)
    }

    pub async fn contains(&self, account_id: &AccountId) -> bool {
        self.inner.lock().await.contains_key(account_id)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
