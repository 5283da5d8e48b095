//! Session lifecycle: `UNAUTHENTICATED → CODE_SENT → AUTHENTICATED`.
//!
//! - requesting a code parks a connected client in the pending registry
//! - completing sign-in always consumes that entry and disconnects it
//! - invites open a fresh connection from the stored session token

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::{
    code::CodeProvider,
    domain::{
        AccountCredentials, AccountField, AccountId, InviteReport, MemberOutcome, MemberResult,
        VerificationStarted,
    },
    errors::Error,
    pending::{PendingVerification, PendingVerifications},
    protocol::{ProtocolError, TelegramClient, TelegramConnector},
    registry::{redact_phone, AccountRecord},
    store::ConfigStore,
    Result,
};

pub const DEFAULT_INVITE_DELAY: Duration = Duration::from_secs(3);

pub struct SessionManager {
    store: Arc<dyn ConfigStore>,
    connector: Arc<dyn TelegramConnector>,
    pending: PendingVerifications,
    invite_delay: Duration,
}

impl SessionManager {
    pub fn new(store: Arc<dyn ConfigStore>, connector: Arc<dyn TelegramConnector>) -> Self {
        Self {
            store,
            connector,
            pending: PendingVerifications::new(),
            invite_delay: DEFAULT_INVITE_DELAY,
        }
    }

    /// Delay applied after every successful member add.
    pub fn with_invite_delay(mut self, delay: Duration) -> Self {
        self.invite_delay = delay;
        self
    }

    pub fn store(&self) -> &Arc<dyn ConfigStore> {
        &self.store
    }

    pub async fn pending_count(&self) -> usize {
        self.pending.len().await
    }

    pub async fn has_pending(&self, account_id: &AccountId) -> bool {
        self.pending.contains(account_id).await
    }

    fn credentials(&self, account_id: &AccountId) -> Result<AccountCredentials> {
        AccountRecord::load(self.store.as_ref(), account_id)?.credentials(account_id)
    }

    /// Send a verification code to the account's phone and keep the
    /// connection open until sign-in.
    pub async fn request_verification_code(
        &self,
        account_id: &AccountId,
    ) -> Result<VerificationStarted> {
        let credentials = self.credentials(account_id)?;

        let client = self.connector.build(&credentials, None)?;
        client.connect().await?;

        let phone_code_hash = match client.send_code(&credentials.phone_number).await {
            Ok(hash) => hash,
            Err(e) => {
                disconnect_quietly(client.as_ref(), account_id).await;
                return Err(e.into());
            }
        };

        info!(
            account = %account_id,
            phone = %redact_phone(&credentials.phone_number),
            "verification code sent"
        );

        let replaced = self
            .pending
            .insert(
                account_id.clone(),
                PendingVerification::new(client, phone_code_hash.clone()),
            )
            .await;
        if let Some(old) = replaced {
            warn!(
                account = %account_id,
                age_secs = old.created_at.elapsed().as_secs(),
                "replacing an earlier pending verification"
            );
            disconnect_quietly(old.client.as_ref(), account_id).await;
        }
        let pending = self.pending.len().await;
        debug!(pending, "pending verifications");

        Ok(VerificationStarted {
            credentials,
            phone_code_hash,
        })
    }

    /// Exchange the verification code for a session token and persist it
    /// under `{account_id}_session_string`.
    ///
    /// The pending entry is consumed before anything else happens, and the
    /// client is disconnected whatever the outcome.
    pub async fn complete_sign_in(
        &self,
        account_id: &AccountId,
        phone_code_hash: &str,
        codes: &dyn CodeProvider,
    ) -> Result<()> {
        let pending = self.pending.take(account_id).await;

        let credentials = match self.credentials(account_id) {
            Ok(c) => c,
            Err(e) => {
                if let Some(p) = pending {
                    disconnect_quietly(p.client.as_ref(), account_id).await;
                }
                return Err(e);
            }
        };

        let client = match pending {
            Some(p) => {
                if p.phone_code_hash != phone_code_hash {
                    debug!(account = %account_id, "code hash differs from the one issued");
                }
                p.client
            }
            None => {
                // No live connection from this process. The fresh client is
                // never connected, so the network may refuse the sign-in.
                warn!(account = %account_id, "no pending verification, using a fresh client");
                self.connector.build(&credentials, None)?
            }
        };

        let outcome = self
            .sign_in_and_persist(client.as_ref(), &credentials, phone_code_hash, codes)
            .await;
        disconnect_quietly(client.as_ref(), account_id).await;

        match &outcome {
            Ok(()) => info!(account = %account_id, "session string created"),
            Err(e) => warn!(account = %account_id, error = %e, "sign-in failed"),
        }
        outcome
    }

    async fn sign_in_and_persist(
        &self,
        client: &dyn TelegramClient,
        credentials: &AccountCredentials,
        phone_code_hash: &str,
        codes: &dyn CodeProvider,
    ) -> Result<()> {
        let code = codes.code_for(&credentials.phone_number).await?;
        client
            .sign_in(&credentials.phone_number, phone_code_hash, &code)
            .await?;

        let token = client.export_session().await?;
        self.store.upsert(
            &credentials.account_id.key(AccountField::SessionString),
            &token,
        )
    }

    /// Add each of `users` to `chat` using the account's stored session.
    ///
    /// Individual failures are recorded per user. A connection failure yields
    /// an `error` report with no records.
    pub async fn invite_members(
        &self,
        account_id: &AccountId,
        chat: &str,
        users: &[String],
    ) -> Result<InviteReport> {
        let record = AccountRecord::load(self.store.as_ref(), account_id)?;
        if !record.is_invite_capable() {
            return Err(Error::SessionMissing(account_id.to_string()));
        }
        let credentials = record.credentials(account_id)?;

        let client = match self
            .connector
            .build(&credentials, record.session_token.as_deref())
        {
            Ok(c) => c,
            Err(e) => {
                warn!(account = %account_id, error = %e, "invite aborted: cannot build client");
                return Ok(InviteReport::error(e.to_string()));
            }
        };

        if !client.is_connected() {
            if let Err(e) = client.connect().await {
                warn!(account = %account_id, error = %e, "invite aborted: cannot connect");
                disconnect_quietly(client.as_ref(), account_id).await;
                return Ok(InviteReport::error(e.to_string()));
            }
            debug!(account = %account_id, "connected for invite");
        }

        let mut results = Vec::with_capacity(users.len());
        for user in users {
            let outcome = self.invite_one(client.as_ref(), chat, user).await;
            results.push(MemberResult {
                user: user.clone(),
                outcome,
            });
        }

        disconnect_quietly(client.as_ref(), account_id).await;
        Ok(InviteReport::completed(results))
    }

    async fn invite_one(&self, client: &dyn TelegramClient, chat: &str, user: &str) -> MemberOutcome {
        match client.add_member(chat, user).await {
            Ok(()) => {
                info!(user, chat, "member added");
                sleep(self.invite_delay).await;
                MemberOutcome::Success
            }
            Err(ProtocolError::PrivacyRestricted) => {
                warn!(user, "cannot add member: privacy settings");
                MemberOutcome::Failed {
                    reason: "privacy_restricted".to_string(),
                }
            }
            Err(ProtocolError::NotFound(what)) => {
                warn!(user, chat, what = %what, "user or chat not found");
                MemberOutcome::Failed {
                    reason: "not_found".to_string(),
                }
            }
            Err(ProtocolError::FloodWait { seconds }) => {
                warn!(user, wait_seconds = seconds, "flood wait");
                sleep(Duration::from_secs(seconds)).await;
                MemberOutcome::Waiting {
                    wait_seconds: seconds,
                }
            }
            Err(e) => {
                warn!(user, error = %e, "cannot add member");
                MemberOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

async fn disconnect_quietly(client: &dyn TelegramClient, account_id: &AccountId) {
    if !client.is_connected() {
        return;
    }
    if let Err(e) = client.disconnect().await {
        warn!(account = %account_id, error = %e, "error during disconnect");
    }
}
