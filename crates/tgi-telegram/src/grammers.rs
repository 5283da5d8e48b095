//! MTProto backend (grammers).
//!
//! Code requests and sign-in go through raw `auth.*` calls so the
//! `phone_code_hash` can be handed to the caller and returned later. Sessions
//! are exported as base64 of the grammers session blob, with the account's
//! home DC recorded so a restored session dials the right datacenter.

use std::sync::Mutex;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use grammers_client::{Client, Config, InitParams};
use grammers_mtsender::InvocationError;
use grammers_session::Session;
use grammers_tl_types as tl;
use tracing::{debug, info};

use tgi_core::{
    domain::AccountCredentials,
    errors::Error,
    protocol::{ProtocolError, ProtocolResult, TelegramClient, TelegramConnector},
    Result,
};

use crate::peer_username;

/// Members forwarded history when added to a basic group.
const FWD_LIMIT: i32 = 100;

/// DC grammers dials when the session names none.
const DEFAULT_DC: i32 = 2;

#[derive(Clone, Copy, Debug, Default)]
pub struct GrammersConnector;

impl GrammersConnector {
    pub fn new() -> Self {
        Self
    }
}

impl TelegramConnector for GrammersConnector {
    fn build(
        &self,
        account: &AccountCredentials,
        session: Option<&str>,
    ) -> Result<Box<dyn TelegramClient>> {
        let api_id = account.api_id.trim().parse::<i32>().map_err(|_| {
            Error::Config(format!(
                "{}_api_id is not a number",
                account.account_id.as_str()
            ))
        })?;

        let session = match session {
            Some(token) => decode_session(token)?,
            None => Session::new(),
        };
        let home_dc = session.get_user().map(|u| u.dc).unwrap_or(DEFAULT_DC);

        Ok(Box::new(GrammersClient {
            api_id,
            api_hash: account.api_hash.clone(),
            home_dc: Mutex::new(home_dc),
            session: Mutex::new(Some(session)),
            client: Mutex::new(None),
        }))
    }
}

fn decode_session(token: &str) -> Result<Session> {
    let bytes = STANDARD
        .decode(token.trim())
        .map_err(|e| Error::Config(format!("session string is not base64: {e}")))?;
    Session::load(&bytes).map_err(|e| Error::Config(format!("session string is invalid: {e}")))
}

/// Connection parameters.
///
/// Automatic flood sleeping is off: a FLOOD_WAIT must reach the caller so the
/// member is reported as `waiting` instead of being retried silently.
fn init_params() -> InitParams {
    InitParams {
        flood_sleep_threshold: 0,
        ..Default::default()
    }
}

/// Target DC of a `*_MIGRATE_X` error (RPC code 303).
fn migrate_target(code: i32, value: Option<u32>) -> Option<i32> {
    if code != 303 {
        return None;
    }
    value.and_then(|v| i32::try_from(v).ok())
}

pub struct GrammersClient {
    api_id: i32,
    api_hash: String,
    home_dc: Mutex<i32>,
    /// Session to connect with; consumed by `connect`.
    session: Mutex<Option<Session>>,
    client: Mutex<Option<Client>>,
}

impl GrammersClient {
    fn handle(&self) -> ProtocolResult<Client> {
        self.client
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or(ProtocolError::NotConnected)
    }

    fn home_dc(&self) -> i32 {
        *self.home_dc.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn map_err(e: InvocationError) -> ProtocolError {
        match e {
            InvocationError::Rpc(rpc) => ProtocolError::from_rpc(rpc.code, &rpc.name, rpc.value),
            other => ProtocolError::Transport(other.to_string()),
        }
    }

    /// Reconnect to `dc_id` with a fresh, unauthorized session.
    async fn migrate_to(&self, dc_id: i32) -> ProtocolResult<()> {
        info!(from = self.home_dc(), to = dc_id, "migrating to home dc");
        let old = self.client.lock().unwrap_or_else(|e| e.into_inner()).take();
        drop(old);

        // The session's user entry selects the DC `Client::connect` dials;
        // the real user id is written after sign-in.
        let session = Session::new();
        session.set_user(0, dc_id, false);
        *self.session.lock().unwrap_or_else(|e| e.into_inner()) = Some(session);
        *self.home_dc.lock().unwrap_or_else(|e| e.into_inner()) = dc_id;

        self.connect().await
    }

    /// Invoke `request`, following one `*_MIGRATE_X` redirect.
    async fn invoke_at_home<R>(&self, request: &R) -> ProtocolResult<R::Return>
    where
        R: tl::RemoteCall + Sync,
        R::Return: Send,
    {
        let client = self.handle()?;
        match client.invoke(request).await {
            Ok(v) => Ok(v),
            Err(InvocationError::Rpc(rpc)) => match migrate_target(rpc.code, rpc.value) {
                Some(dc_id) => {
                    self.migrate_to(dc_id).await?;
                    self.handle()?
                        .invoke(request)
                        .await
                        .map_err(Self::map_err)
                }
                None => Err(Self::map_err(InvocationError::Rpc(rpc))),
            },
            Err(e) => Err(Self::map_err(e)),
        }
    }

    async fn resolve(client: &Client, reference: &str) -> ProtocolResult<grammers_client::types::Chat> {
        let name = peer_username(reference)
            .ok_or_else(|| ProtocolError::NotFound(reference.to_string()))?;
        client
            .resolve_username(name)
            .await
            .map_err(Self::map_err)?
            .ok_or_else(|| ProtocolError::NotFound(name.to_string()))
    }
}

#[async_trait]
impl TelegramClient for GrammersClient {
    async fn connect(&self) -> ProtocolResult<()> {
        if self.is_connected() {
            return Ok(());
        }
        let session = self
            .session
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .unwrap_or_else(Session::new);

        let client = Client::connect(Config {
            session,
            api_id: self.api_id,
            api_hash: self.api_hash.clone(),
            params: init_params(),
        })
        .await
        .map_err(|e| ProtocolError::Transport(e.to_string()))?;

        *self.client.lock().unwrap_or_else(|e| e.into_inner()) = Some(client);
        debug!(dc = self.home_dc(), "mtproto connected");
        Ok(())
    }

    async fn disconnect(&self) -> ProtocolResult<()> {
        // Dropping the last handle closes the connection.
        let client = self.client.lock().unwrap_or_else(|e| e.into_inner()).take();
        drop(client);
        debug!("mtproto disconnected");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.client
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    async fn send_code(&self, phone: &str) -> ProtocolResult<String> {
        let request = tl::functions::auth::SendCode {
            phone_number: phone.to_string(),
            api_id: self.api_id,
            api_hash: self.api_hash.clone(),
            settings: tl::types::CodeSettings {
                allow_flashcall: false,
                current_number: false,
                allow_app_hash: false,
                allow_missed_call: false,
                allow_firebase: false,
                unknown_number: false,
                logout_tokens: None,
                token: None,
                app_sandbox: None,
            }
            .into(),
        };

        match self.invoke_at_home(&request).await? {
            tl::enums::auth::SentCode::Code(sent) => Ok(sent.phone_code_hash),
            _ => Err(ProtocolError::Transport(
                "unexpected reply to auth.sendCode".to_string(),
            )),
        }
    }

    async fn sign_in(&self, phone: &str, code_hash: &str, code: &str) -> ProtocolResult<()> {
        let request = tl::functions::auth::SignIn {
            phone_number: phone.to_string(),
            phone_code_hash: code_hash.to_string(),
            phone_code: Some(code.to_string()),
            email_verification: None,
        };

        match self.invoke_at_home(&request).await? {
            tl::enums::auth::Authorization::Authorization(auth) => {
                let user_id = match auth.user {
                    tl::enums::User::User(u) => u.id,
                    tl::enums::User::Empty(u) => u.id,
                };
                self.handle()?
                    .session()
                    .set_user(user_id, self.home_dc(), false);
                Ok(())
            }
            tl::enums::auth::Authorization::SignUpRequired(_) => Err(
                ProtocolError::InvalidCode("SIGN_UP_REQUIRED".to_string()),
            ),
        }
    }

    async fn export_session(&self) -> ProtocolResult<String> {
        let client = self.handle()?;
        Ok(STANDARD.encode(client.session().save()))
    }

    async fn add_member(&self, chat: &str, user: &str) -> ProtocolResult<()> {
        let client = self.handle()?;

        let target = Self::resolve(&client, chat).await?.pack();
        let member = Self::resolve(&client, user)
            .await?
            .pack()
            .try_to_input_user()
            .ok_or_else(|| ProtocolError::NotFound(user.to_string()))?;

        if let Some(channel) = target.try_to_input_channel() {
            client
                .invoke(&tl::functions::channels::InviteToChannel {
                    channel,
                    users: vec![member],
                })
                .await
                .map_err(Self::map_err)?;
        } else if let Some(chat_id) = target.try_to_chat_id() {
            client
                .invoke(&tl::functions::messages::AddChatUser {
                    chat_id,
                    user_id: member,
                    fwd_limit: FWD_LIMIT,
                })
                .await
                .map_err(Self::map_err)?;
        } else {
            return Err(ProtocolError::NotFound(chat.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flood_waits_are_never_slept_through() {
        assert_eq!(init_params().flood_sleep_threshold, 0);
    }

    #[test]
    fn migrate_target_reads_dc_from_303_only() {
        assert_eq!(migrate_target(303, Some(4)), Some(4));
        assert_eq!(migrate_target(303, None), None);
        assert_eq!(migrate_target(420, Some(30)), None);
        assert_eq!(migrate_target(400, Some(5)), None);
    }

    #[test]
    fn build_rejects_non_numeric_api_id() {
        let creds = AccountCredentials {
            account_id: tgi_core::domain::AccountId::new("0917598103"),
            api_id: "12345678".to_string(),
            api_hash: "abcdef".to_string(),
            phone_number: "+66917598103".to_string(),
        };
        let client = GrammersConnector::new().build(&creds, None).unwrap();
        assert!(!client.is_connected());

        let bad = AccountCredentials {
            api_id: "not-a-number".to_string(),
            ..creds
        };
        assert!(matches!(
            GrammersConnector::new().build(&bad, None).err(),
            Some(Error::Config(_))
        ));
    }
}
