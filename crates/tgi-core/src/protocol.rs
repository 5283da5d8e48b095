use async_trait::async_trait;

use crate::{domain::AccountCredentials, Result};

/// Failures raised by a protocol client.
///
/// The first three kinds drive per-member invite classification; the rest are
/// surfaced as-is.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("A wait of {seconds} seconds is required (flood control)")]
    FloodWait { seconds: u64 },

    #[error("The user's privacy settings do not allow this action")]
    PrivacyRestricted,

    #[error("peer not found: {0}")]
    NotFound(String),

    #[error("sign-in rejected: {0}")]
    InvalidCode(String),

    #[error("client is not connected")]
    NotConnected,

    #[error("RPC error {code}: {name}")]
    Rpc { code: i32, name: String },

    #[error("transport error: {0}")]
    Transport(String),
}

impl ProtocolError {
    /// Classify a remote RPC error.
    ///
    /// `name` is the error name with its numeric suffix stripped
    /// (`FLOOD_WAIT_30` → `FLOOD_WAIT`, value `Some(30)`).
    pub fn from_rpc(code: i32, name: &str, value: Option<u32>) -> Self {
        match name {
            "FLOOD_WAIT" | "SLOWMODE_WAIT" | "FLOOD_PREMIUM_WAIT" => ProtocolError::FloodWait {
                seconds: value.map(u64::from).unwrap_or(0),
            },
            "USER_PRIVACY_RESTRICTED" => ProtocolError::PrivacyRestricted,
            "PEER_ID_INVALID"
            | "USERNAME_NOT_OCCUPIED"
            | "USERNAME_INVALID"
            | "CHANNEL_INVALID"
            | "CHAT_ID_INVALID" => ProtocolError::NotFound(name.to_string()),
            "SESSION_PASSWORD_NEEDED" => ProtocolError::InvalidCode(name.to_string()),
            n if n.starts_with("PHONE_CODE_") => ProtocolError::InvalidCode(n.to_string()),
            _ => ProtocolError::Rpc {
                code,
                name: name.to_string(),
            },
        }
    }
}

pub type ProtocolResult<T> = std::result::Result<T, ProtocolError>;

/// One authenticated-or-authenticating connection to the messaging network.
///
/// Implementations own their interior state; every method takes `&self` so a
/// connection can be parked in the pending registry between requests.
#[async_trait]
pub trait TelegramClient: Send + Sync {
    async fn connect(&self) -> ProtocolResult<()>;
    async fn disconnect(&self) -> ProtocolResult<()>;
    fn is_connected(&self) -> bool;

    /// Ask the network to deliver a verification code; returns the code hash.
    async fn send_code(&self, phone: &str) -> ProtocolResult<String>;

    async fn sign_in(&self, phone: &str, code_hash: &str, code: &str) -> ProtocolResult<()>;

    /// Serialize the authorized session into a portable token.
    async fn export_session(&self) -> ProtocolResult<String>;

    /// Add `user` to `chat` (usernames, numeric ids or `t.me` links).
    async fn add_member(&self, chat: &str, user: &str) -> ProtocolResult<()>;
}

/// Factory for unconnected clients.
pub trait TelegramConnector: Send + Sync {
    /// Build a client for `account`. With `session` the client resumes that
    /// exported session; without it the client starts unauthenticated.
    fn build(
        &self,
        account: &AccountCredentials,
        session: Option<&str>,
    ) -> Result<Box<dyn TelegramClient>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flood_wait_carries_seconds() {
        assert_eq!(
            ProtocolError::from_rpc(420, "FLOOD_WAIT", Some(30)),
            ProtocolError::FloodWait { seconds: 30 }
        );
    }

    #[test]
    fn privacy_and_not_found_are_distinguished() {
        assert_eq!(
            ProtocolError::from_rpc(403, "USER_PRIVACY_RESTRICTED", None),
            ProtocolError::PrivacyRestricted
        );
        assert!(matches!(
            ProtocolError::from_rpc(400, "PEER_ID_INVALID", None),
            ProtocolError::NotFound(_)
        ));
        assert!(matches!(
            ProtocolError::from_rpc(400, "USERNAME_NOT_OCCUPIED", None),
            ProtocolError::NotFound(_)
        ));
    }

    #[test]
    fn phone_code_errors_are_invalid_code() {
        assert_eq!(
            ProtocolError::from_rpc(400, "PHONE_CODE_EXPIRED", None),
            ProtocolError::InvalidCode("PHONE_CODE_EXPIRED".to_string())
        );
    }

    #[test]
    fn unknown_errors_keep_code_and_name() {
        assert_eq!(
            ProtocolError::from_rpc(400, "CHAT_ADMIN_REQUIRED", None),
            ProtocolError::Rpc {
                code: 400,
                name: "CHAT_ADMIN_REQUIRED".to_string()
            }
        );
    }
}
