use crate::protocol::ProtocolError;

/// Core error type for the invite service.
///
/// Adapter crates map their specific errors into this type so the façade can
/// decide between a user-facing 400 and a generic failure.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("Account name not found: {0}")]
    AccountNotFound(String),

    #[error("Account name not found or session string missing: {0}")]
    SessionMissing(String),

    #[error("{0}")]
    Protocol(#[from] ProtocolError),

    #[error("code provider error: {0}")]
    CodeProvider(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),
}

impl Error {
    /// Account provisioning problems the caller can fix in the store.
    pub fn is_account_setup(&self) -> bool {
        matches!(self, Error::AccountNotFound(_) | Error::SessionMissing(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
