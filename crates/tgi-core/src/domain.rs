use std::fmt;

use serde::{Deserialize, Serialize};

/// Account identifier: the configuration-key prefix, conventionally the local
/// phone number without country code (e.g. `0917598103`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Store key for one of this account's fields.
    pub fn key(&self, field: AccountField) -> String {
        format!("{}_{}", self.0, field.suffix())
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-account fields recognised in the configuration store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccountField {
    ApiId,
    ApiHash,
    PhoneNumber,
    SessionString,
}

impl AccountField {
    pub const ALL: [AccountField; 4] = [
        AccountField::ApiId,
        AccountField::ApiHash,
        AccountField::PhoneNumber,
        AccountField::SessionString,
    ];

    pub fn suffix(self) -> &'static str {
        match self {
            AccountField::ApiId => "api_id",
            AccountField::ApiHash => "api_hash",
            AccountField::PhoneNumber => "phone_number",
            AccountField::SessionString => "session_string",
        }
    }
}

/// Credentials needed to open a protocol connection for an account.
#[derive(Clone, PartialEq, Eq)]
pub struct AccountCredentials {
    pub account_id: AccountId,
    pub api_id: String,
    pub api_hash: String,
    pub phone_number: String,
}

impl fmt::Debug for AccountCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountCredentials")
            .field("account_id", &self.account_id)
            .field("api_id", &self.api_id)
            .field("api_hash", &"<redacted>")
            .field("phone_number", &self.phone_number)
            .finish()
    }
}

/// Result of a successful verification-code request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationStarted {
    pub credentials: AccountCredentials,
    pub phone_code_hash: String,
}

/// Outcome of adding one member to a chat.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MemberOutcome {
    Success,
    Failed { reason: String },
    Waiting { wait_seconds: u64 },
}

/// Per-user invite record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MemberResult {
    pub user: String,
    #[serde(flatten)]
    pub outcome: MemberOutcome,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InviteStatus {
    Completed,
    Error,
}

/// Result of an invite batch.
///
/// `Completed` always carries one record per requested user; `Error` means the
/// connection could not be established and carries none.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InviteReport {
    pub status: InviteStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub results: Vec<MemberResult>,
}

impl InviteReport {
    pub fn completed(results: Vec<MemberResult>) -> Self {
        Self {
            status: InviteStatus::Completed,
            message: None,
            results,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: InviteStatus::Error,
            message: Some(message.into()),
            results: Vec::new(),
        }
    }
}
