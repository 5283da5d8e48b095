use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::Deserialize;

use tgi_core::{domain::AccountId, domain::InviteReport, utils::AuditEvent};

use crate::{error::ApiError, router::AppState};

/// A single username or a list of them.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Usernames {
    One(String),
    Many(Vec<String>),
}

impl Usernames {
    /// Trimmed, non-empty usernames in request order.
    pub fn normalized(self) -> Vec<String> {
        let raw = match self {
            Usernames::One(u) => vec![u],
            Usernames::Many(us) => us,
        };
        raw.into_iter()
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .collect()
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct InviteUser {
    pub username: Usernames,
    pub channal_or_group: String,
    pub account_phone_number: String,
}

pub async fn invite_user(
    State(state): State<AppState>,
    payload: Result<Json<InviteUser>, JsonRejection>,
) -> Result<Json<InviteReport>, ApiError> {
    let Json(body) = payload?;
    let account = AccountId::new(body.account_phone_number.trim());
    let chat = body.channal_or_group.trim().to_string();
    let users = body.username.normalized();

    if chat.is_empty() {
        return Err(ApiError::bad_request("channal_or_group is required"));
    }
    if users.is_empty() {
        return Err(ApiError::bad_request("username is required"));
    }

    match state.manager.invite_members(&account, &chat, &users).await {
        Ok(report) => {
            let results = serde_json::to_value(&report).unwrap_or_default();
            state
                .audit
                .record(AuditEvent::invite(account.as_str(), &chat, results));
            Ok(Json(report))
        }
        Err(e) => {
            let results = serde_json::json!({ "error": e.to_string() });
            state
                .audit
                .record(AuditEvent::invite(account.as_str(), &chat, results));
            Err(e.into())
        }
    }
}
