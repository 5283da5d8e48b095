use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use tgi_core::{
    code::{CodeProvider, StaticCode},
    domain::AccountId,
    registry::{redact_phone, AccountRecord},
    utils::AuditEvent,
};

use crate::{error::ApiError, router::AppState};

#[derive(Clone, Debug, Deserialize)]
pub struct CreateSession {
    /// Full phone number as the caller knows it; the stored one is used.
    pub phone_num: String,
    pub account_phone_number: String,
    pub phone_code_hash: String,
    #[serde(default)]
    pub verification_code: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionCreated {
    pub create_session_string: bool,
}

pub async fn create_session(
    State(state): State<AppState>,
    payload: Result<Json<CreateSession>, JsonRejection>,
) -> Result<Json<SessionCreated>, ApiError> {
    let Json(body) = payload?;
    let account = AccountId::new(body.account_phone_number.trim());

    let static_code;
    let codes: &dyn CodeProvider = match body
        .verification_code
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
    {
        Some(code) => {
            static_code = StaticCode::new(code);
            &static_code
        }
        None => match &state.code_webhook {
            Some(webhook) => webhook.as_ref(),
            None => return Err(ApiError::bad_request("verification_code is required")),
        },
    };

    note_phone_mismatch(&state, &account, &body.phone_num);

    let outcome = state
        .manager
        .complete_sign_in(&account, body.phone_code_hash.trim(), codes)
        .await;

    match outcome {
        Ok(()) => {
            state.audit.record(AuditEvent::sign_in(account.as_str(), None));
            Ok(Json(SessionCreated {
                create_session_string: true,
            }))
        }
        Err(e) => {
            let msg = e.to_string();
            state
                .audit
                .record(AuditEvent::sign_in(account.as_str(), Some(&msg)));
            Err(ApiError::internal(msg))
        }
    }
}

fn note_phone_mismatch(state: &AppState, account: &AccountId, phone_num: &str) {
    let Ok(record) = AccountRecord::load(state.manager.store().as_ref(), account) else {
        return;
    };
    let Some(stored) = record.phone_number.as_deref() else {
        return;
    };
    if stored != phone_num.trim() {
        info!(
            account = %account,
            given = %redact_phone(phone_num.trim()),
            stored = %redact_phone(stored),
            "phone_num differs from the stored phone number; using the stored one"
        );
    }
}
