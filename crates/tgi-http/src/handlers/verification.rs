use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use tgi_core::{domain::AccountId, utils::AuditEvent};

use crate::{error::ApiError, router::AppState};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerificationCodeResponse {
    pub api_id: String,
    pub api_hash: String,
    pub phone_number: String,
    /// Pass back to `/create_session`.
    pub phone_code_hash: String,
}

pub async fn send_verification_code(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> Result<Json<VerificationCodeResponse>, ApiError> {
    let account = AccountId::new(account_id.trim());

    match state.manager.request_verification_code(&account).await {
        Ok(started) => {
            state
                .audit
                .record(AuditEvent::verification_requested(account.as_str(), None));
            let creds = started.credentials;
            Ok(Json(VerificationCodeResponse {
                api_id: creds.api_id,
                api_hash: creds.api_hash,
                phone_number: creds.phone_number,
                phone_code_hash: started.phone_code_hash,
            }))
        }
        Err(e) => {
            let msg = e.to_string();
            state.audit.record(AuditEvent::verification_requested(
                account.as_str(),
                Some(&msg),
            ));
            Err(e.into())
        }
    }
}
