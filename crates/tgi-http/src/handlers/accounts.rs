use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap},
    Json,
};
use serde::Serialize;
use tracing::warn;

use tgi_core::{
    registry::{list_accounts, AccountSummary},
    security::{bearer_token, is_authorized},
    utils::AuditEvent,
};

use crate::{error::ApiError, router::AppState};

const ROUTE: &str = "/check_configured_accounts";

#[derive(Clone, Debug, Serialize)]
pub struct AccountListResponse {
    pub total_accounts: usize,
    pub accounts: Vec<AccountSummary>,
}

pub async fn check_configured_accounts(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AccountListResponse>, ApiError> {
    let header = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    if !is_authorized(bearer_token(header), state.cfg.api_bearer_token.as_deref()) {
        warn!(route = ROUTE, "rejected bearer token");
        state.audit.record(AuditEvent::auth(false, ROUTE));
        return Err(ApiError::unauthorized());
    }

    let accounts = list_accounts(state.manager.store().as_ref())?;
    Ok(Json(AccountListResponse {
        total_accounts: accounts.len(),
        accounts,
    }))
}
