use std::{net::SocketAddr, sync::Arc};

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use tgi_core::{
    code::WebhookCodeProvider, config::Config, lifecycle::SessionManager, utils::AuditLogger,
    Result,
};

use crate::handlers;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub manager: Arc<SessionManager>,
    pub audit: Arc<AuditLogger>,
    /// Fallback code provider for `/create_session` requests without a code.
    pub code_webhook: Option<Arc<WebhookCodeProvider>>,
}

impl AppState {
    pub fn new(cfg: Arc<Config>, manager: Arc<SessionManager>) -> Result<Self> {
        let code_webhook = match &cfg.code_webhook_url {
            Some(url) => Some(Arc::new(WebhookCodeProvider::new(
                url.clone(),
                cfg.code_webhook_timeout,
            )?)),
            None => None,
        };
        let audit = Arc::new(AuditLogger::new(
            cfg.audit_log_path.clone(),
            cfg.audit_log_json,
        ));

        Ok(Self {
            cfg,
            manager,
            audit,
            code_webhook,
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::status::root))
        .route(
            "/send_verification_code/:account_id",
            get(handlers::verification::send_verification_code),
        )
        .route("/create_session", post(handlers::session::create_session))
        .route(
            "/invite_user_to_channal_or_group",
            post(handlers::invite::invite_user),
        )
        .route(
            "/check_configured_accounts",
            get(handlers::accounts::check_configured_accounts),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the API on `addr` until `shutdown` is cancelled.
///
/// In-flight requests are allowed to finish, including invite backoff sleeps.
pub async fn serve(state: AppState, addr: SocketAddr, shutdown: CancellationToken) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "tgi listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("tgi stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{body_json, get_request, test_state, FakeNetwork, PROVISIONED};
    use axum::http::StatusCode;
    use tower::ServiceExt;

    #[tokio::test]
    async fn root_reports_running() {
        let (state, path) = test_state("tgi-router-root", PROVISIONED, FakeNetwork::accepting("1"));
        let res = build_router(state).oneshot(get_request("/")).await.unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        let body = body_json(res).await;
        assert_eq!(body["status"], "running");
        assert_eq!(body["message"], "Telegram Channel & Group Invitation API");
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let (state, path) = test_state("tgi-router-404", PROVISIONED, FakeNetwork::accepting("1"));
        let res = build_router(state)
            .oneshot(get_request("/no_such_endpoint"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn webhook_provider_is_built_only_when_configured() {
        let (state, path) = test_state("tgi-router-hook", PROVISIONED, FakeNetwork::accepting("1"));
        assert!(state.code_webhook.is_none());

        let mut cfg = (*state.cfg).clone();
        cfg.code_webhook_url = Some("http://127.0.0.1:9/code".to_string());
        let with_hook = AppState::new(Arc::new(cfg), state.manager.clone()).unwrap();
        assert!(with_hook.code_webhook.is_some());
        let _ = std::fs::remove_file(&path);
    }
}
