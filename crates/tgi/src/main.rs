use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use tgi_core::{config::Config, lifecycle::SessionManager, store::EnvFileStore};
use tgi_http::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tgi_core::logging::init("tgi")?;

    let cfg = Arc::new(Config::load()?);
    let addr = cfg.bind_addr()?;
    info!(env_file = %cfg.env_file.display(), "configuration store");
    if cfg.api_bearer_token.is_none() {
        warn!("API_BEARER_TOKEN is not set; /check_configured_accounts will reject every request");
    }

    let store = Arc::new(EnvFileStore::new(cfg.env_file.clone()));
    let manager = Arc::new(
        SessionManager::new(store, tgi_telegram::default_connector())
            .with_invite_delay(cfg.invite_delay),
    );
    let state = AppState::new(cfg.clone(), manager)?;

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("shutdown requested");
                    shutdown.cancel();
                }
                Err(e) => warn!(error = %e, "cannot listen for ctrl-c"),
            }
        });
    }

    tgi_http::serve(state, addr, shutdown)
        .await
        .context("http server failed")?;

    Ok(())
}
