use std::{
    env, fs,
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, store::parse_env_line, Result};

/// Typed configuration for the service.
#[derive(Clone, Debug)]
pub struct Config {
    // Storage
    pub env_file: PathBuf,

    // HTTP
    pub host: String,
    pub port: u16,
    pub api_bearer_token: Option<String>,

    // Invites
    pub invite_delay: Duration,

    // Code provider
    pub code_webhook_url: Option<String>,
    pub code_webhook_timeout: Duration,

    // Audit
    pub audit_log_path: PathBuf,
    pub audit_log_json: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_file = env_path("ENV_FILE").unwrap_or_else(|| PathBuf::from(".env"));
        load_dotenv_if_present(&env_file);

        let host = env_str("HOST")
            .and_then(non_empty)
            .unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match env_str("PORT").and_then(non_empty) {
            Some(p) => p
                .trim()
                .parse::<u16>()
                .map_err(|_| Error::Config(format!("PORT is not a valid port: {p}")))?,
            None => 8200,
        };
        let api_bearer_token = env_str("API_BEARER_TOKEN").and_then(non_empty);

        let invite_delay = Duration::from_millis(env_u64("INVITE_DELAY_MS").unwrap_or(3_000));

        let code_webhook_url = env_str("CODE_WEBHOOK_URL").and_then(non_empty);
        let code_webhook_timeout =
            Duration::from_millis(env_u64("CODE_WEBHOOK_TIMEOUT_MS").unwrap_or(30_000));

        let audit_log_path = PathBuf::from(
            env_str("AUDIT_LOG_PATH").unwrap_or("/tmp/tgi-audit.log".to_string()),
        );
        let audit_log_json = env_bool("AUDIT_LOG_JSON").unwrap_or(false);

        Ok(Self {
            env_file,
            host,
            port,
            api_bearer_token,
            invite_delay,
            code_webhook_url,
            code_webhook_timeout,
            audit_log_path,
            audit_log_json,
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| Error::Config(format!("invalid bind address {}:{}: {e}", self.host, self.port)))
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// Export the env file's entries into the process environment.
///
/// Existing variables win, so the shell can override the file.
fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in contents.lines().filter_map(parse_env_line) {
        if env::var_os(&key).is_some() {
            continue;
        }
        env::set_var(key, val);
    }
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key).map(PathBuf::from)
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_addr_joins_host_and_port() {
        let cfg = Config {
            env_file: ".env".into(),
            host: "127.0.0.1".to_string(),
            port: 8200,
            api_bearer_token: None,
            invite_delay: Duration::from_secs(3),
            code_webhook_url: None,
            code_webhook_timeout: Duration::from_secs(30),
            audit_log_path: "/tmp/a.log".into(),
            audit_log_json: false,
        };
        assert_eq!(cfg.bind_addr().unwrap().port(), 8200);

        let bad = Config {
            host: "not a host".to_string(),
            ..cfg
        };
        assert!(matches!(bad.bind_addr(), Err(Error::Config(_))));
    }

    #[test]
    fn non_empty_rejects_whitespace() {
        assert_eq!(non_empty("  ".to_string()), None);
        assert_eq!(non_empty("x".to_string()), Some("x".to_string()));
    }
}
