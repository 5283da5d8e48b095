//! Verification-code providers.
//!
//! Sign-in asks a provider for the code instead of reading a prompt. A
//! provider either returns the code for the given phone number or fails,
//! and must not block past its own timeout.

use std::time::Duration;

use async_trait::async_trait;

use crate::{errors::Error, Result};

#[async_trait]
pub trait CodeProvider: Send + Sync {
    async fn code_for(&self, phone: &str) -> Result<String>;
}

/// Code supplied directly by the caller.
#[derive(Clone)]
pub struct StaticCode(String);

impl StaticCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }
}

#[async_trait]
impl CodeProvider for StaticCode {
    async fn code_for(&self, _phone: &str) -> Result<String> {
        let code = self.0.trim();
        if code.is_empty() {
            return Err(Error::CodeProvider("verification code is empty".to_string()));
        }
        Ok(code.to_string())
    }
}

/// Fetches the code from an HTTP webhook: `GET <url>?phone=<phone>`.
///
/// The body may be `{"code": "..."}`, a JSON string, or plain text.
#[derive(Clone, Debug)]
pub struct WebhookCodeProvider {
    url: String,
    http: reqwest::Client,
}

impl WebhookCodeProvider {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("webhook client build failed: {e}")))?;
        Ok(Self {
            url: url.into(),
            http,
        })
    }
}

#[async_trait]
impl CodeProvider for WebhookCodeProvider {
    async fn code_for(&self, phone: &str) -> Result<String> {
        let resp = self
            .http
            .get(&self.url)
            .query(&[("phone", phone)])
            .send()
            .await
            .map_err(|e| Error::CodeProvider(format!("webhook request error: {e}")))?;

        if !resp.status().is_success() {
            return Err(Error::CodeProvider(format!(
                "webhook returned {}",
                resp.status()
            )));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| Error::CodeProvider(format!("webhook body error: {e}")))?;

        let code = extract_code(&body)
            .ok_or_else(|| Error::CodeProvider("webhook returned no code".to_string()))?;
        tracing::info!("verification code received from webhook");
        Ok(code)
    }
}

fn extract_code(body: &str) -> Option<String> {
    let raw = match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(map)) => match map.get("code")? {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Number(n) => n.to_string(),
            _ => return None,
        },
        Ok(serde_json::Value::String(s)) => s,
        Ok(serde_json::Value::Number(n)) => n.to_string(),
        _ => body.to_string(),
    };

    let code = raw.trim();
    if code.is_empty() {
        None
    } else {
        Some(code.to_string())
    }
}
