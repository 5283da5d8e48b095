//! Protocol client adapter.
//!
//! This crate implements the `tgi-core` `TelegramConnector` port. The MTProto
//! backend (grammers) sits behind the `grammers` feature, on by default. With
//! `--no-default-features` every build attempt fails with a configuration
//! error so the HTTP surface still starts and reports the problem per request.

use std::sync::Arc;

use tgi_core::{
    domain::AccountCredentials,
    errors::Error,
    protocol::{TelegramClient, TelegramConnector},
    Result,
};

#[cfg(feature = "grammers")]
pub mod grammers;

/// Connector used when no protocol backend is compiled in.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnavailableConnector;

impl TelegramConnector for UnavailableConnector {
    fn build(
        &self,
        account: &AccountCredentials,
        _session: Option<&str>,
    ) -> Result<Box<dyn TelegramClient>> {
        tracing::warn!(account = %account.account_id, "no protocol backend compiled in");
        Err(Error::Config(
            "no protocol backend compiled in; rebuild with --features grammers".to_string(),
        ))
    }
}

/// The connector selected at compile time.
pub fn default_connector() -> Arc<dyn TelegramConnector> {
    #[cfg(feature = "grammers")]
    {
        Arc::new(grammers::GrammersConnector::new())
    }
    #[cfg(not(feature = "grammers"))]
    {
        Arc::new(UnavailableConnector)
    }
}

/// Reduce a chat or user reference to a bare username.
///
/// Accepts `name`, `@name`, `t.me/name` and `https://t.me/name/123`. Private
/// invite links (`t.me/+hash`, `t.me/joinchat/hash`) carry no username and
/// yield `None`.
pub fn peer_username(input: &str) -> Option<&str> {
    let s = input.trim();
    let s = s
        .strip_prefix("https://")
        .or_else(|| s.strip_prefix("http://"))
        .unwrap_or(s);
    let s = s
        .strip_prefix("t.me/")
        .or_else(|| s.strip_prefix("telegram.me/"))
        .unwrap_or(s);
    let s = s.strip_prefix('@').unwrap_or(s);
    let name = s.split(['/', '?']).next().unwrap_or("");

    if name.is_empty() || name.starts_with('+') || name == "joinchat" {
        return None;
    }
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tgi_core::domain::AccountId;

    #[test]
    fn peer_username_strips_links_and_at() {
        assert_eq!(peer_username("siwattestchannal"), Some("siwattestchannal"));
        assert_eq!(peer_username(" @MrPz101 "), Some("MrPz101"));
        assert_eq!(peer_username("t.me/siwattestchannal"), Some("siwattestchannal"));
        assert_eq!(
            peer_username("https://t.me/siwattestchannal/42"),
            Some("siwattestchannal")
        );
        assert_eq!(peer_username("https://t.me/name?start=1"), Some("name"));
    }

    #[test]
    fn peer_username_rejects_private_links() {
        assert_eq!(peer_username("https://t.me/+AbCdEf"), None);
        assert_eq!(peer_username("t.me/joinchat/AbCdEf"), None);
        assert_eq!(peer_username("@"), None);
        assert_eq!(peer_username(""), None);
    }

    #[test]
    fn unavailable_connector_reports_configuration_error() {
        let creds = AccountCredentials {
            account_id: AccountId::new("0917598103"),
            api_id: "12345678".to_string(),
            api_hash: "abcdef".to_string(),
            phone_number: "+66917598103".to_string(),
        };
        let err = UnavailableConnector.build(&creds, None).err().unwrap();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("--features grammers"));
    }
}
