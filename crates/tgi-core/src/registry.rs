use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::{
    domain::{AccountCredentials, AccountField, AccountId},
    errors::Error,
    store::ConfigStore,
    Result,
};

const MASK: char = 'x';

/// Field-presence summary for one configured account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AccountSummary {
    pub account_name: String,
    pub has_api_id: bool,
    pub has_api_hash: bool,
    pub has_phone_number: bool,
    pub has_session_string: bool,
    pub phone_number: Option<String>,
}

/// Everything the store holds for one account.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccountRecord {
    pub api_id: Option<String>,
    pub api_hash: Option<String>,
    pub phone_number: Option<String>,
    pub session_token: Option<String>,
}

impl AccountRecord {
    pub fn load(store: &dyn ConfigStore, account_id: &AccountId) -> Result<Self> {
        let entries: HashMap<String, String> = store.read_all()?.into_iter().collect();
        let get = |field| entries.get(&account_id.key(field)).cloned();
        Ok(Self {
            api_id: get(AccountField::ApiId),
            api_hash: get(AccountField::ApiHash),
            phone_number: get(AccountField::PhoneNumber),
            session_token: get(AccountField::SessionString),
        })
    }

    /// An account can invite iff it holds a non-empty session token.
    pub fn is_invite_capable(&self) -> bool {
        self.session_token
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty())
    }

    /// Credentials, if all three authentication fields are present.
    pub fn credentials(&self, account_id: &AccountId) -> Result<AccountCredentials> {
        match (&self.api_id, &self.api_hash, &self.phone_number) {
            (Some(api_id), Some(api_hash), Some(phone_number))
                if !api_id.is_empty() && !api_hash.is_empty() && !phone_number.is_empty() =>
            {
                Ok(AccountCredentials {
                    account_id: account_id.clone(),
                    api_id: api_id.clone(),
                    api_hash: api_hash.clone(),
                    phone_number: phone_number.clone(),
                })
            }
            _ => Err(Error::AccountNotFound(account_id.to_string())),
        }
    }
}

/// List every configured account, sorted by id.
///
/// An account id is the key text before the first `_`; prefixes that carry
/// none of the recognised fields (e.g. `API` from `API_BEARER_TOKEN`) are
/// skipped.
pub fn list_accounts(store: &dyn ConfigStore) -> Result<Vec<AccountSummary>> {
    let entries: HashMap<String, String> = store.read_all()?.into_iter().collect();

    let prefixes: BTreeSet<&str> = entries
        .keys()
        .filter_map(|k| k.split_once('_').map(|(prefix, _)| prefix))
        .collect();

    let mut accounts = Vec::new();
    for prefix in prefixes {
        let id = AccountId::new(prefix);
        let has = |field| entries.contains_key(&id.key(field));

        let has_api_id = has(AccountField::ApiId);
        let has_api_hash = has(AccountField::ApiHash);
        let has_phone_number = has(AccountField::PhoneNumber);
        let has_session_string = has(AccountField::SessionString);

        if !(has_api_id || has_api_hash || has_phone_number || has_session_string) {
            continue;
        }

        let phone_number = entries
            .get(&id.key(AccountField::PhoneNumber))
            .filter(|p| !p.is_empty())
            .map(|p| redact_phone(p));

        accounts.push(AccountSummary {
            account_name: prefix.to_string(),
            has_api_id,
            has_api_hash,
            has_phone_number,
            has_session_string,
            phone_number,
        });
    }

    Ok(accounts)
}

/// Mask a phone number for display.
///
/// Longer than 8 chars: first 7 and last 4 stay visible with `len - 8` mask
/// chars between them. Otherwise only the first 3 stay visible.
pub fn redact_phone(phone: &str) -> String {
    let chars: Vec<char> = phone.chars().collect();
    let len = chars.len();
    let mask = |n: usize| std::iter::repeat(MASK).take(n).collect::<String>();

    if len > 8 {
        let head: String = chars[..7].iter().collect();
        let tail: String = chars[len - 4..].iter().collect();
        format!("{head}{}{tail}", mask(len - 8))
    } else {
        let keep = len.min(3);
        let head: String = chars[..keep].iter().collect();
        format!("{head}{}", mask(len - keep))
    }
}
