use subtle::ConstantTimeEq;

// ============== Bearer Authorization ==============

/// Extract the credentials from an `Authorization: Bearer <token>` header.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    let (scheme, token) = header?.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Check a presented token against the configured one in constant time.
///
/// No configured token means nothing is authorized.
pub fn is_authorized(presented: Option<&str>, expected: Option<&str>) -> bool {
    let (Some(presented), Some(expected)) = (presented, expected) else {
        return false;
    };
    if expected.is_empty() {
        return false;
    }
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bearer_header() {
        assert_eq!(bearer_token(Some("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(Some("bearer   abc ")), Some("abc"));
        assert_eq!(bearer_token(Some("Basic abc")), None);
        assert_eq!(bearer_token(Some("Bearer")), None);
        assert_eq!(bearer_token(Some("Bearer  ")), None);
        assert_eq!(bearer_token(None), None);
    }

    #[test]
    fn authorization_requires_matching_configured_token() {
        assert!(is_authorized(Some("t0k"), Some("t0k")));
        assert!(!is_authorized(Some("t0k"), Some("t0K")));
        assert!(!is_authorized(Some("t0k"), Some("t0k-longer")));
        assert!(!is_authorized(None, Some("t0k")));
        assert!(!is_authorized(Some("t0k"), None));
        assert!(!is_authorized(Some(""), Some("")));
    }
}
