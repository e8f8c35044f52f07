//! Client authentication.
//!
//! Two checks gate a request: an anonymous-prefix allowlist on the forward
//! path, and a fixed-time API-key comparison. The key compare touches every
//! byte regardless of where a mismatch occurs; unequal lengths are rejected
//! up front (length is not a secret here).

use subtle::ConstantTimeEq;

/// True iff `forward_path` begins with any allowlist entry, case-insensitively.
#[must_use]
pub fn is_anonymous(forward_path: &str, allowlist: &[String]) -> bool {
    allowlist.iter().any(|prefix| {
        forward_path.len() >= prefix.len()
            && forward_path.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
    })
}

/// Fixed-time API-key check. Both sides must be non-empty and byte-equal.
#[must_use]
pub fn valid_api_key(presented: &str, expected: &str) -> bool {
    if presented.is_empty() || expected.is_empty() {
        return false;
    }
    if presented.len() != expected.len() {
        return false;
    }
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowlist(entries: &[&str]) -> Vec<String> {
        entries.iter().map(|e| (*e).to_string()).collect()
    }

    #[test]
    fn test_anonymous_prefix_match() {
        let list = allowlist(&["/health", "/public"]);
        assert!(is_anonymous("/health", &list));
        assert!(is_anonymous("/health/live", &list));
        assert!(is_anonymous("/HEALTH", &list));
        assert!(is_anonymous("/public/docs", &list));
        assert!(!is_anonymous("/ping", &list));
        assert!(!is_anonymous("/", &list));
    }

    #[test]
    fn test_empty_allowlist_never_anonymous() {
        assert!(!is_anonymous("/health", &[]));
    }

    #[test]
    fn test_valid_key() {
        assert!(valid_api_key("dev-secret-key", "dev-secret-key"));
    }

    #[test]
    fn test_wrong_key_rejected() {
        assert!(!valid_api_key("dev-secret-kex", "dev-secret-key"));
        assert!(!valid_api_key("dev-secret", "dev-secret-key"));
    }

    #[test]
    fn test_empty_keys_rejected() {
        assert!(!valid_api_key("", "dev-secret-key"));
        assert!(!valid_api_key("dev-secret-key", ""));
        assert!(!valid_api_key("", ""));
    }
}
