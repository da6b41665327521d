use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Logical name identifying one authentication context within a request.
///
/// A request can carry several concurrent logins (say, a user and an admin
/// impersonating one); each lives under its own slot. Stages resolve the slot
/// once per invocation and never change it mid-flight.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Slot {
    #[default]
    Default,
    Named(String),
}

impl Slot {
    pub fn named(name: impl Into<String>) -> Self {
        Slot::Named(name.into())
    }

    /// Cookie and session lookup key derived from the slot name.
    ///
    /// Pure and deterministic: the same slot always maps to the same key, and
    /// the key written into the session on a successful exchange is the same
    /// one the cookie was read from.
    pub fn token_key(&self) -> String {
        format!("warden_{}_token", self)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Default => f.write_str("default"),
            Slot::Named(name) => f.write_str(name),
        }
    }
}

/// Look up a token in a parsed cookie map.
///
/// Tries the exact derived key first, then an ASCII case-insensitive scan.
/// Cookie names are case-sensitive on paper, but proxies and older clients
/// do not all agree, so both renderings of the key are accepted.
pub(crate) fn find_token<'a>(cookies: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    if let Some(value) = cookies.get(key) {
        return Some(value.as_str());
    }
    cookies
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(key))
        .map(|(_, value)| value.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_key_derivation() {
        assert_eq!(Slot::Default.token_key(), "warden_default_token");
        assert_eq!(Slot::named("admin").token_key(), "warden_admin_token");
    }

    #[test]
    fn find_token_prefers_exact_key() {
        let mut cookies = HashMap::new();
        cookies.insert("warden_default_token".to_string(), "exact".to_string());
        cookies.insert("WARDEN_DEFAULT_TOKEN".to_string(), "shouty".to_string());

        assert_eq!(find_token(&cookies, "warden_default_token"), Some("exact"));
    }

    #[test]
    fn find_token_tolerates_case_differences() {
        let mut cookies = HashMap::new();
        cookies.insert("WARDEN_DEFAULT_TOKEN".to_string(), "tok".to_string());

        assert_eq!(find_token(&cookies, "warden_default_token"), Some("tok"));
    }

    #[test]
    fn find_token_misses_cleanly() {
        let cookies = HashMap::new();
        assert_eq!(find_token(&cookies, "warden_default_token"), None);
    }
}
