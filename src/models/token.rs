use serde::{Deserialize, Serialize};

/// Response of the PhonePe OAuth token endpoint. Both fields are optional so a
/// malformed response can be reported instead of failing deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthResponse {
    pub access_token: Option<String>,
    /// Absolute expiry, seconds since the Unix epoch.
    pub expires_at: Option<i64>,
}

/// The cached OAuth credential. Replaced as a whole on every successful fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credential {
    pub access_token: Option<String>,
    pub expiry_timestamp_millis: Option<i64>,
}

impl Credential {
    pub fn new(access_token: impl Into<String>, expiry_timestamp_millis: i64) -> Self {
        Credential {
            access_token: Some(access_token.into()),
            expiry_timestamp_millis: Some(expiry_timestamp_millis),
        }
    }

    /// The token if present and `now_millis` is strictly before expiry.
    pub fn usable_token(&self, now_millis: i64) -> Option<&str> {
        match (&self.access_token, self.expiry_timestamp_millis) {
            (Some(token), Some(expiry)) if expiry > now_millis => Some(token.as_str()),
            _ => None,
        }
    }

    pub fn needs_refresh(&self, now_millis: i64, window_millis: i64) -> bool {
        match (&self.access_token, self.expiry_timestamp_millis) {
            (Some(_), Some(expiry)) => expiry - now_millis <= window_millis,
            _ => true,
        }
    }
}

/// Body of `GET /api/token`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TokenStatus {
    pub access_token: String,
    pub expires_in: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usable_only_before_expiry() {
        let credential = Credential::new("abc", 10_000);
        assert_eq!(credential.usable_token(9_999), Some("abc"));
        assert_eq!(credential.usable_token(10_000), None);
        assert_eq!(credential.usable_token(10_001), None);
    }

    #[test]
    fn test_empty_credential_is_unusable_and_stale() {
        let credential = Credential::default();
        assert_eq!(credential.usable_token(0), None);
        assert!(credential.needs_refresh(0, 300_000));
    }

    #[test]
    fn test_needs_refresh_inside_window() {
        let credential = Credential::new("abc", 1_000_000);
        assert!(!credential.needs_refresh(0, 300_000));
        assert!(credential.needs_refresh(700_000, 300_000));
        assert!(credential.needs_refresh(2_000_000, 300_000));
    }

    #[test]
    fn test_auth_response_tolerates_missing_fields() {
        let parsed: AuthResponse = serde_json::from_str(r#"{"token_type":"O-Bearer"}"#).unwrap();
        assert!(parsed.access_token.is_none());
        assert!(parsed.expires_at.is_none());
    }
}
