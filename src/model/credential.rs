//! Login credential model.

use chrono::{Duration, NaiveDateTime, Utc};

/// How long a credential without a natural expiry is considered valid.
///
/// Long-lived access tokens and refresh tokens do not expire on their own.
pub const LONG_LIVED_DAYS: i64 = 20 * 365;

/// The single active row of the `login` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    /// Access token; `None` when only a refresh token is held.
    pub token: Option<String>,
    pub expires: Option<NaiveDateTime>,
    pub refresh_token: Option<String>,
    pub account_id: Option<String>,
    pub user_id: Option<String>,
}

impl Credential {
    /// A long-lived access token, e.g. one generated in the app console.
    #[must_use]
    pub fn from_access_token(token: &str) -> Self {
        Self {
            token: Some(token.to_string()),
            expires: Some(long_lived_expiry()),
            refresh_token: None,
            account_id: None,
            user_id: None,
        }
    }

    /// A refresh token obtained through the offline OAuth flow.
    #[must_use]
    pub fn from_refresh_token(
        refresh_token: &str,
        account_id: Option<String>,
        user_id: Option<String>,
    ) -> Self {
        Self {
            token: None,
            expires: Some(long_lived_expiry()),
            refresh_token: Some(refresh_token.to_string()),
            account_id,
            user_id,
        }
    }

    /// Whether the credential holds anything a client could authenticate with.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.token.is_some() || self.refresh_token.is_some()
    }
}

fn long_lived_expiry() -> NaiveDateTime {
    (Utc::now() + Duration::days(LONG_LIVED_DAYS)).naive_utc()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_token_credential() {
        let cred = Credential::from_access_token("foobar");
        assert_eq!(cred.token.as_deref(), Some("foobar"));
        assert!(cred.refresh_token.is_none());
        assert!(cred.expires.unwrap() > Utc::now().naive_utc());
        assert!(cred.is_usable());
    }

    #[test]
    fn test_refresh_token_credential() {
        let cred = Credential::from_refresh_token("r", Some("acc".into()), None);
        assert!(cred.token.is_none());
        assert_eq!(cred.refresh_token.as_deref(), Some("r"));
        assert!(cred.is_usable());
    }
}
