//! Credential record and token shapes
//!
//! `AccessCredential` is the internal record the store persists; it carries
//! the refresh token and must never leave the SDK. `AccessToken` is the
//! public shape handed to callers, same token data minus the refresh
//! token. Both redact token values in Debug output so they cannot end up
//! in logs.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Client wall-clock time as unix milliseconds.
///
/// Used as `issued_at_ms` whenever a token is accepted as valid (issuance,
/// refresh, verification).
pub fn current_time_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// The credential record persisted per channel.
///
/// `refresh_token` is empty only transiently; a record without it cannot
/// be refreshed. Equality is structural over all four fields.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessCredential {
    pub access_token: String,
    /// Validity duration in milliseconds, relative to `issued_at_ms`.
    pub expires_in_ms: i64,
    /// Client wall-clock time when the token was accepted as valid.
    pub issued_at_ms: i64,
    #[serde(default)]
    pub refresh_token: String,
}

impl AccessCredential {
    /// `issued_at_ms + expires_in_ms`: the client's estimate of when the
    /// access token stops working.
    pub fn estimated_expiration_ms(&self) -> i64 {
        self.issued_at_ms + self.expires_in_ms
    }

    /// Whether this record carries a refresh token.
    pub fn can_refresh(&self) -> bool {
        !self.refresh_token.is_empty()
    }

    /// The caller-facing shape: same token data, no refresh token.
    pub fn to_public(&self) -> AccessToken {
        AccessToken {
            access_token: self.access_token.clone(),
            expires_in_ms: self.expires_in_ms,
            issued_at_ms: self.issued_at_ms,
        }
    }
}

// Token values stay out of Debug output so they cannot leak through logs.
impl fmt::Debug for AccessCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessCredential")
            .field("access_token", &"[REDACTED]")
            .field("expires_in_ms", &self.expires_in_ms)
            .field("issued_at_ms", &self.issued_at_ms)
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

/// Public access token shape returned to SDK callers.
///
/// Deliberately omits the refresh token; only the SDK refreshes.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub expires_in_ms: i64,
    pub issued_at_ms: i64,
}

impl AccessToken {
    pub fn estimated_expiration_ms(&self) -> i64 {
        self.issued_at_ms + self.expires_in_ms
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("access_token", &"[REDACTED]")
            .field("expires_in_ms", &self.expires_in_ms)
            .field("issued_at_ms", &self.issued_at_ms)
            .finish()
    }
}

/// Verified credential: the current token plus the scopes the server
/// reports for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelCredential {
    pub token: AccessToken,
    pub scopes: Vec<String>,
}

/// Result of a code exchange: the new credential and its granted scopes.
#[derive(Debug, Clone)]
pub struct IssuedTokenGrant {
    pub credential: AccessCredential,
    pub scopes: Vec<String>,
}

/// Result of a refresh call.
///
/// `refresh_token` is `Some` only when the server rotated it; `None`
/// means the current refresh token stays valid.
#[derive(Debug, Clone)]
pub struct RefreshGrant {
    pub access_token: String,
    pub expires_in_ms: i64,
    pub refresh_token: Option<String>,
}

/// Result of a verification call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenVerification {
    pub client_id: String,
    pub expires_in_ms: i64,
    pub scopes: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential() -> AccessCredential {
        AccessCredential {
            access_token: "at_test".into(),
            expires_in_ms: 3_600_000,
            issued_at_ms: 1_700_000_000_000,
            refresh_token: "rt_test".into(),
        }
    }

    #[test]
    fn estimated_expiration_is_issue_time_plus_validity() {
        let cred = AccessCredential {
            access_token: "a".into(),
            expires_in_ms: 1,
            issued_at_ms: 2,
            refresh_token: "r".into(),
        };
        assert_eq!(cred.estimated_expiration_ms(), 3);
    }

    #[test]
    fn equality_is_structural_over_all_fields() {
        let a = credential();
        let mut b = credential();
        assert_eq!(a, b);

        b.refresh_token = "rt_other".into();
        assert_ne!(a, b);

        let mut c = credential();
        c.issued_at_ms += 1;
        assert_ne!(a, c);
    }

    #[test]
    fn record_without_refresh_token_cannot_refresh() {
        let mut cred = credential();
        assert!(cred.can_refresh());
        cred.refresh_token.clear();
        assert!(!cred.can_refresh());
    }

    #[test]
    fn public_shape_omits_refresh_token() {
        let public = credential().to_public();
        assert_eq!(public.access_token, "at_test");
        assert_eq!(public.expires_in_ms, 3_600_000);
        assert_eq!(public.issued_at_ms, 1_700_000_000_000);

        let json = serde_json::to_string(&public).unwrap();
        assert!(!json.contains("rt_test"), "refresh token leaked: {json}");
    }

    #[test]
    fn debug_redacts_tokens() {
        let debug = format!("{:?}", credential());
        assert!(!debug.contains("at_test"), "access token leaked: {debug}");
        assert!(!debug.contains("rt_test"), "refresh token leaked: {debug}");
        assert!(debug.contains("[REDACTED]"));

        let public_debug = format!("{:?}", credential().to_public());
        assert!(!public_debug.contains("at_test"));
    }

    #[test]
    fn serde_round_trip_preserves_all_fields() {
        let json = serde_json::to_string(&credential()).unwrap();
        let back: AccessCredential = serde_json::from_str(&json).unwrap();
        assert_eq!(back, credential());
    }

    #[test]
    fn missing_refresh_token_deserializes_as_empty() {
        let json = r#"{"access_token":"at","expires_in_ms":1000,"issued_at_ms":2000}"#;
        let cred: AccessCredential = serde_json::from_str(json).unwrap();
        assert!(!cred.can_refresh());
    }

    #[test]
    fn current_time_is_plausible() {
        // After 2023-01-01 and monotone-ish
        let a = current_time_millis();
        assert!(a > 1_672_531_200_000);
        let b = current_time_millis();
        assert!(b >= a);
    }
}
