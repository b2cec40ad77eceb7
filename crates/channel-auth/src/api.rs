//! OAuth endpoint client
//!
//! Builds the request data for the four OAuth operations (code exchange,
//! refresh, verify, revoke) and parses their responses into the SDK's
//! token types. Every operation performs exactly one network attempt;
//! retry policy, if any, belongs to callers.
//!
//! The token endpoint reports `expires_in` in seconds; it is converted to
//! milliseconds here, once, so the rest of the SDK only ever sees
//! millisecond durations.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use common::{ApiError, ApiResult};

use crate::constants::{AUTH_API_BASE_PATH, REVOKE_PATH, TOKEN_PATH, TOKEN_TYPE_BEARER, VERIFY_PATH};
use crate::pkce::PkceCode;
use crate::token::{
    current_time_millis, AccessCredential, IssuedTokenGrant, RefreshGrant, TokenVerification,
};
use crate::transport::HttpTransport;

/// Wire shape of the token endpoint, shared by exchange and refresh.
#[derive(Deserialize)]
struct TokenEndpointResponse {
    token_type: String,
    access_token: String,
    /// Seconds until expiry (delta, not absolute).
    expires_in: i64,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: String,
}

/// Wire shape of the verification endpoint.
#[derive(Deserialize)]
struct VerifyEndpointResponse {
    client_id: String,
    /// Seconds of remaining validity.
    expires_in: i64,
    #[serde(default)]
    scope: String,
}

/// Client for the platform's OAuth 2.1 endpoints.
pub struct AuthApiClient {
    transport: Arc<dyn HttpTransport>,
    api_base_url: String,
}

impl AuthApiClient {
    pub fn new(transport: Arc<dyn HttpTransport>, api_base_url: &str) -> Self {
        Self {
            transport,
            api_base_url: api_base_url.trim_end_matches('/').to_owned(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}/{}", self.api_base_url, AUTH_API_BASE_PATH, path)
    }

    /// Exchange an authorization code for a credential (PKCE completion).
    ///
    /// Sends the verifier to prove this client initiated the flow. On
    /// success the credential's `issued_at_ms` is the current wall-clock
    /// time.
    pub async fn issue_access_token(
        &self,
        channel_id: &str,
        code: &str,
        pkce: &PkceCode,
        redirect_uri: &str,
    ) -> ApiResult<IssuedTokenGrant> {
        let params = [
            ("grant_type".to_owned(), "authorization_code".to_owned()),
            ("code".to_owned(), code.to_owned()),
            ("redirect_uri".to_owned(), redirect_uri.to_owned()),
            ("client_id".to_owned(), channel_id.to_owned()),
            ("code_verifier".to_owned(), pkce.verifier().to_owned()),
        ];
        let body = self
            .transport
            .post(&self.endpoint(TOKEN_PATH), &[], &params)
            .await?;

        let parsed: TokenEndpointResponse = parse_body(body)?;
        ensure_bearer(&parsed.token_type)?;
        let refresh_token = parsed
            .refresh_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::Internal("token response is missing refresh_token".into()))?;

        debug!(channel_id, "issued access token");
        Ok(IssuedTokenGrant {
            credential: AccessCredential {
                access_token: parsed.access_token,
                expires_in_ms: parsed.expires_in * 1000,
                issued_at_ms: current_time_millis(),
                refresh_token,
            },
            scopes: parse_scopes(&parsed.scope),
        })
    }

    /// Trade the current refresh token for a new access token.
    ///
    /// The returned grant's `refresh_token` is `Some` only when the server
    /// rotated it; callers keep the current one otherwise.
    pub async fn refresh_access_token(
        &self,
        channel_id: &str,
        credential: &AccessCredential,
    ) -> ApiResult<RefreshGrant> {
        let params = [
            ("grant_type".to_owned(), "refresh_token".to_owned()),
            ("refresh_token".to_owned(), credential.refresh_token.clone()),
            ("client_id".to_owned(), channel_id.to_owned()),
        ];
        let body = self
            .transport
            .post(&self.endpoint(TOKEN_PATH), &[], &params)
            .await?;

        let parsed: TokenEndpointResponse = parse_body(body)?;
        ensure_bearer(&parsed.token_type)?;

        debug!(channel_id, "refreshed access token");
        Ok(RefreshGrant {
            access_token: parsed.access_token,
            expires_in_ms: parsed.expires_in * 1000,
            refresh_token: parsed.refresh_token.filter(|t| !t.is_empty()),
        })
    }

    /// Ask the server whether the access token is still valid, and for how
    /// long.
    pub async fn verify_access_token(
        &self,
        credential: &AccessCredential,
    ) -> ApiResult<TokenVerification> {
        let params = [("access_token".to_owned(), credential.access_token.clone())];
        let body = self
            .transport
            .get(&self.endpoint(VERIFY_PATH), &[], &params)
            .await?;

        let parsed: VerifyEndpointResponse = parse_body(body)?;
        Ok(TokenVerification {
            client_id: parsed.client_id,
            expires_in_ms: parsed.expires_in * 1000,
            scopes: parse_scopes(&parsed.scope),
        })
    }

    /// Revoke the refresh token (and with it the server's trust in the
    /// whole credential).
    pub async fn revoke_refresh_token(
        &self,
        channel_id: &str,
        credential: &AccessCredential,
    ) -> ApiResult<()> {
        let params = [
            ("refresh_token".to_owned(), credential.refresh_token.clone()),
            ("client_id".to_owned(), channel_id.to_owned()),
        ];
        self.transport
            .post(&self.endpoint(REVOKE_PATH), &[], &params)
            .await?;
        debug!(channel_id, "revoked refresh token");
        Ok(())
    }
}

fn parse_body<T: serde::de::DeserializeOwned>(body: Value) -> ApiResult<T> {
    serde_json::from_value(body)
        .map_err(|e| ApiError::Internal(format!("invalid token response: {e}")))
}

fn ensure_bearer(token_type: &str) -> ApiResult<()> {
    if token_type != TOKEN_TYPE_BEARER {
        return Err(ApiError::Internal(format!(
            "illegal token type: {token_type}"
        )));
    }
    Ok(())
}

fn parse_scopes(scope: &str) -> Vec<String> {
    scope.split_whitespace().map(str::to_owned).collect()
}
