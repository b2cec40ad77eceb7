//! Credential lifecycle orchestration
//!
//! `ChannelClient` owns the state transitions between "has a valid
//! credential", "has only a refresh token", and "has nothing": login
//! exchanges an authorization code, refresh trades the refresh token for a
//! new access token, verify re-stamps the validity window, logout clears
//! the device before telling the server. Each transition performs at most
//! one network attempt; store failures surface as `Internal`, distinct
//! from `Network` and `Server`, so callers can tell a broken device from a
//! rejected request.
//!
//! The `ChannelApiClient` trait is the capability surface consumed by the
//! auto-refresh decorator. It uses `Pin<Box<dyn Future>>` returns so the
//! wrapped and unwrapped clients are interchangeable behind
//! `Arc<dyn ChannelApiClient>`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use channel_auth::{
    current_time_millis, AccessCredential, AccessToken, AuthApiClient, ChannelCredential,
    HttpTransport, PkceCode, TokenStore,
};
use common::{ApiError, ApiResult};

use crate::profile::{FriendshipStatus, UserProfile};

const PROFILE_PATH: &str = "v2/profile";
const FRIENDSHIP_STATUS_PATH: &str = "friendship/v1/status";

/// Capability surface of the channel API.
///
/// Implemented by `ChannelClient` and by `AutoRefreshClient` wrapping it,
/// so callers never know whether refresh interception is in place.
pub trait ChannelApiClient: Send + Sync {
    /// Trade the stored refresh token for a new access token.
    fn refresh_access_token(
        &self,
    ) -> Pin<Box<dyn Future<Output = ApiResult<AccessToken>> + Send + '_>>;

    /// Ask the server whether the stored access token is still valid.
    fn verify_token(
        &self,
    ) -> Pin<Box<dyn Future<Output = ApiResult<ChannelCredential>> + Send + '_>>;

    /// Read the stored token without touching the network.
    fn current_access_token(
        &self,
    ) -> Pin<Box<dyn Future<Output = ApiResult<AccessToken>> + Send + '_>>;

    /// Clear the local credential, then revoke it server-side.
    fn logout(&self) -> Pin<Box<dyn Future<Output = ApiResult<()>> + Send + '_>>;

    /// Fetch the signed-in user's profile. Token-bearing and refreshable.
    fn get_profile(&self) -> Pin<Box<dyn Future<Output = ApiResult<UserProfile>> + Send + '_>>;

    /// Fetch the friendship status. Token-bearing and refreshable.
    fn get_friendship_status(
        &self,
    ) -> Pin<Box<dyn Future<Output = ApiResult<FriendshipStatus>> + Send + '_>>;
}

/// Orchestrator over the OAuth endpoint client and the encrypted store.
pub struct ChannelClient {
    channel_id: String,
    auth: AuthApiClient,
    store: TokenStore,
    transport: Arc<dyn HttpTransport>,
    api_base_url: String,
}

impl ChannelClient {
    pub fn new(
        channel_id: impl Into<String>,
        transport: Arc<dyn HttpTransport>,
        api_base_url: &str,
        store: TokenStore,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            auth: AuthApiClient::new(transport.clone(), api_base_url),
            store,
            transport,
            api_base_url: api_base_url.trim_end_matches('/').to_owned(),
        }
    }

    /// Complete a login: exchange the authorization code handed back by
    /// the authorization flow, persist the credential, return its public
    /// shape. On failure nothing is persisted.
    pub async fn login_with_code(
        &self,
        code: &str,
        pkce: &PkceCode,
        redirect_uri: &str,
    ) -> ApiResult<AccessToken> {
        let grant = self
            .auth
            .issue_access_token(&self.channel_id, code, pkce, redirect_uri)
            .await?;
        self.store.save(&grant.credential).map_err(store_error)?;
        info!(channel_id = %self.channel_id, "login completed");
        Ok(grant.credential.to_public())
    }

    fn current_credential(&self) -> ApiResult<AccessCredential> {
        self.store
            .get()
            .map_err(store_error)?
            .ok_or_else(|| ApiError::Internal("access token is not found".into()))
    }

    async fn do_refresh(&self) -> ApiResult<AccessToken> {
        let credential = match self.store.get().map_err(store_error)? {
            Some(credential) if credential.can_refresh() => credential,
            _ => {
                // No stored record, or one without a refresh token: fail
                // locally, never hit the network.
                return Err(ApiError::Internal(
                    "access token or refresh token is not found".into(),
                ));
            }
        };

        let grant = self
            .auth
            .refresh_access_token(&self.channel_id, &credential)
            .await?;

        // The server sends a refresh token only when the current one must
        // be replaced.
        let refresh_token = grant
            .refresh_token
            .unwrap_or_else(|| credential.refresh_token.clone());
        let renewed = AccessCredential {
            access_token: grant.access_token,
            expires_in_ms: grant.expires_in_ms,
            issued_at_ms: current_time_millis(),
            refresh_token,
        };
        self.store.save(&renewed).map_err(store_error)?;
        debug!(channel_id = %self.channel_id, "access token refreshed");
        Ok(renewed.to_public())
    }

    async fn do_verify(&self) -> ApiResult<ChannelCredential> {
        let credential = self.current_credential()?;
        let verification = self.auth.verify_access_token(&credential).await?;

        // Same tokens, new validity window stamped at verification time.
        let updated = AccessCredential {
            access_token: credential.access_token,
            expires_in_ms: verification.expires_in_ms,
            issued_at_ms: current_time_millis(),
            refresh_token: credential.refresh_token,
        };
        self.store.save(&updated).map_err(store_error)?;
        Ok(ChannelCredential {
            token: updated.to_public(),
            scopes: verification.scopes,
        })
    }

    fn do_current(&self) -> ApiResult<AccessToken> {
        self.store
            .get()
            .map_err(store_error)?
            .map(|credential| credential.to_public())
            .ok_or_else(|| ApiError::Internal("the cached access token does not exist".into()))
    }

    async fn do_logout(&self) -> ApiResult<()> {
        let credential = self.current_credential()?;

        // Clear first: even if revocation fails, this device must stop
        // trusting the credential.
        self.store.clear().map_err(store_error)?;

        match self
            .auth
            .revoke_refresh_token(&self.channel_id, &credential)
            .await
        {
            Ok(()) => {
                info!(channel_id = %self.channel_id, "logged out");
                Ok(())
            }
            Err(e) => {
                warn!(channel_id = %self.channel_id, error = %e, "revocation failed after local logout");
                Err(e)
            }
        }
    }

    async fn call_with_access_token<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> ApiResult<T> {
        let credential = self.current_credential()?;
        let headers = [(
            "Authorization".to_owned(),
            format!("Bearer {}", credential.access_token),
        )];
        let url = format!("{}/{}", self.api_base_url, path);
        let body: Value = self.transport.get(&url, &headers, &[]).await?;
        serde_json::from_value(body)
            .map_err(|e| ApiError::Internal(format!("invalid response body: {e}")))
    }
}

fn store_error(e: common::StorageError) -> ApiError {
    ApiError::Internal(format!("credential store: {e}"))
}

impl ChannelApiClient for ChannelClient {
    fn refresh_access_token(
        &self,
    ) -> Pin<Box<dyn Future<Output = ApiResult<AccessToken>> + Send + '_>> {
        Box::pin(self.do_refresh())
    }

    fn verify_token(
        &self,
    ) -> Pin<Box<dyn Future<Output = ApiResult<ChannelCredential>> + Send + '_>> {
        Box::pin(self.do_verify())
    }

    fn current_access_token(
        &self,
    ) -> Pin<Box<dyn Future<Output = ApiResult<AccessToken>> + Send + '_>> {
        Box::pin(async move { self.do_current() })
    }

    fn logout(&self) -> Pin<Box<dyn Future<Output = ApiResult<()>> + Send + '_>> {
        Box::pin(self.do_logout())
    }

    fn get_profile(&self) -> Pin<Box<dyn Future<Output = ApiResult<UserProfile>> + Send + '_>> {
        Box::pin(self.call_with_access_token(PROFILE_PATH))
    }

    fn get_friendship_status(
        &self,
    ) -> Pin<Box<dyn Future<Output = ApiResult<FriendshipStatus>> + Send + '_>> {
        Box::pin(self.call_with_access_token(FRIENDSHIP_STATUS_PATH))
    }
}
