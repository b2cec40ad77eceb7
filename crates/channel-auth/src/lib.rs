//! Channel OAuth authentication library
//!
//! Provides PKCE flow generation, the credential record and its encrypted
//! per-channel store, and the OAuth endpoint client used for token
//! issuance, refresh, verification, and revocation. This crate performs no
//! policy decisions; the lifecycle orchestration and transparent refresh
//! live in `channel-client`.
//!
//! Credential flow:
//! 1. The login flow calls `PkceCode::new_code()` and sends the challenge
//!    with the authorization request
//! 2. The authorization code comes back and is exchanged via
//!    `AuthApiClient::issue_access_token()` with the verifier
//! 3. The credential is persisted through `TokenStore::save()` (encrypted
//!    at rest by `channel-crypto`)
//! 4. Later operations read it back with `TokenStore::get()` and refresh
//!    it via `AuthApiClient::refresh_access_token()`

pub mod api;
pub mod constants;
pub mod pkce;
pub mod store;
pub mod token;
pub mod transport;

pub use api::AuthApiClient;
pub use constants::*;
pub use pkce::{CodeChallengeMethod, PkceCode};
pub use store::TokenStore;
pub use token::{
    current_time_millis, AccessCredential, AccessToken, ChannelCredential, IssuedTokenGrant,
    RefreshGrant, TokenVerification,
};
pub use transport::{HttpTransport, ReqwestTransport};
