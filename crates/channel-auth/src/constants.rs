//! OAuth endpoint constants
//!
//! Paths are relative to the configured API base URL. These identify the
//! platform's OAuth 2.1 surface; the actual secrets (access/refresh
//! tokens) are managed by the token store.

/// Base path of the OAuth API version this client speaks.
pub const AUTH_API_BASE_PATH: &str = "oauth2/v2.1";

/// Token endpoint, used for both code exchange and refresh.
pub const TOKEN_PATH: &str = "token";

/// Access-token verification endpoint.
pub const VERIFY_PATH: &str = "verify";

/// Token revocation endpoint.
pub const REVOKE_PATH: &str = "revoke";

/// The only token type this client accepts from the token endpoint.
pub const TOKEN_TYPE_BEARER: &str = "Bearer";
