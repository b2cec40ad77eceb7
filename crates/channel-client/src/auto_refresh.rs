//! Transparent token refresh on authorization failure
//!
//! `AutoRefreshClient` wraps a `ChannelApiClient` and behaves identically
//! for every operation, except that token-bearing operations on the
//! allow-list below recover from a stale access token: on an HTTP 401
//! result the wrapper refreshes once and re-invokes the operation once.
//! The allow-list is the set of methods routed through
//! `call_with_refresh`: explicit in this file, checked at compile time,
//! never inferred from error codes.
//!
//! Error rules, in order:
//! - refresh fails with a network error → that network error is returned
//!   (connectivity problems must not masquerade as auth failures)
//! - refresh fails any other way → the original 401 is returned unchanged
//! - refresh succeeds → the retried call's result is returned verbatim
//!
//! Concurrent callers share one in-flight refresh: each call samples a
//! generation counter before it runs, and a caller holding the refresh
//! gate skips its own refresh when the generation moved while it was
//! getting its 401, because someone else already renewed the token; it
//! goes straight to its single retry.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;
use tracing::debug;

use channel_auth::{AccessToken, ChannelCredential};
use common::ApiResult;

use crate::client::ChannelApiClient;
use crate::profile::{FriendshipStatus, UserProfile};

/// Operations eligible for transparent refresh. Kept in sync with the
/// methods below that call `call_with_refresh`.
const REFRESHABLE_OPERATIONS: &[&str] = &["get_profile", "get_friendship_status"];

/// Decorator adding one-shot token refresh to the refreshable operations.
///
/// Owns the wrapped client exclusively; per invocation there is at most
/// one refresh attempt and at most one retried call.
pub struct AutoRefreshClient<C: ChannelApiClient> {
    inner: C,
    refresh_gate: Mutex<()>,
    refresh_generation: AtomicU64,
}

impl<C: ChannelApiClient> AutoRefreshClient<C> {
    pub fn wrap(inner: C) -> Self {
        Self {
            inner,
            refresh_gate: Mutex::new(()),
            refresh_generation: AtomicU64::new(0),
        }
    }

    pub fn into_inner(self) -> C {
        self.inner
    }

    async fn call_with_refresh<'a, T, F>(&'a self, operation: &'static str, call: F) -> ApiResult<T>
    where
        F: Fn() -> Pin<Box<dyn Future<Output = ApiResult<T>> + Send + 'a>>,
    {
        debug_assert!(
            REFRESHABLE_OPERATIONS.contains(&operation),
            "{operation} is not on the refresh allow-list"
        );

        let generation_before = self.refresh_generation.load(Ordering::Acquire);
        let first = call().await;
        if !matches!(&first, Err(e) if e.is_unauthorized()) {
            return first;
        }

        {
            let _gate = self.refresh_gate.lock().await;
            if self.refresh_generation.load(Ordering::Acquire) == generation_before {
                debug!(operation, "401 received, refreshing access token");
                match self.inner.refresh_access_token().await {
                    Ok(_) => {
                        self.refresh_generation.fetch_add(1, Ordering::AcqRel);
                    }
                    Err(e) if e.is_network_error() => return Err(e),
                    Err(refresh_error) => {
                        debug!(operation, error = %refresh_error, "refresh failed, returning original 401");
                        return first;
                    }
                }
            } else {
                debug!(operation, "token already refreshed by a concurrent caller");
            }
        }

        debug!(operation, "retrying after token refresh");
        call().await
    }
}

impl<C: ChannelApiClient> ChannelApiClient for AutoRefreshClient<C> {
    fn refresh_access_token(
        &self,
    ) -> Pin<Box<dyn Future<Output = ApiResult<AccessToken>> + Send + '_>> {
        self.inner.refresh_access_token()
    }

    fn verify_token(
        &self,
    ) -> Pin<Box<dyn Future<Output = ApiResult<ChannelCredential>> + Send + '_>> {
        self.inner.verify_token()
    }

    fn current_access_token(
        &self,
    ) -> Pin<Box<dyn Future<Output = ApiResult<AccessToken>> + Send + '_>> {
        self.inner.current_access_token()
    }

    fn logout(&self) -> Pin<Box<dyn Future<Output = ApiResult<()>> + Send + '_>> {
        self.inner.logout()
    }

    fn get_profile(&self) -> Pin<Box<dyn Future<Output = ApiResult<UserProfile>> + Send + '_>> {
        Box::pin(self.call_with_refresh("get_profile", || self.inner.get_profile()))
    }

    fn get_friendship_status(
        &self,
    ) -> Pin<Box<dyn Future<Output = ApiResult<FriendshipStatus>> + Send + '_>> {
        Box::pin(self.call_with_refresh("get_friendship_status", || {
            self.inner.get_friendship_status()
        }))
    }
}
