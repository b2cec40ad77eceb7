//! Channel API client with transparent token refresh
//!
//! The top of the SDK: `ChannelClient` composes the OAuth endpoint client
//! and the encrypted token store into the credential lifecycle (login,
//! refresh, verify, get-current, logout), and `AutoRefreshClient` wraps it
//! so that token-bearing operations heal themselves from a stale access
//! token with no caller-visible retry logic.
//!
//! Wiring order for a host application:
//! 1. Load `ChannelConfig` and build a `reqwest::Client`
//! 2. Construct the cipher (`channel-crypto`) and `TokenStore`
//!    (`channel-auth`) over the host's key-value storage
//! 3. Build `ChannelClient::new(...)` and wrap it:
//!    `AutoRefreshClient::wrap(client)`

pub mod auto_refresh;
pub mod client;
pub mod config;
pub mod profile;

pub use auto_refresh::AutoRefreshClient;
pub use client::{ChannelApiClient, ChannelClient};
pub use config::ChannelConfig;
pub use profile::{FriendshipStatus, UserProfile};
