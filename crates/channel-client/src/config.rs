//! SDK configuration loading
//!
//! Hosts ship a small TOML file naming the channel and the API host; the
//! crypto and HTTP knobs have defaults. `CHANNEL_ID` in the environment
//! overrides the file, which keeps per-environment channel ids out of
//! checked-in configs.

use std::path::Path;

use serde::Deserialize;

/// Channel SDK configuration.
#[derive(Debug, Deserialize)]
pub struct ChannelConfig {
    /// The channel this client authenticates against.
    pub channel_id: String,
    /// Base URL of the platform API, e.g. `https://api.example.com`.
    pub api_base_url: String,
    /// PBKDF2 iteration count for the local cipher.
    #[serde(default = "default_pbkdf2_iterations")]
    pub pbkdf2_iterations: u32,
    /// Request timeout the host should configure on its HTTP client.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_pbkdf2_iterations() -> u32 {
    channel_crypto::DEFAULT_PBKDF2_ITERATIONS
}

fn default_timeout() -> u64 {
    60
}

impl ChannelConfig {
    /// Load configuration from a TOML file, then overlay the environment.
    ///
    /// `CHANNEL_ID` takes precedence over the file's `channel_id`.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: ChannelConfig = toml::from_str(&contents)?;

        if let Ok(id) = std::env::var("CHANNEL_ID") {
            if !id.is_empty() {
                config.channel_id = id;
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> common::Result<()> {
        if self.channel_id.is_empty() {
            return Err(common::Error::Config("channel_id must not be empty".into()));
        }

        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://") {
            return Err(common::Error::Config(format!(
                "api_base_url must start with http:// or https://, got: {}",
                self.api_base_url
            )));
        }

        if self.pbkdf2_iterations == 0 {
            return Err(common::Error::Config(
                "pbkdf2_iterations must be greater than 0".into(),
            ));
        }

        if self.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }
}
