use std::{path::Path, time::Duration};

use config::{Config, ConfigError, Environment, File, Source};
use serde::Deserialize;

use crate::{error::ApnsError, token::SigningKey};

pub const HOST_PRODUCTION: &str = "api.push.apple.com";
pub const HOST_DEVELOPMENT: &str = "api.sandbox.push.apple.com";

fn default_keep_alive() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApnsSettings {
    pub team_id: String,
    pub key_id: String,
    #[serde(rename = "private_key")]
    pub private_key_path: String,
    pub default_topic: Option<String>,
    pub host: Option<String>,
    pub request_timeout_ms: Option<u64>,
    #[serde(default = "default_keep_alive")]
    pub keep_alive: bool,
    pub max_concurrent_sends: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub development: bool,
    pub apns: ApnsSettings,
}

impl Settings {
    pub fn load() -> Result<Settings, ConfigError> {
        Self::build(File::with_name("settings"))
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Settings, ConfigError> {
        Self::build(File::from(path.as_ref()))
    }

    /// Layers `APNS__`-prefixed environment variables over `file`.
    fn build<S>(file: S) -> Result<Settings, ConfigError>
    where
        S: Source + Send + Sync + 'static,
    {
        Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix("APNS").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// The configured host, or the production/sandbox endpoint when unset.
    pub fn host(&self) -> &str {
        match (&self.apns.host, self.development) {
            (Some(host), _) => host.as_str(),
            (None, true) => HOST_DEVELOPMENT,
            (None, false) => HOST_PRODUCTION,
        }
    }
}

/// Everything a client needs, fixed for its whole lifetime.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub team: String,
    pub signing_key: SigningKey,
    pub key_id: String,
    pub default_topic: Option<String>,
    pub host: String,
    pub keep_alive: bool,
    pub request_timeout: Option<Duration>,
    pub max_concurrent_sends: Option<usize>,
}

impl ClientConfig {
    /// A production config with keep-alive on and no timeout or send limit.
    pub fn new(
        team: impl Into<String>,
        signing_key: SigningKey,
        key_id: impl Into<String>,
    ) -> Self {
        Self {
            team: team.into(),
            signing_key,
            key_id: key_id.into(),
            default_topic: None,
            host: HOST_PRODUCTION.to_string(),
            keep_alive: true,
            request_timeout: None,
            max_concurrent_sends: None,
        }
    }

    /// Builds the config from settings, reading the private key from disk.
    pub fn from_settings(settings: &Settings) -> Result<Self, ApnsError> {
        let apns = &settings.apns;
        let signing_key = SigningKey::from_file(&apns.private_key_path)?;

        Ok(Self {
            team: apns.team_id.clone(),
            signing_key,
            key_id: apns.key_id.clone(),
            default_topic: apns.default_topic.clone(),
            host: settings.host().to_string(),
            keep_alive: apns.keep_alive,
            request_timeout: apns.request_timeout_ms.map(Duration::from_millis),
            max_concurrent_sends: apns.max_concurrent_sends,
        })
    }
}
