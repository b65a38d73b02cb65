//! Configuration module for tzb-bridge.
//!
//! Settings come from the process environment first and from the optional
//! TOML file second. All required settings are checked before any network
//! activity.

pub mod file;

use crate::config::file::FileConfig;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tzb_core::config::{BridgeConfig, TrelloConfig, ZulipConfig};
use tzb_core::watermark::FileWatermarkStore;
use tzb_sdk::client::{TrelloClient, ZulipClient};
use url::Url;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("setting not present in config: {0}")]
    MissingSetting(Setting),

    #[error("invalid URL in {setting}: {source}")]
    InvalidUrl {
        setting: Setting,
        source: url::ParseError,
    },
}

/// A named setting. Its environment variable doubles as its display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setting {
    TrelloKey,
    TrelloToken,
    TrelloOrg,
    TrelloApiUrl,
    ZulipEmail,
    ZulipKey,
    ZulipStream,
    ZulipSite,
    WatermarkFile,
}

impl Setting {
    pub const fn env_var(self) -> &'static str {
        match self {
            Setting::TrelloKey => "TRELLO_KEY",
            Setting::TrelloToken => "TRELLO_TOKEN",
            Setting::TrelloOrg => "TRELLO_ORG",
            Setting::TrelloApiUrl => "TRELLO_API_URL",
            Setting::ZulipEmail => "ZULIP_EMAIL",
            Setting::ZulipKey => "ZULIP_KEY",
            Setting::ZulipStream => "ZULIP_STREAM",
            Setting::ZulipSite => "ZULIP_SITE",
            Setting::WatermarkFile => "WATERMARK_FILE",
        }
    }
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.env_var())
    }
}

/// Configuration loader that merges the environment with a config file.
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new config loader. Without a path only the environment is used.
    pub fn new(config_path: Option<impl AsRef<Path>>) -> Self {
        Self {
            config_path: config_path.map(|p| p.as_ref().to_path_buf()),
        }
    }

    /// Load the configuration from the process environment and the file.
    pub fn load(&self) -> Result<BridgeConfig, ConfigError> {
        self.load_with(|name| std::env::var(name).ok())
    }

    /// Load the configuration, looking up environment variables with `env`.
    pub fn load_with(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<BridgeConfig, ConfigError> {
        let file = match &self.config_path {
            Some(path) => FileConfig::from_path(path)?,
            None => FileConfig::default(),
        };
        let settings = Settings { env, file };

        // Checked in this order so the first missing one is reported.
        let trello_key = settings.require(Setting::TrelloKey)?;
        let trello_token = settings.require(Setting::TrelloToken)?;
        let trello_org = settings.require(Setting::TrelloOrg)?;
        let zulip_email = settings.require(Setting::ZulipEmail)?;
        let zulip_key = settings.require(Setting::ZulipKey)?;
        let zulip_stream = settings.require(Setting::ZulipStream)?;

        let api_url = settings.base_url(Setting::TrelloApiUrl, TrelloClient::DEFAULT_BASE_URL)?;
        let site = settings.base_url(Setting::ZulipSite, ZulipClient::DEFAULT_SITE)?;
        let watermark_file = settings
            .get(Setting::WatermarkFile)
            .unwrap_or_else(|| FileWatermarkStore::DEFAULT_PATH.to_owned());

        Ok(BridgeConfig {
            trello: TrelloConfig {
                api_url,
                key: trello_key,
                token: trello_token,
                organization: trello_org,
            },
            zulip: ZulipConfig {
                site,
                email: zulip_email,
                api_key: zulip_key,
                stream: zulip_stream,
            },
            watermark_file: PathBuf::from(watermark_file),
        })
    }
}

/// Lookup over both sources; the environment wins.
struct Settings<F> {
    env: F,
    file: FileConfig,
}

impl<F: Fn(&str) -> Option<String>> Settings<F> {
    fn get(&self, setting: Setting) -> Option<String> {
        (self.env)(setting.env_var())
            .filter(|v| !v.is_empty())
            .or_else(|| self.file.setting(setting).map(str::to_owned))
    }

    fn require(&self, setting: Setting) -> Result<String, ConfigError> {
        self.get(setting).ok_or(ConfigError::MissingSetting(setting))
    }

    /// Parse a base URL, making sure relative joins keep its path.
    fn base_url(&self, setting: Setting, default: &str) -> Result<Url, ConfigError> {
        let mut raw = self.get(setting).unwrap_or_else(|| default.to_owned());
        if !raw.ends_with('/') {
            raw.push('/');
        }
        Url::parse(&raw).map_err(|source| ConfigError::InvalidUrl { setting, source })
    }
}
