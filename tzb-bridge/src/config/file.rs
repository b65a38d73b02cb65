//! TOML file configuration structures.
//!
//! These structs directly map to the optional `--config` file. Every field
//! is optional here; required settings are enforced after the environment
//! has been consulted.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::{ConfigError, Setting};

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub trello: TrelloSection,
    #[serde(default)]
    pub zulip: ZulipSection,
    #[serde(default)]
    pub state: StateSection,
}

/// `[trello]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrelloSection {
    pub key: Option<String>,
    pub token: Option<String>,
    pub org: Option<String>,
    /// Override of the API root (`https://api.trello.com/1/`).
    pub api_url: Option<String>,
}

/// `[zulip]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ZulipSection {
    pub email: Option<String>,
    pub key: Option<String>,
    pub stream: Option<String>,
    /// Realm root, e.g. `https://acme.zulipchat.com`.
    pub site: Option<String>,
}

/// `[state]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateSection {
    pub watermark_file: Option<PathBuf>,
}

impl FileConfig {
    /// Read and parse the file at `path`.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Value of `setting` in this file, if present.
    pub fn setting(&self, setting: Setting) -> Option<&str> {
        match setting {
            Setting::TrelloKey => self.trello.key.as_deref(),
            Setting::TrelloToken => self.trello.token.as_deref(),
            Setting::TrelloOrg => self.trello.org.as_deref(),
            Setting::TrelloApiUrl => self.trello.api_url.as_deref(),
            Setting::ZulipEmail => self.zulip.email.as_deref(),
            Setting::ZulipKey => self.zulip.key.as_deref(),
            Setting::ZulipStream => self.zulip.stream.as_deref(),
            Setting::ZulipSite => self.zulip.site.as_deref(),
            Setting::WatermarkFile => self.state.watermark_file.as_deref().and_then(Path::to_str),
        }
    }
}
