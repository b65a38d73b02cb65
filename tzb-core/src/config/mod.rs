//! Configuration types for the bridge.
//!
//! These types represent the validated runtime configuration. Loading it
//! from the environment and config files is handled by the binary crate.

mod trello;
mod zulip;

pub use trello::TrelloConfig;
pub use zulip::ZulipConfig;

use std::path::PathBuf;

/// Everything the bridge needs to run.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub trello: TrelloConfig,
    pub zulip: ZulipConfig,
    /// File holding the watermark between runs.
    pub watermark_file: PathBuf,
}
