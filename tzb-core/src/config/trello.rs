//! Trello access configuration.

use tzb_sdk::client::TrelloClient;
use url::Url;

/// Credentials and scope for reading the activity feed.
#[derive(Debug, Clone)]
pub struct TrelloConfig {
    /// API root, normally `https://api.trello.com/1/`.
    pub api_url: Url,
    pub key: String,
    pub token: String,
    /// Organization whose boards are polled.
    pub organization: String,
}

impl TrelloConfig {
    /// Build a client for this configuration.
    pub fn client(&self) -> TrelloClient {
        TrelloClient::new(
            self.api_url.clone(),
            &self.key,
            &self.token,
            &self.organization,
        )
    }
}
