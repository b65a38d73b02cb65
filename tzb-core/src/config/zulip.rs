//! Zulip access configuration.

use tzb_sdk::client::{ClientError, ZulipClient};
use url::Url;

use crate::transport::StreamSink;

/// Credentials and destination for posting messages.
#[derive(Debug, Clone)]
pub struct ZulipConfig {
    /// Realm root, e.g. `https://zulip.com`.
    pub site: Url,
    /// Bot account email, used as the basic auth user.
    pub email: String,
    pub api_key: String,
    /// Stream every message is posted to.
    pub stream: String,
}

impl ZulipConfig {
    /// Build a sink posting to the configured stream.
    pub fn sink(&self) -> Result<StreamSink, ClientError> {
        let client = ZulipClient::new(&self.site, &self.email, &self.api_key)?;
        Ok(StreamSink::new(client, &self.stream))
    }
}
