//! Zulip messages client.

use reqwest::Client;
use url::Url;

use super::{ClientError, default_http_client, ensure_success};
use crate::objects::zulip::StreamMessage;

/// Typed HTTP client for the Zulip **messages** endpoint.
///
/// Authenticates with HTTP basic auth (bot email + API key).
#[derive(Debug, Clone)]
pub struct ZulipClient {
    http: Client,
    messages_url: Url,
    email: String,
    api_key: String,
}

impl ZulipClient {
    pub const DEFAULT_SITE: &'static str = "https://zulip.com";

    /// Create a new `ZulipClient` for the realm served at `site`.
    pub fn new(
        site: &Url,
        email: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, ClientError> {
        Ok(Self {
            http: default_http_client(),
            messages_url: site.join("api/v1/messages")?,
            email: email.into(),
            api_key: api_key.into(),
        })
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    pub fn messages_url(&self) -> &Url {
        &self.messages_url
    }

    /// `POST /api/v1/messages` – send one message to a stream topic.
    pub async fn send_stream_message(&self, message: &StreamMessage) -> Result<(), ClientError> {
        let resp = self
            .http
            .post(self.messages_url.clone())
            .basic_auth(&self.email, Some(&self.api_key))
            .form(message)
            .send()
            .await?;

        ensure_success(resp).await?;
        Ok(())
    }
}
