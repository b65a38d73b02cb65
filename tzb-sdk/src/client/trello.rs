//! Trello REST client.

use reqwest::Client;
use url::Url;

use super::{ClientError, default_http_client, ensure_success};
use crate::objects::trello::ACTIONS_LIMIT;

/// Typed HTTP client for the Trello organization activity feed.
///
/// Authenticates with the key/token pair as query parameters.
#[derive(Debug, Clone)]
pub struct TrelloClient {
    http: Client,
    base_url: Url,
    key: String,
    token: String,
    organization: String,
}

impl TrelloClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.trello.com/1/";

    /// Create a new `TrelloClient`.
    ///
    /// * `base_url` – API root, normally [`Self::DEFAULT_BASE_URL`].
    /// * `organization` – organization id or short name whose boards are read.
    pub fn new(
        base_url: Url,
        key: impl Into<String>,
        token: impl Into<String>,
        organization: impl Into<String>,
    ) -> Self {
        Self {
            http: default_http_client(),
            base_url,
            key: key.into(),
            token: token.into(),
            organization: organization.into(),
        }
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// URL of the organization resource.
    pub fn organization_url(&self) -> Result<Url, ClientError> {
        let path = format!("organization/{}", urlencoding::encode(&self.organization));
        Ok(self.base_url.join(&path)?)
    }

    /// `GET /1/organization/{org}` – every board of the organization with
    /// the actions recorded after `since`.
    ///
    /// Returns the raw response body; callers decide how to parse it.
    pub async fn organization_actions(&self, since: &str) -> Result<String, ClientError> {
        let limit = ACTIONS_LIMIT.to_string();
        let resp = self
            .http
            .get(self.organization_url()?)
            .query(&[
                ("key", self.key.as_str()),
                ("token", self.token.as_str()),
                ("actions", "all"),
                ("actions_limit", limit.as_str()),
                ("fields", "none"),
                ("boards", "organization"),
                ("board_fields", "name"),
                ("board_actions", "all"),
                ("board_actions_limit", limit.as_str()),
                ("board_actions_since", since),
            ])
            .send()
            .await?;

        let resp = ensure_success(resp).await?;
        Ok(resp.text().await?)
    }
}
