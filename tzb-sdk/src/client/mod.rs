//! HTTP clients for the Trello and Zulip APIs.
//!
//! Gated behind the `client` cargo feature so downstream crates that only
//! need the wire objects do not pull in `reqwest`.

mod trello;
mod zulip;

pub use trello::TrelloClient;
pub use zulip::ZulipClient;

use reqwest::StatusCode;
use std::time::Duration;

/// Per-request timeout applied to the default HTTP client.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors produced by the SDK HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level failure (DNS, TLS, connection reset, timeout, …).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server returned a non-2xx status code.
    #[error("api error: status {status}, body: {body}")]
    Api { status: StatusCode, body: String },

    /// The base URL could not be joined with the endpoint path.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

/// Build the default `reqwest::Client` used by both API clients.
pub(crate) fn default_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Turn a non-2xx response into [`ClientError::Api`].
pub(crate) async fn ensure_success(
    resp: reqwest::Response,
) -> Result<reqwest::Response, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ClientError::Api { status, body });
    }
    Ok(resp)
}
