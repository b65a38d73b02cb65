//! Wire objects and HTTP clients for the two APIs the bridge talks to.
//!
//! - [`objects::trello`]: the organization activity payload returned by Trello.
//! - [`objects::zulip`]: the stream message form accepted by Zulip.
//! - [`client`]: typed `reqwest` clients, behind the `client` cargo feature.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

#[cfg(feature = "client")]
pub mod client;
pub mod objects;
