#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::panic))]
#![forbid(unsafe_code)]

pub mod config;
pub mod events;
pub mod processors;
pub mod render;
pub mod transport;
pub mod utils;
pub mod watermark;
