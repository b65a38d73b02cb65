//! Processors that drive the bridge.
//!
//! - `PollLoop`: fetches activity since the watermark, renders it, posts
//!   the messages and persists progress.

pub mod poll_loop;

pub use poll_loop::{CycleOutcome, CycleReport, PollError, PollLoop, PollOptions};
