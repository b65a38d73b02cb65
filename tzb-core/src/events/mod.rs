//! Board activity events.
//!
//! An [`ActivityBatch`] is one fetched payload: every board's actions merged
//! into a single sequence ordered by `date`. Each action is wrapped in an
//! [`EventRecord`] that exposes the fields the renderer needs.

pub mod batch;
pub mod record;

pub use batch::{ActivityBatch, BatchError};
pub use record::{EventRecord, UNKNOWN};
