//! Parsing and ordering of fetched activity payloads.

use itertools::Itertools;
use thiserror::Error;
use tzb_sdk::objects::OrganizationActivity;

use super::EventRecord;

/// Errors that make a payload unusable.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The payload is not an organization activity document.
    #[error("malformed activity payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// An action lacks one of the fields every action carries.
    #[error("activity event has no string `{field}` field")]
    MissingField { field: &'static str },
}

/// All events of one payload, merged across boards and sorted by `date`.
///
/// The sort is stable: events sharing a `date` keep their payload order.
#[derive(Debug, Clone, Default)]
pub struct ActivityBatch {
    events: Vec<EventRecord>,
}

impl ActivityBatch {
    /// Parse a raw payload as returned by the activity feed.
    pub fn from_json(text: &str) -> Result<Self, BatchError> {
        Self::from_activity(OrganizationActivity::from_json(text)?)
    }

    pub fn from_activity(activity: OrganizationActivity) -> Result<Self, BatchError> {
        let events = activity
            .boards
            .into_iter()
            .flat_map(|board| board.actions)
            .map(EventRecord::from_value)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_events(events))
    }

    pub fn from_events(events: Vec<EventRecord>) -> Self {
        let events = events
            .into_iter()
            .sorted_by(|a, b| a.date().cmp(b.date()))
            .collect();
        Self { events }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EventRecord> {
        self.events.iter()
    }

    /// Date of the newest event, if any.
    pub fn latest_date(&self) -> Option<&str> {
        self.events.last().map(EventRecord::date)
    }
}

impl IntoIterator for ActivityBatch {
    type Item = EventRecord;
    type IntoIter = std::vec::IntoIter<EventRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

impl<'a> IntoIterator for &'a ActivityBatch {
    type Item = &'a EventRecord;
    type IntoIter = std::slice::Iter<'a, EventRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
