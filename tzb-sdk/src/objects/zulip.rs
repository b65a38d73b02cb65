//! Zulip stream message.

use serde::Serialize;

/// Form body for `POST /api/v1/messages` addressed to a stream topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamMessage {
    #[serde(rename = "type")]
    kind: &'static str,
    pub to: String,
    pub subject: String,
    pub content: String,
}

impl StreamMessage {
    pub fn new(
        stream: impl Into<String>,
        subject: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            kind: "stream",
            to: stream.into(),
            subject: subject.into(),
            content: content.into(),
        }
    }
}
