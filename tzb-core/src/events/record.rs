//! Read-only view over one raw Trello action.

use serde_json::Value;

use super::BatchError;
use crate::utils::subject::shorten_subject;

/// Placeholder for names that are absent from an event.
pub const UNKNOWN: &str = "<unknown>";

const CARD_URL_BASE: &str = "https://trello.com/c/";
const BOARD_URL_BASE: &str = "https://trello.com/board/";

/// One activity event.
///
/// `type` and `date` are validated on construction; everything else lives
/// in the loosely typed `data` object and is looked up on demand. Accessors
/// for optional fields return `Option`, so every use is presence-checked.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    kind: String,
    date: String,
    raw: Value,
}

impl EventRecord {
    /// Wrap a raw action. Fails if `type` or `date` is not a string.
    pub fn from_value(raw: Value) -> Result<Self, BatchError> {
        let kind = required_str(&raw, "type")?;
        let date = required_str(&raw, "date")?;
        Ok(Self { kind, date, raw })
    }

    /// The action type tag, e.g. `createCard`.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Full name of the member who performed the action.
    pub fn creator_name(&self) -> &str {
        self.raw
            .pointer("/memberCreator/fullName")
            .and_then(Value::as_str)
            .unwrap_or(UNKNOWN)
    }

    /// Look up a JSON pointer (e.g. `/card/name`) inside `data`.
    pub fn data(&self, pointer: &str) -> Option<&Value> {
        self.raw.get("data")?.pointer(pointer)
    }

    /// Like [`data`](Self::data) but only for string values.
    pub fn data_str(&self, pointer: &str) -> Option<&str> {
        self.data(pointer).and_then(Value::as_str)
    }

    /// Look up a JSON pointer at the top level of the action.
    pub fn field(&self, pointer: &str) -> Option<&Value> {
        self.raw.pointer(pointer)
    }

    pub fn has_board_name(&self) -> bool {
        self.board_name().is_some()
    }

    pub fn board_name(&self) -> Option<&str> {
        self.data_str("/board/name")
    }

    pub fn board_url(&self) -> Option<String> {
        self.data_str("/board/id")
            .map(|id| format!("{BOARD_URL_BASE}{id}"))
    }

    pub fn has_card_name(&self) -> bool {
        self.card_name().is_some()
    }

    pub fn card_name(&self) -> Option<&str> {
        self.data_str("/card/name")
    }

    pub fn card_url(&self) -> Option<String> {
        self.data_str("/card/id").map(|id| format!("{CARD_URL_BASE}{id}"))
    }

    /// `[card name](card url)`, if both are present.
    pub fn card_link(&self) -> Option<String> {
        Some(markdown_link(self.card_name()?, &self.card_url()?))
    }

    /// `[board name](board url)`, if both are present.
    pub fn board_link(&self) -> Option<String> {
        Some(markdown_link(self.board_name()?, &self.board_url()?))
    }

    /// Topic for the chat message: the card name, else the board name, else
    /// [`UNKNOWN`]; shortened to the chat service's subject limit.
    pub fn derive_subject(&self) -> String {
        let subject = self
            .card_name()
            .or_else(|| self.board_name())
            .unwrap_or(UNKNOWN);
        shorten_subject(subject)
    }
}

fn required_str(raw: &Value, field: &'static str) -> Result<String, BatchError> {
    raw.get(field)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or(BatchError::MissingField { field })
}

pub(crate) fn markdown_link(text: &str, url: &str) -> String {
    format!("[{text}]({url})")
}
