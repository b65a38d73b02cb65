//! Trello organization activity payload.
//!
//! Actions are kept as raw [`serde_json::Value`]s: their `data` shape depends
//! on the action type and Trello does not publish a schema for it.

use serde::{Deserialize, Serialize};

/// Number of actions requested per board and per organization.
pub const ACTIONS_LIMIT: u32 = 1000;

/// Response of `GET /1/organization/{org}` with board actions expanded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrganizationActivity {
    pub boards: Vec<BoardActivity>,
}

/// One board and the actions recorded on it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardActivity {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub actions: Vec<serde_json::Value>,
}

impl OrganizationActivity {
    /// Parse a raw response body.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Total number of actions across all boards.
    pub fn action_count(&self) -> usize {
        self.boards.iter().map(|b| b.actions.len()).sum()
    }
}
