pub mod trello;
pub mod zulip;

pub use trello::{BoardActivity, OrganizationActivity};
pub use zulip::StreamMessage;
