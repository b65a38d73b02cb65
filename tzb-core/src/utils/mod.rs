pub mod subject;
pub mod timestamp;
