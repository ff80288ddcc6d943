//! Record types and formatting for LogShip

pub mod record;

pub use record::{Record, RecordFields, RecordFormatter};
