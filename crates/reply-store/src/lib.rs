//! Persistent response and lock tables for reply-bot

pub mod csv_store;
pub mod error;
pub mod store;

pub use csv_store::{CsvStore, DEFAULT_LOCKS_FILE, DEFAULT_RESPONSES_FILE};
pub use error::{Error, Result};
pub use store::{truncate_field, truncate_fields, ListedRow, ResponseStore, FIELD_BUDGETS};
