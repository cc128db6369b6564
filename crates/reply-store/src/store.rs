//! Storage trait and list formatting

use reply_types::{LockSpec, ResponseRow};

use crate::error::Result;

/// Display budget per response field when listing truncated rows:
/// pattern, message, mention flag, emoji.
pub const FIELD_BUDGETS: [usize; 4] = [8, 12, 1, 1];

/// Marker appended to a shortened field.
const ELLIPSIS: &str = "..";

/// A response table row as shown by `!list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedRow {
    /// 0-based position in the table.
    pub index: usize,
    pub fields: Vec<String>,
}

/// Persistent response table and lock table.
///
/// Implemented by [`crate::CsvStore`]. Mutations return `Ok(false)` for
/// malformed input or an out-of-range index and leave the backing data
/// untouched in that case.
pub trait ResponseStore: Send + Sync {
    /// Human-readable name of the response table.
    fn identifier(&self) -> String;

    /// Raw rows, optionally limited to the one at `index` and truncated for
    /// columnar display.
    fn list(&self, truncate: bool, index: Option<usize>) -> Result<Vec<ListedRow>>;

    /// Every row, validated.
    fn rows(&self) -> Result<Vec<ResponseRow>>;

    /// Append one CSV row.
    fn add(&self, raw: &str) -> Result<bool>;

    /// Remove the row at `index`.
    fn delete(&self, index: usize) -> Result<bool>;

    /// One lock per admin command slot, defaults filling missing rows.
    fn get_locks(&self) -> Result<Vec<LockSpec>>;

    /// Write the same lock to every slot; `reset` writes the default lock.
    fn set_locks(&self, raw: &str, reset: bool) -> Result<bool>;

    /// Replace the lock of a single slot.
    fn set_lock(&self, slot: usize, raw: &str) -> Result<bool>;
}

/// Shorten `value` to `budget` characters plus `..` when it exceeds
/// `budget + 2` characters, then pad to `budget + 2`.
pub fn truncate_field(value: &str, budget: usize) -> String {
    let width = budget + ELLIPSIS.len();
    let shortened = if value.chars().count() > width {
        let mut s: String = value.chars().take(budget).collect();
        s.push_str(ELLIPSIS);
        s
    } else {
        value.to_string()
    };
    format!("{:<width$}", shortened, width = width)
}

/// Truncate a row's fields against [`FIELD_BUDGETS`]; extra fields are dropped.
pub fn truncate_fields<S: AsRef<str>>(fields: &[S]) -> Vec<String> {
    fields
        .iter()
        .zip(FIELD_BUDGETS)
        .map(|(value, budget)| truncate_field(value.as_ref(), budget))
        .collect()
}
