//! Download history: listing, date filtering and optimistic delete with undo.

mod coordinator;

use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};
pub use coordinator::{DeleteCoordinator, HistoryNotice, PendingUndo};

use crate::api::{ApiClient, HistoryEntry};
use crate::error::{ClientError, ClientResult};

/// Remote side of the history list.
pub trait HistoryRemote: Send + Sync + 'static {
    fn list_entries(
        &self,
        user_id: i64,
    ) -> impl Future<Output = ClientResult<Vec<HistoryEntry>>> + Send;

    fn delete_entry(&self, id: i64) -> impl Future<Output = ClientResult<()>> + Send;
}

impl HistoryRemote for ApiClient {
    fn list_entries(
        &self,
        user_id: i64,
    ) -> impl Future<Output = ClientResult<Vec<HistoryEntry>>> + Send {
        self.list_history(user_id)
    }

    fn delete_entry(&self, id: i64) -> impl Future<Output = ClientResult<()>> + Send {
        self.delete_history(id)
    }
}

/// Entries downloaded strictly between `from` and `to`, order preserved.
pub fn filter_by_date_range(
    entries: &[HistoryEntry],
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Vec<HistoryEntry> {
    entries
        .iter()
        .filter(|entry| entry.downloaded_at > from && entry.downloaded_at < to)
        .cloned()
        .collect()
}

/// Parses a user-supplied bound: a full timestamp or a `YYYY-MM-DD` date
/// (midnight UTC).
///
/// # Errors
/// Returns a validation error naming the rejected input.
pub fn parse_bound(raw: &str) -> ClientResult<DateTime<Utc>> {
    let raw = raw.trim();
    if let Some(ts) = crate::api::parse_timestamp(raw) {
        return Ok(ts);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ClientError::validation(format!("Invalid date: {raw}")))
}
