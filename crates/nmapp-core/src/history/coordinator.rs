//! Optimistic delete with a single undo slot.
//!
//! `request_delete` removes an entry from the visible list at once and arms
//! a deadline. Until the deadline elapses `undo` puts the entry back and no
//! request is ever sent. When it elapses the deadline task issues the remote
//! delete itself and reports back as a [`HistoryNotice`]; a failed delete is
//! reported but the entry stays removed.
//!
//! The deadline task and `undo` race for a per-entry claim flag, so exactly
//! one of them wins: either the delete is sent or the entry is restored.
//! Tasks never touch the lists. Their outcomes wait in the coordinator's
//! inbox until the owner reads them through
//! [`DeleteCoordinator::next_notice`] or [`DeleteCoordinator::poll_notices`].

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::{HistoryRemote, filter_by_date_range};
use crate::api::HistoryEntry;
use crate::error::{ClientError, ClientResult};

/// Outcome of a remote delete, reported once per entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryNotice {
    Committed { entry_id: i64 },
    CommitFailed(ClientError),
}

/// The entry that `undo` would restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingUndo {
    pub entry: HistoryEntry,
    /// Position in the visible list at the time of removal
    pub original_index: usize,
    /// When the remote delete starts unless undone first
    pub deadline: Instant,
    fetched_index: Option<usize>,
    ticket: u64,
}

#[derive(Debug)]
enum TaskReport {
    Cancelled {
        ticket: u64,
    },
    DeleteSettled {
        ticket: u64,
        entry_id: i64,
        result: ClientResult<()>,
    },
}

#[derive(Debug)]
struct Scheduled {
    entry_id: i64,
    cancel: CancellationToken,
    /// Set by whichever side acts first: the deadline task or `undo`
    claimed: Arc<AtomicBool>,
}

/// Owns the history lists and the delete tasks.
///
/// Remote deletes run on their own once a deadline elapses. The owner should
/// still keep reading [`Self::next_notice`] (or call [`Self::drain`] before
/// shutting down) to learn their outcomes and to release finished entries.
pub struct DeleteCoordinator<R> {
    remote: Arc<R>,
    undo_window: Duration,
    /// Visible list, possibly filtered
    items: Vec<HistoryEntry>,
    /// Last fetched list minus locally removed entries
    fetched: Vec<HistoryEntry>,
    pending: Option<PendingUndo>,
    /// Armed or in-flight deletes by ticket, until their report is read
    scheduled: HashMap<u64, Scheduled>,
    next_ticket: u64,
    /// Spawned tasks whose report has not been processed yet
    outstanding: usize,
    inbox_tx: mpsc::UnboundedSender<TaskReport>,
    inbox_rx: mpsc::UnboundedReceiver<TaskReport>,
}

impl<R: HistoryRemote> DeleteCoordinator<R> {
    pub fn new(remote: R, undo_window: Duration) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        Self {
            remote: Arc::new(remote),
            undo_window,
            items: Vec::new(),
            fetched: Vec::new(),
            pending: None,
            scheduled: HashMap::new(),
            next_ticket: 0,
            outstanding: 0,
            inbox_tx,
            inbox_rx,
        }
    }

    pub fn undo_window(&self) -> Duration {
        self.undo_window
    }

    /// Current visible list in display order.
    pub fn list_visible(&self) -> &[HistoryEntry] {
        &self.items
    }

    /// The restorable entry, if its window is still open.
    pub fn pending(&self) -> Option<&PendingUndo> {
        self.pending.as_ref().filter(|p| Instant::now() < p.deadline)
    }

    /// Whether deadlines or deletes are still unresolved.
    pub fn has_outstanding(&self) -> bool {
        self.outstanding > 0
    }

    /// Replaces both the cached and the visible list.
    ///
    /// Entries already removed locally stay hidden until their delete
    /// resolves or they are restored.
    pub fn replace_entries(&mut self, entries: Vec<HistoryEntry>) {
        let entries: Vec<HistoryEntry> = entries
            .into_iter()
            .filter(|entry| !self.is_removed(entry.id))
            .collect();
        self.fetched.clone_from(&entries);
        self.items = entries;
    }

    /// Fetches the user's history and shows it unfiltered.
    ///
    /// # Errors
    /// Returns the remote error; the current lists are left untouched.
    pub async fn refresh(&mut self, user_id: i64) -> ClientResult<usize> {
        let entries = self.remote.list_entries(user_id).await?;
        self.replace_entries(entries);
        tracing::debug!(user_id, count = self.items.len(), "history refreshed");
        Ok(self.items.len())
    }

    /// Removes the visible entry at `index` and arms its undo deadline.
    ///
    /// A previous pending undo is superseded without being restored; its
    /// delete still runs on its own deadline.
    ///
    /// # Errors
    /// Returns a validation error if `index` is out of range.
    pub fn request_delete(&mut self, index: usize) -> ClientResult<HistoryEntry> {
        if index >= self.items.len() {
            return Err(ClientError::validation(format!(
                "No history entry at index {index} ({} shown)",
                self.items.len()
            )));
        }

        let entry = self.items.remove(index);
        let fetched_index = self.fetched.iter().position(|e| e.id == entry.id);
        if let Some(i) = fetched_index {
            self.fetched.remove(i);
        }

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        let deadline = Instant::now() + self.undo_window;
        let scheduled = Scheduled {
            entry_id: entry.id,
            cancel: CancellationToken::new(),
            claimed: Arc::new(AtomicBool::new(false)),
        };
        self.spawn_deadline(ticket, deadline, &scheduled);
        self.scheduled.insert(ticket, scheduled);

        let superseded = self.pending.replace(PendingUndo {
            entry: entry.clone(),
            original_index: index,
            deadline,
            fetched_index,
            ticket,
        });
        if let Some(previous) = superseded {
            tracing::debug!(entry_id = previous.entry.id, "undo superseded");
        }

        tracing::info!(entry_id = entry.id, index, "history entry removed");
        Ok(entry)
    }

    /// Restores the pending entry and cancels its delete.
    ///
    /// Returns `None` when nothing is pending or the deadline has already
    /// passed; in that case the delete goes ahead.
    pub fn undo(&mut self) -> Option<HistoryEntry> {
        let pending = self.pending.take()?;
        if Instant::now() >= pending.deadline {
            tracing::debug!(entry_id = pending.entry.id, "undo window closed");
            return None;
        }
        if let Some(scheduled) = self.scheduled.get(&pending.ticket) {
            if scheduled.claimed.swap(true, Ordering::AcqRel) {
                return None;
            }
            scheduled.cancel.cancel();
        }
        self.scheduled.remove(&pending.ticket);

        let index = pending.original_index.min(self.items.len());
        self.items.insert(index, pending.entry.clone());
        if let Some(i) = pending.fetched_index {
            let i = i.min(self.fetched.len());
            self.fetched.insert(i, pending.entry.clone());
        }

        tracing::info!(entry_id = pending.entry.id, index, "history entry restored");
        Some(pending.entry)
    }

    /// Entries of the cached list downloaded strictly between the bounds.
    pub fn apply_date_range_filter(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Vec<HistoryEntry> {
        filter_by_date_range(&self.fetched, from, to)
    }

    /// Shows only the entries inside the range. Returns the visible count.
    pub fn show_filtered(&mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> usize {
        self.items = self.apply_date_range_filter(from, to);
        self.items.len()
    }

    /// Shows the whole cached list again.
    pub fn clear_filter(&mut self) {
        self.items.clone_from(&self.fetched);
    }

    /// Waits for the next delete outcome.
    ///
    /// Returns `None` once nothing is outstanding. Cancel safe, so it can sit
    /// in a `select!` next to user input.
    pub async fn next_notice(&mut self) -> Option<HistoryNotice> {
        while self.outstanding > 0 {
            let report = self.inbox_rx.recv().await?;
            if let Some(notice) = self.handle(report) {
                return Some(notice);
            }
        }
        None
    }

    /// Processes whatever reports have already arrived without waiting.
    pub fn poll_notices(&mut self) -> Vec<HistoryNotice> {
        let mut notices = Vec::new();
        while let Ok(report) = self.inbox_rx.try_recv() {
            notices.extend(self.handle(report));
        }
        notices
    }

    /// Waits until every armed deadline and started delete has resolved.
    pub async fn drain(&mut self) -> Vec<HistoryNotice> {
        let mut notices = Vec::new();
        while let Some(notice) = self.next_notice().await {
            notices.push(notice);
        }
        notices
    }

    fn is_removed(&self, id: i64) -> bool {
        self.scheduled.values().any(|s| s.entry_id == id)
    }

    fn handle(&mut self, report: TaskReport) -> Option<HistoryNotice> {
        self.outstanding = self.outstanding.saturating_sub(1);
        match report {
            // undo already dropped the ticket
            TaskReport::Cancelled { ticket } => {
                self.scheduled.remove(&ticket);
                None
            }
            TaskReport::DeleteSettled {
                ticket,
                entry_id,
                result,
            } => {
                self.scheduled.remove(&ticket);
                if self.pending.as_ref().is_some_and(|p| p.ticket == ticket) {
                    self.pending = None;
                }
                match result {
                    Ok(()) => {
                        tracing::info!(entry_id, "history delete committed");
                        Some(HistoryNotice::Committed { entry_id })
                    }
                    Err(err) => {
                        tracing::warn!(entry_id, error = %err, "history delete failed");
                        Some(HistoryNotice::CommitFailed(err.into_delete_commit(entry_id)))
                    }
                }
            }
        }
    }

    /// Sleeps until `deadline`, then sends the delete unless `undo` got
    /// there first.
    fn spawn_deadline(&mut self, ticket: u64, deadline: Instant, scheduled: &Scheduled) {
        let tx = self.inbox_tx.clone();
        let remote = Arc::clone(&self.remote);
        let entry_id = scheduled.entry_id;
        let cancel = scheduled.cancel.clone();
        let claimed = Arc::clone(&scheduled.claimed);
        self.outstanding += 1;
        tokio::spawn(async move {
            let elapsed = tokio::select! {
                biased;
                () = cancel.cancelled() => false,
                () = tokio::time::sleep_until(deadline) => true,
            };
            if !elapsed || claimed.swap(true, Ordering::AcqRel) {
                let _ = tx.send(TaskReport::Cancelled { ticket });
                return;
            }

            tracing::debug!(entry_id, "history delete started");
            let result = remote.delete_entry(entry_id).await;
            let _ = tx.send(TaskReport::DeleteSettled {
                ticket,
                entry_id,
                result,
            });
        });
    }
}
