//! Storage seam for the workflow
//!
//! The engine owns data shapes and protocol, not persistence
//! technology. [`ChangeStore`] is the narrow async seam a backend has
//! to satisfy; [`MemoryStore`] is the reference implementation used by
//! tests and the simulate binary.

use async_trait::async_trait;
use changeflow_model::{
    ApprovalRecord, ChangeId, ChangeRequest, HistoryEntry, Link, LinkTarget, ScheduleWindow,
};
use dashmap::DashMap;

/// Storage-layer failure; non-retryable at this layer
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// The underlying store cannot be reached
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence operations the workflow needs.
///
/// History is append-only by construction: there is no update or
/// delete for entries anywhere on this trait.
#[async_trait]
pub trait ChangeStore: Send + Sync {
    /// Insert a new change aggregate
    async fn insert_change(&self, change: ChangeRequest) -> Result<(), StoreError>;

    /// Fetch a change by id
    async fn get_change(&self, id: ChangeId) -> Result<Option<ChangeRequest>, StoreError>;

    /// Overwrite an existing change aggregate
    async fn put_change(&self, change: ChangeRequest) -> Result<(), StoreError>;

    /// Insert or replace the (change, approver) approval record
    async fn upsert_approval(&self, record: ApprovalRecord) -> Result<(), StoreError>;

    /// All approval records for a change
    async fn approvals(&self, id: ChangeId) -> Result<Vec<ApprovalRecord>, StoreError>;

    /// The change's schedule window, if one exists
    async fn get_window(&self, id: ChangeId) -> Result<Option<ScheduleWindow>, StoreError>;

    /// Create or replace the change's schedule window
    async fn put_window(&self, window: ScheduleWindow) -> Result<(), StoreError>;

    /// Insert a link; returns false when the (change, target) pair
    /// already exists
    async fn insert_link(&self, link: Link) -> Result<bool, StoreError>;

    /// Remove a link; returns false when no such pair exists
    async fn remove_link(&self, id: ChangeId, target: LinkTarget) -> Result<bool, StoreError>;

    /// All links for a change
    async fn links(&self, id: ChangeId) -> Result<Vec<Link>, StoreError>;

    /// Append one immutable history entry
    async fn append_history(&self, entry: HistoryEntry) -> Result<(), StoreError>;

    /// The change's history, newest first
    async fn history(&self, id: ChangeId) -> Result<Vec<HistoryEntry>, StoreError>;
}

/// In-memory reference store backed by per-collection [`DashMap`]s
#[derive(Debug, Default)]
pub struct MemoryStore {
    changes: DashMap<ChangeId, ChangeRequest>,
    approvals: DashMap<ChangeId, Vec<ApprovalRecord>>,
    windows: DashMap<ChangeId, ScheduleWindow>,
    links: DashMap<ChangeId, Vec<Link>>,
    history: DashMap<ChangeId, Vec<HistoryEntry>>,
}

impl MemoryStore {
    /// Create an empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChangeStore for MemoryStore {
    async fn insert_change(&self, change: ChangeRequest) -> Result<(), StoreError> {
        self.changes.insert(change.id, change);
        Ok(())
    }

    async fn get_change(&self, id: ChangeId) -> Result<Option<ChangeRequest>, StoreError> {
        Ok(self.changes.get(&id).map(|c| c.clone()))
    }

    async fn put_change(&self, change: ChangeRequest) -> Result<(), StoreError> {
        self.changes.insert(change.id, change);
        Ok(())
    }

    async fn upsert_approval(&self, record: ApprovalRecord) -> Result<(), StoreError> {
        let mut records = self.approvals.entry(record.change_id).or_default();
        match records.iter_mut().find(|r| r.approver == record.approver) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
        Ok(())
    }

    async fn approvals(&self, id: ChangeId) -> Result<Vec<ApprovalRecord>, StoreError> {
        Ok(self.approvals.get(&id).map(|r| r.clone()).unwrap_or_default())
    }

    async fn get_window(&self, id: ChangeId) -> Result<Option<ScheduleWindow>, StoreError> {
        Ok(self.windows.get(&id).map(|w| w.clone()))
    }

    async fn put_window(&self, window: ScheduleWindow) -> Result<(), StoreError> {
        self.windows.insert(window.change_id, window);
        Ok(())
    }

    async fn insert_link(&self, link: Link) -> Result<bool, StoreError> {
        let mut links = self.links.entry(link.change_id).or_default();
        if links.iter().any(|l| l.target == link.target) {
            return Ok(false);
        }
        links.push(link);
        Ok(true)
    }

    async fn remove_link(&self, id: ChangeId, target: LinkTarget) -> Result<bool, StoreError> {
        let mut removed = false;
        if let Some(mut links) = self.links.get_mut(&id) {
            let before = links.len();
            links.retain(|l| l.target != target);
            removed = links.len() != before;
        }
        Ok(removed)
    }

    async fn links(&self, id: ChangeId) -> Result<Vec<Link>, StoreError> {
        Ok(self.links.get(&id).map(|l| l.clone()).unwrap_or_default())
    }

    async fn append_history(&self, entry: HistoryEntry) -> Result<(), StoreError> {
        self.history.entry(entry.change_id).or_default().push(entry);
        Ok(())
    }

    async fn history(&self, id: ChangeId) -> Result<Vec<HistoryEntry>, StoreError> {
        let mut entries = self.history.get(&id).map(|h| h.clone()).unwrap_or_default();
        // Stored in append order; callers get newest first.
        entries.reverse();
        Ok(entries)
    }
}
