//! Append-only audit recorder
//!
//! Pure write-append over the store's history collection. Entries are
//! immutable once written; no update or delete exists anywhere in the
//! engine.

use crate::error::WorkflowError;
use crate::store::ChangeStore;
use changeflow_model::{ChangeId, EntryId, HistoryAction, HistoryDetails, HistoryEntry, UserId};
use chrono::Utc;
use std::sync::Arc;

/// Appends and lists a change's audit trail
#[derive(Clone)]
pub struct AuditRecorder {
    store: Arc<dyn ChangeStore>,
}

impl AuditRecorder {
    /// Create a recorder over a store
    #[inline]
    #[must_use]
    pub fn new(store: Arc<dyn ChangeStore>) -> Self {
        Self { store }
    }

    /// Append one entry.
    ///
    /// A failure here after a successful state mutation is a fatal
    /// inconsistency; callers surface it, never swallow it.
    pub async fn append(
        &self,
        change_id: ChangeId,
        actor: UserId,
        action: HistoryAction,
        details: HistoryDetails,
    ) -> Result<EntryId, WorkflowError> {
        let entry = HistoryEntry {
            id: EntryId::new(),
            change_id,
            actor,
            action,
            details,
            recorded_at: Utc::now(),
        };
        let id = entry.id;
        self.store.append_history(entry).await.map_err(|e| {
            tracing::error!(
                change = %change_id,
                action = action.as_str(),
                error = %e,
                "history append failed; audit trail is inconsistent"
            );
            WorkflowError::from(e)
        })?;
        Ok(id)
    }

    /// The change's full audit trail, newest first
    pub async fn list(&self, change_id: ChangeId) -> Result<Vec<HistoryEntry>, WorkflowError> {
        Ok(self.store.history(change_id).await?)
    }
}
