//! Append-only audit trail entries
//!
//! Entries are created once and never mutated or deleted; the ordered
//! sequence of a change's entries is its audit trail.

use crate::ids::{ChangeId, EntryId, UserId};
use crate::link::LinkKind;
use crate::status::ChangeStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Named action an entry records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    /// Change created
    Created,
    /// Fields updated (one batched entry per patch)
    Updated,
    /// Status moved along an edge
    StatusChanged,
    /// An approver voted to advance
    Approved,
    /// An approver voted to terminate
    Rejected,
    /// Schedule window created
    Scheduled,
    /// Schedule window updated
    ScheduleUpdated,
    /// Ticket linked
    LinkedTicket,
    /// Ticket unlinked
    UnlinkedTicket,
    /// Problem linked
    LinkedProblem,
    /// Problem unlinked
    UnlinkedProblem,
}

impl HistoryAction {
    /// Stable lowercase name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            HistoryAction::Created => "created",
            HistoryAction::Updated => "updated",
            HistoryAction::StatusChanged => "status_changed",
            HistoryAction::Approved => "approved",
            HistoryAction::Rejected => "rejected",
            HistoryAction::Scheduled => "scheduled",
            HistoryAction::ScheduleUpdated => "schedule_updated",
            HistoryAction::LinkedTicket => "linked_ticket",
            HistoryAction::UnlinkedTicket => "unlinked_ticket",
            HistoryAction::LinkedProblem => "linked_problem",
            HistoryAction::UnlinkedProblem => "unlinked_problem",
        }
    }

    /// Link action for a kind
    #[must_use]
    pub fn linked(kind: LinkKind) -> Self {
        match kind {
            LinkKind::Ticket => HistoryAction::LinkedTicket,
            LinkKind::Problem => HistoryAction::LinkedProblem,
        }
    }

    /// Unlink action for a kind
    #[must_use]
    pub fn unlinked(kind: LinkKind) -> Self {
        match kind {
            LinkKind::Ticket => HistoryAction::UnlinkedTicket,
            LinkKind::Problem => HistoryAction::UnlinkedProblem,
        }
    }
}

/// One field-level `{from, to}` diff inside an `updated` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    /// Field name
    pub field: String,
    /// Value before the update (`null` when previously unset)
    pub from: serde_json::Value,
    /// Value after the update (`null` when cleared)
    pub to: serde_json::Value,
}

impl FieldChange {
    /// Build a diff from serializable before/after values.
    ///
    /// Serialization of plain scalars and `Option`s cannot fail, so
    /// failures collapse to `null`.
    #[must_use]
    pub fn new<F: Serialize, T: Serialize>(field: impl Into<String>, from: &F, to: &T) -> Self {
        Self {
            field: field.into(),
            from: serde_json::to_value(from).unwrap_or(serde_json::Value::Null),
            to: serde_json::to_value(to).unwrap_or(serde_json::Value::Null),
        }
    }
}

/// Point-in-time view of a schedule window, for before/after payloads
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowSnapshot {
    /// Scheduled start
    pub scheduled_start: Option<DateTime<Utc>>,
    /// Scheduled end
    pub scheduled_end: Option<DateTime<Utc>>,
    /// Actual start
    pub actual_start: Option<DateTime<Utc>>,
    /// Actual end
    pub actual_end: Option<DateTime<Utc>>,
}

/// Structured payload of a history entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "detail", rename_all = "snake_case")]
pub enum HistoryDetails {
    /// Creation summary
    Created {
        /// Title at creation time
        title: String,
    },
    /// Batched field diffs for one update
    Fields {
        /// Every touched field whose value differed
        changes: Vec<FieldChange>,
    },
    /// A status edge
    Status {
        /// Status before
        from: ChangeStatus,
        /// Status after
        to: ChangeStatus,
    },
    /// An approval verdict
    Approval {
        /// Who voted
        approver: UserId,
        /// Optional rationale
        comment: Option<String>,
    },
    /// Schedule window creation or update
    Window {
        /// Window before the write; `None` on creation
        before: Option<WindowSnapshot>,
        /// Window after the write
        after: WindowSnapshot,
    },
    /// A link or unlink against another entity
    Link {
        /// Ticket or problem
        kind: LinkKind,
        /// The other entity's id, rendered opaque
        other_id: String,
    },
}

/// One immutable audit record of an action against a change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Entry identity
    pub id: EntryId,
    /// The change acted upon
    pub change_id: ChangeId,
    /// Who acted
    pub actor: UserId,
    /// What happened
    pub action: HistoryAction,
    /// Structured detail payload
    pub details: HistoryDetails,
    /// When it happened
    pub recorded_at: DateTime<Utc>,
}
