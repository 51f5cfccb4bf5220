//! Error taxonomy for the workflow engine
//!
//! Every rejected operation names the specific condition that failed
//! (which edge, which date pair, which link target) so callers can
//! render an actionable message. Validation errors are detected before
//! any mutation; only [`WorkflowError::StorageUnavailable`] is
//! eligible for caller-directed retry.

use crate::collaborators::CollaboratorError;
use crate::store::StoreError;
use changeflow_model::{ChangeId, ChangeStatus, LinkTarget, Role, UserId};
use chrono::{DateTime, Utc};
use std::fmt;

/// Which date pair failed range validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePair {
    /// `planned_start`/`planned_end` on the change
    Planned,
    /// `scheduled_start`/`scheduled_end` on the window
    Scheduled,
    /// `actual_start`/`actual_end`
    Actual,
}

impl DatePair {
    /// Stable lowercase name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DatePair::Planned => "planned",
            DatePair::Scheduled => "scheduled",
            DatePair::Actual => "actual",
        }
    }
}

impl fmt::Display for DatePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an operation was forbidden for the acting user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForbiddenReason {
    /// The edge or operation requires at least this role
    RoleRequired(Role),
    /// The directory reports the user as inactive
    InactiveUser(UserId),
    /// The directory has no record of the user
    UnknownUser(UserId),
    /// The change is not in a stage where the operation applies
    WrongStage(ChangeStatus),
}

impl fmt::Display for ForbiddenReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForbiddenReason::RoleRequired(role) => {
                write!(f, "requires role {} or higher", role.as_str())
            }
            ForbiddenReason::InactiveUser(user) => write!(f, "user {user} is inactive"),
            ForbiddenReason::UnknownUser(user) => write!(f, "user {user} is not in the directory"),
            ForbiddenReason::WrongStage(status) => {
                write!(f, "change is in status {status}")
            }
        }
    }
}

/// Main workflow error type
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// The requested status is not a legal successor
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status
        from: ChangeStatus,
        /// Requested status
        to: ChangeStatus,
    },

    /// The acting user may not perform this operation
    #[error("forbidden: {actor} cannot {action}: {reason}")]
    Forbidden {
        /// The acting user
        actor: UserId,
        /// What was attempted
        action: &'static str,
        /// Why it was refused
        reason: ForbiddenReason,
    },

    /// A date pair violates its ordering invariant
    #[error("invalid {pair} date range: start {start:?} must precede end {end:?}")]
    InvalidDateRange {
        /// Which pair was invalid
        pair: DatePair,
        /// Offending start
        start: Option<DateTime<Utc>>,
        /// Offending end
        end: Option<DateTime<Utc>>,
    },

    /// The (change, target) link already exists
    #[error("already linked to {target}")]
    AlreadyLinked {
        /// The duplicate endpoint
        target: LinkTarget,
    },

    /// No such link to remove
    #[error("no link to {target}")]
    LinkNotFound {
        /// The missing endpoint
        target: LinkTarget,
    },

    /// The vote arrived after the quorum was already resolved
    #[error("approval is stale: change already moved to {status}")]
    StaleApproval {
        /// Status at the time of the late vote
        status: ChangeStatus,
    },

    /// A required field was empty
    #[error("required field `{field}` must not be empty")]
    MissingRequiredField {
        /// Which field
        field: &'static str,
    },

    /// No change with this id
    #[error("change {id} not found")]
    ChangeNotFound {
        /// The missing id
        id: ChangeId,
    },

    /// The storage layer or an external collaborator is unreachable.
    /// The only error class callers may retry.
    #[error("storage unavailable: {detail}")]
    StorageUnavailable {
        /// Underlying cause
        detail: String,
    },
}

impl WorkflowError {
    /// Whether a caller-directed retry with backoff can help
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, WorkflowError::StorageUnavailable { .. })
    }
}

impl From<StoreError> for WorkflowError {
    fn from(e: StoreError) -> Self {
        WorkflowError::StorageUnavailable {
            detail: e.to_string(),
        }
    }
}

impl From<CollaboratorError> for WorkflowError {
    fn from(e: CollaboratorError) -> Self {
        WorkflowError::StorageUnavailable {
            detail: e.to_string(),
        }
    }
}
