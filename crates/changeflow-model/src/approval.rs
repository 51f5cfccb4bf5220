//! Per-approver decision records
//!
//! One record per (change, approver) pair; a resubmission overwrites
//! the existing record instead of inserting a second one.

use crate::ids::{ChangeId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The verdict an approver submits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    /// Vote to advance the change
    Approved,
    /// Vote to terminate the change
    Rejected,
}

/// Stored state of an approval record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// Requested but not yet decided
    Pending,
    /// Approver voted to advance
    Approved,
    /// Approver voted to terminate
    Rejected,
}

impl From<ApprovalDecision> for ApprovalStatus {
    fn from(d: ApprovalDecision) -> Self {
        match d {
            ApprovalDecision::Approved => ApprovalStatus::Approved,
            ApprovalDecision::Rejected => ApprovalStatus::Rejected,
        }
    }
}

/// One approver's standing decision on one change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    /// The change being voted on
    pub change_id: ChangeId,
    /// The voting approver; unique per change
    pub approver: UserId,
    /// Current decision state
    pub status: ApprovalStatus,
    /// Optional free-text rationale
    pub comment: Option<String>,
    /// When the decision was (last) cast
    pub decided_at: Option<DateTime<Utc>>,
}

impl ApprovalRecord {
    /// A decided record
    #[must_use]
    pub fn decided(
        change_id: ChangeId,
        approver: UserId,
        decision: ApprovalDecision,
        comment: Option<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            change_id,
            approver,
            status: decision.into(),
            comment,
            decided_at: Some(at),
        }
    }

    /// Whether this record is an `Approved` vote
    #[inline]
    #[must_use]
    pub fn is_approved(&self) -> bool {
        self.status == ApprovalStatus::Approved
    }

    /// Whether this record is a `Rejected` vote
    #[inline]
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        self.status == ApprovalStatus::Rejected
    }
}
