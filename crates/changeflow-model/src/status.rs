//! Change lifecycle status graph
//!
//! The happy path is linear:
//! draft → submitted → assessment → approval → scheduled →
//! implementation → review → closed.
//!
//! `rejected` and `cancelled` are terminal side-exits reachable from
//! the pre-scheduling stages. No transition leaves a terminal state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Workflow status of a change request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    /// Being drafted by the requester
    Draft,
    /// Submitted for triage
    Submitted,
    /// Under impact/risk assessment
    Assessment,
    /// Awaiting approval quorum
    Approval,
    /// Approved and scheduled for implementation
    Scheduled,
    /// Implementation in progress
    Implementation,
    /// Post-implementation review
    Review,
    /// Completed
    Closed,
    /// Terminated by a rejection verdict
    Rejected,
    /// Withdrawn before completion
    Cancelled,
}

impl ChangeStatus {
    /// Legal successor statuses for `self`
    #[must_use]
    pub fn allowed_transitions(self) -> &'static [ChangeStatus] {
        use ChangeStatus::*;
        match self {
            Draft => &[Submitted, Rejected, Cancelled],
            Submitted => &[Assessment, Rejected, Cancelled],
            Assessment => &[Approval, Rejected, Cancelled],
            Approval => &[Scheduled, Rejected, Cancelled],
            Scheduled => &[Implementation],
            Implementation => &[Review],
            Review => &[Closed],
            Closed | Rejected | Cancelled => &[],
        }
    }

    /// Whether `self -> to` is a legal edge
    #[inline]
    #[must_use]
    pub fn can_transition(self, to: ChangeStatus) -> bool {
        self.allowed_transitions().contains(&to)
    }

    /// Terminal states have no outgoing edges
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }

    /// Stable lowercase name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeStatus::Draft => "draft",
            ChangeStatus::Submitted => "submitted",
            ChangeStatus::Assessment => "assessment",
            ChangeStatus::Approval => "approval",
            ChangeStatus::Scheduled => "scheduled",
            ChangeStatus::Implementation => "implementation",
            ChangeStatus::Review => "review",
            ChangeStatus::Closed => "closed",
            ChangeStatus::Rejected => "rejected",
            ChangeStatus::Cancelled => "cancelled",
        }
    }

    /// All statuses, in lifecycle order
    #[must_use]
    pub fn all() -> &'static [ChangeStatus] {
        use ChangeStatus::*;
        &[
            Draft,
            Submitted,
            Assessment,
            Approval,
            Scheduled,
            Implementation,
            Review,
            Closed,
            Rejected,
            Cancelled,
        ]
    }
}

impl fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
