//! Links between a change and tickets/problems
//!
//! Join records only: deleting a link removes the association, never
//! either endpoint.

use crate::ids::{ChangeId, ProblemId, TicketId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which kind of external entity a link points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    /// A service-desk ticket
    Ticket,
    /// A problem record
    Problem,
}

impl LinkKind {
    /// Stable lowercase name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LinkKind::Ticket => "ticket",
            LinkKind::Problem => "problem",
        }
    }
}

/// The external endpoint of a link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum LinkTarget {
    /// A ticket owned by the ticket service
    Ticket(TicketId),
    /// A problem owned by the problem service
    Problem(ProblemId),
}

impl LinkTarget {
    /// Kind of the endpoint
    #[inline]
    #[must_use]
    pub fn kind(self) -> LinkKind {
        match self {
            LinkTarget::Ticket(_) => LinkKind::Ticket,
            LinkTarget::Problem(_) => LinkKind::Problem,
        }
    }
}

impl fmt::Display for LinkTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkTarget::Ticket(id) => write!(f, "ticket:{id}"),
            LinkTarget::Problem(id) => write!(f, "problem:{id}"),
        }
    }
}

/// A change↔ticket or change↔problem association
///
/// Unique on the (change, target) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    /// The linked change
    pub change_id: ChangeId,
    /// The other endpoint
    pub target: LinkTarget,
    /// Who created the association
    pub created_by: UserId,
    /// When it was created
    pub created_at: DateTime<Utc>,
}
