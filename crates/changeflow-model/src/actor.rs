//! Actors and roles
//!
//! Every engine operation takes an explicit [`Actor`]; there is no
//! ambient session or tenant context anywhere in the workflow.

use crate::ids::{TenantId, UserId};
use serde::{Deserialize, Serialize};

/// Role held by an actor, as reported by the user directory.
///
/// Ordered from least to most privileged so role gates can be
/// expressed as `actor.role >= required`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Can raise and cancel their own changes
    EndUser,
    /// Can work changes through assessment and implementation
    Technician,
    /// Can approve changes and issue rejection verdicts
    Manager,
    /// Full control
    Admin,
}

impl Role {
    /// Whether this role may cast approval votes
    #[inline]
    #[must_use]
    pub fn can_approve(self) -> bool {
        self >= Role::Manager
    }

    /// Stable lowercase name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::EndUser => "end_user",
            Role::Technician => "technician",
            Role::Manager => "manager",
            Role::Admin => "admin",
        }
    }
}

/// The acting user for one workflow operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Directory id of the user
    pub id: UserId,
    /// Role at the time of the call
    pub role: Role,
    /// Tenant the actor operates in
    pub tenant_id: TenantId,
}

impl Actor {
    /// Create an actor
    #[inline]
    #[must_use]
    pub fn new(id: UserId, role: Role, tenant_id: TenantId) -> Self {
        Self { id, role, tenant_id }
    }
}
