//! Outbound seams to external collaborators
//!
//! Tickets, problems, and the user directory live outside this core.
//! The engine consumes them through these traits only: link mirroring
//! cross-posts into the other entity's history stream, and the
//! directory answers role/activity questions.

use async_trait::async_trait;
use changeflow_model::{ProblemId, Role, TicketId, UserId};
use dashmap::DashMap;

/// Failure reaching an external collaborator
#[derive(Debug, Clone, thiserror::Error)]
pub enum CollaboratorError {
    /// The collaborator cannot be reached
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
}

/// The ticket service's history stream
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TicketService: Send + Sync {
    /// Cross-post an entry into the ticket's own history
    async fn append_history(
        &self,
        ticket: TicketId,
        action: &str,
        details: serde_json::Value,
    ) -> Result<(), CollaboratorError>;
}

/// The problem service's history stream
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProblemService: Send + Sync {
    /// Cross-post an entry into the problem's own history
    async fn append_history(
        &self,
        problem: ProblemId,
        action: &str,
        details: serde_json::Value,
    ) -> Result<(), CollaboratorError>;
}

/// The user/role directory
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// The user's current role, `None` when unknown
    async fn role_of(&self, user: UserId) -> Result<Option<Role>, CollaboratorError>;

    /// Whether the user account is active
    async fn is_active(&self, user: UserId) -> Result<bool, CollaboratorError>;
}

/// In-memory directory for tests and the simulate binary
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    users: DashMap<UserId, (Role, bool)>,
}

impl InMemoryDirectory {
    /// Create an empty directory
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an active user
    pub fn add_user(&self, user: UserId, role: Role) {
        self.users.insert(user, (role, true));
    }

    /// Mark a user inactive
    pub fn deactivate(&self, user: UserId) {
        if let Some(mut entry) = self.users.get_mut(&user) {
            entry.1 = false;
        }
    }
}

#[async_trait]
impl UserDirectory for InMemoryDirectory {
    async fn role_of(&self, user: UserId) -> Result<Option<Role>, CollaboratorError> {
        Ok(self.users.get(&user).map(|e| e.0))
    }

    async fn is_active(&self, user: UserId) -> Result<bool, CollaboratorError> {
        Ok(self.users.get(&user).map(|e| e.1).unwrap_or(false))
    }
}
