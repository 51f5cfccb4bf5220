//! Link manager
//!
//! Bidirectional associations between a change and tickets/problems.
//! Every link or unlink appends an entry on the change's trail and
//! mirrors a matching entry into the other entity's own history
//! stream through the collaborator seam, with bounded retry.

use crate::audit::AuditRecorder;
use crate::collaborators::{ProblemService, TicketService};
use crate::config::RetryPolicy;
use crate::error::WorkflowError;
use crate::retry::with_backoff;
use crate::store::ChangeStore;
use changeflow_model::{
    Actor, ChangeRequest, HistoryAction, HistoryDetails, Link, LinkTarget,
};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

/// Mirrored action names on the other entity's stream
const MIRROR_LINKED: &str = "linked_to_change";
const MIRROR_UNLINKED: &str = "unlinked_from_change";

/// Creates and removes change↔ticket/problem associations
#[derive(Clone)]
pub struct LinkManager {
    store: Arc<dyn ChangeStore>,
    audit: AuditRecorder,
    tickets: Arc<dyn TicketService>,
    problems: Arc<dyn ProblemService>,
    retry: RetryPolicy,
}

impl LinkManager {
    /// Create a link manager over the store and collaborator seams
    #[must_use]
    pub fn new(
        store: Arc<dyn ChangeStore>,
        audit: AuditRecorder,
        tickets: Arc<dyn TicketService>,
        problems: Arc<dyn ProblemService>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            audit,
            tickets,
            problems,
            retry,
        }
    }

    /// Link the change to a ticket or problem.
    ///
    /// # Errors
    /// `AlreadyLinked` when the (change, target) pair exists; no
    /// duplicate row is ever created.
    pub async fn link(
        &self,
        change: &ChangeRequest,
        target: LinkTarget,
        actor: &Actor,
    ) -> Result<Link, WorkflowError> {
        let link = Link {
            change_id: change.id,
            target,
            created_by: actor.id,
            created_at: Utc::now(),
        };
        if !self.store.insert_link(link.clone()).await? {
            return Err(WorkflowError::AlreadyLinked { target });
        }
        self.audit
            .append(
                change.id,
                actor.id,
                HistoryAction::linked(target.kind()),
                HistoryDetails::Link {
                    kind: target.kind(),
                    other_id: target.to_string(),
                },
            )
            .await?;
        self.mirror(change, target, MIRROR_LINKED).await?;
        tracing::info!(change = %change.id, %target, "linked");
        Ok(link)
    }

    /// Remove an existing association.
    ///
    /// # Errors
    /// `LinkNotFound` when the pair does not exist.
    pub async fn unlink(
        &self,
        change: &ChangeRequest,
        target: LinkTarget,
        actor: &Actor,
    ) -> Result<(), WorkflowError> {
        if !self.store.remove_link(change.id, target).await? {
            return Err(WorkflowError::LinkNotFound { target });
        }
        self.audit
            .append(
                change.id,
                actor.id,
                HistoryAction::unlinked(target.kind()),
                HistoryDetails::Link {
                    kind: target.kind(),
                    other_id: target.to_string(),
                },
            )
            .await?;
        self.mirror(change, target, MIRROR_UNLINKED).await?;
        tracing::info!(change = %change.id, %target, "unlinked");
        Ok(())
    }

    /// All links for a change
    pub async fn links(&self, change: &ChangeRequest) -> Result<Vec<Link>, WorkflowError> {
        Ok(self.store.links(change.id).await?)
    }

    /// Cross-post the mirrored entry. The local write has already
    /// committed; an exhausted retry here surfaces loudly instead of
    /// rolling back.
    async fn mirror(
        &self,
        change: &ChangeRequest,
        target: LinkTarget,
        action: &'static str,
    ) -> Result<(), WorkflowError> {
        let details = json!({ "change_id": change.id });
        let result = match target {
            LinkTarget::Ticket(ticket) => {
                with_backoff(&self.retry, "ticket history mirror", || {
                    self.tickets.append_history(ticket, action, details.clone())
                })
                .await
            }
            LinkTarget::Problem(problem) => {
                with_backoff(&self.retry, "problem history mirror", || {
                    self.problems
                        .append_history(problem, action, details.clone())
                })
                .await
            }
        };
        result.map_err(|e| {
            tracing::error!(
                change = %change.id,
                %target,
                error = %e,
                "history mirror failed after retries; streams are inconsistent"
            );
            WorkflowError::from(e)
        })
    }
}
