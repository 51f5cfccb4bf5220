//! Change state machine and workflow facade
//!
//! `ChangeWorkflow` validates requested transitions and field updates,
//! delegates schedule and approval work to their components, and
//! always appends to the audit trail. Per-change mutexes make
//! update/transition/approval single-writer per change; operations on
//! different changes never contend.

use crate::approvals::{ApprovalAggregator, QuorumOutcome};
use crate::audit::AuditRecorder;
use crate::collaborators::{ProblemService, TicketService, UserDirectory};
use crate::config::WorkflowConfig;
use crate::error::{DatePair, ForbiddenReason, WorkflowError};
use crate::links::LinkManager;
use crate::schedule::{validate_pair, ScheduleSynchronizer};
use crate::store::ChangeStore;
use changeflow_model::{
    Actor, ApprovalDecision, ChangeId, ChangePatch, ChangeRequest, ChangeStatus, FieldChange,
    HistoryAction, HistoryDetails, HistoryEntry, Link, LinkTarget, NewChange, Role,
    ScheduleWindow, WindowUpdate,
};
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Minimum role for a transition edge.
///
/// Only managers move a change into approval or issue a
/// rejection verdict. Requesters may submit and cancel; technicians
/// work the remaining progress edges.
fn required_role(from: ChangeStatus, to: ChangeStatus) -> Role {
    use ChangeStatus::*;
    match (from, to) {
        (Draft, Submitted) => Role::EndUser,
        (_, Cancelled) => Role::EndUser,
        (_, Rejected) => Role::Manager,
        (Assessment, Approval) => Role::Manager,
        (Approval, Scheduled) => Role::Manager,
        _ => Role::Technician,
    }
}

/// The workflow facade: every inbound operation enters here
pub struct ChangeWorkflow {
    store: Arc<dyn ChangeStore>,
    directory: Arc<dyn UserDirectory>,
    audit: AuditRecorder,
    schedule: ScheduleSynchronizer,
    approvals: ApprovalAggregator,
    links: LinkManager,
    locks: DashMap<ChangeId, Arc<Mutex<()>>>,
}

impl ChangeWorkflow {
    /// Wire up the workflow over a store and the external collaborator
    /// seams
    #[must_use]
    pub fn new(
        config: WorkflowConfig,
        store: Arc<dyn ChangeStore>,
        directory: Arc<dyn UserDirectory>,
        tickets: Arc<dyn TicketService>,
        problems: Arc<dyn ProblemService>,
    ) -> Self {
        let audit = AuditRecorder::new(Arc::clone(&store));
        let schedule = ScheduleSynchronizer::new(Arc::clone(&store), audit.clone());
        let approvals =
            ApprovalAggregator::new(Arc::clone(&store), audit.clone(), config.quorum);
        let links = LinkManager::new(
            Arc::clone(&store),
            audit.clone(),
            tickets,
            problems,
            config.retry,
        );
        Self {
            store,
            directory,
            audit,
            schedule,
            approvals,
            links,
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, id: ChangeId) -> Arc<Mutex<()>> {
        self.locks.entry(id).or_default().clone()
    }

    async fn load(&self, id: ChangeId) -> Result<ChangeRequest, WorkflowError> {
        self.store
            .get_change(id)
            .await?
            .ok_or(WorkflowError::ChangeNotFound { id })
    }

    async fn ensure_active(&self, actor: &Actor, action: &'static str) -> Result<(), WorkflowError> {
        if !self.directory.is_active(actor.id).await? {
            return Err(WorkflowError::Forbidden {
                actor: actor.id,
                action,
                reason: ForbiddenReason::InactiveUser(actor.id),
            });
        }
        Ok(())
    }

    /// Create a new draft change.
    ///
    /// # Errors
    /// `MissingRequiredField` for an empty title, description, or
    /// justification; `InvalidDateRange` for an inverted planned
    /// window.
    pub async fn create_change(
        &self,
        input: NewChange,
        actor: &Actor,
    ) -> Result<ChangeRequest, WorkflowError> {
        self.ensure_active(actor, "create a change").await?;
        if input.title.trim().is_empty() {
            return Err(WorkflowError::MissingRequiredField { field: "title" });
        }
        if input.description.trim().is_empty() {
            return Err(WorkflowError::MissingRequiredField {
                field: "description",
            });
        }
        if input.justification.trim().is_empty() {
            return Err(WorkflowError::MissingRequiredField {
                field: "justification",
            });
        }
        validate_pair(DatePair::Planned, input.planned_start, input.planned_end)?;

        let change = ChangeRequest::from_new(input, actor, Utc::now());
        self.store.insert_change(change.clone()).await?;
        self.audit
            .append(
                change.id,
                actor.id,
                HistoryAction::Created,
                HistoryDetails::Created {
                    title: change.title.clone(),
                },
            )
            .await?;
        tracing::info!(change = %change.id, title = %change.title, "change created");
        Ok(change)
    }

    /// Fetch a change by id
    pub async fn get_change(&self, id: ChangeId) -> Result<ChangeRequest, WorkflowError> {
        self.load(id).await
    }

    /// Apply a sparse field patch.
    ///
    /// The whole patch is validated before anything mutates; on
    /// `InvalidDateRange` no field is persisted. All touched fields
    /// land in one batched `updated` history entry, and planned-date
    /// changes are mirrored into the schedule window.
    pub async fn update_fields(
        &self,
        id: ChangeId,
        patch: ChangePatch,
        actor: &Actor,
    ) -> Result<ChangeRequest, WorkflowError> {
        self.ensure_active(actor, "update a change").await?;
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let mut change = self.load(id).await?;
        if change.status.is_terminal() {
            return Err(WorkflowError::Forbidden {
                actor: actor.id,
                action: "update a change",
                reason: ForbiddenReason::WrongStage(change.status),
            });
        }
        if patch.is_empty() {
            return Ok(change);
        }

        // Validate everything before mutating anything.
        if matches!(&patch.title, Some(t) if t.trim().is_empty()) {
            return Err(WorkflowError::MissingRequiredField { field: "title" });
        }
        if matches!(&patch.description, Some(d) if d.trim().is_empty()) {
            return Err(WorkflowError::MissingRequiredField {
                field: "description",
            });
        }
        if matches!(&patch.justification, Some(j) if j.trim().is_empty()) {
            return Err(WorkflowError::MissingRequiredField {
                field: "justification",
            });
        }
        let next_start = patch.planned_start.resolve(&change.planned_start);
        let next_end = patch.planned_end.resolve(&change.planned_end);
        validate_pair(DatePair::Planned, next_start, next_end)?;
        if let changeflow_model::FieldPatch::Set(assignee) = patch.assigned_to {
            if !self.directory.is_active(assignee).await? {
                return Err(WorkflowError::Forbidden {
                    actor: actor.id,
                    action: "assign a change",
                    reason: ForbiddenReason::InactiveUser(assignee),
                });
            }
        }

        let mut diffs: Vec<FieldChange> = Vec::new();
        if let Some(title) = patch.title {
            if title != change.title {
                diffs.push(FieldChange::new("title", &change.title, &title));
                change.title = title;
            }
        }
        if let Some(description) = patch.description {
            if description != change.description {
                diffs.push(FieldChange::new(
                    "description",
                    &change.description,
                    &description,
                ));
                change.description = description;
            }
        }
        if let Some(justification) = patch.justification {
            if justification != change.justification {
                diffs.push(FieldChange::new(
                    "justification",
                    &change.justification,
                    &justification,
                ));
                change.justification = justification;
            }
        }
        if let Some(change_type) = patch.change_type {
            if change_type != change.change_type {
                diffs.push(FieldChange::new(
                    "change_type",
                    &change.change_type,
                    &change_type,
                ));
                change.change_type = change_type;
            }
        }
        if let Some(risk_level) = patch.risk_level {
            if risk_level != change.risk_level {
                diffs.push(FieldChange::new(
                    "risk_level",
                    &change.risk_level,
                    &risk_level,
                ));
                change.risk_level = risk_level;
            }
        }
        if let Some(impact) = patch.impact {
            if impact != change.impact {
                diffs.push(FieldChange::new("impact", &change.impact, &impact));
                change.impact = impact;
            }
        }
        if !patch.assigned_to.is_keep() {
            let next = patch.assigned_to.resolve(&change.assigned_to);
            if next != change.assigned_to {
                diffs.push(FieldChange::new("assigned_to", &change.assigned_to, &next));
                change.assigned_to = next;
            }
        }
        if !patch.implementation_plan.is_keep() {
            let next = patch.implementation_plan.resolve(&change.implementation_plan);
            if next != change.implementation_plan {
                diffs.push(FieldChange::new(
                    "implementation_plan",
                    &change.implementation_plan,
                    &next,
                ));
                change.implementation_plan = next;
            }
        }
        if !patch.test_plan.is_keep() {
            let next = patch.test_plan.resolve(&change.test_plan);
            if next != change.test_plan {
                diffs.push(FieldChange::new("test_plan", &change.test_plan, &next));
                change.test_plan = next;
            }
        }
        if !patch.backout_plan.is_keep() {
            let next = patch.backout_plan.resolve(&change.backout_plan);
            if next != change.backout_plan {
                diffs.push(FieldChange::new("backout_plan", &change.backout_plan, &next));
                change.backout_plan = next;
            }
        }
        let mut dates_changed = false;
        if next_start != change.planned_start {
            diffs.push(FieldChange::new(
                "planned_start",
                &change.planned_start,
                &next_start,
            ));
            change.planned_start = next_start;
            dates_changed = true;
        }
        if next_end != change.planned_end {
            diffs.push(FieldChange::new(
                "planned_end",
                &change.planned_end,
                &next_end,
            ));
            change.planned_end = next_end;
            dates_changed = true;
        }

        if diffs.is_empty() {
            return Ok(change);
        }

        change.updated_at = Utc::now();
        self.store.put_change(change.clone()).await?;
        self.audit
            .append(
                change.id,
                actor.id,
                HistoryAction::Updated,
                HistoryDetails::Fields { changes: diffs },
            )
            .await?;
        if dates_changed {
            self.schedule.mirror_planned(&change, actor.id).await?;
        }
        Ok(change)
    }

    /// Request a status transition.
    ///
    /// # Errors
    /// `InvalidTransition` for an illegal edge, `Forbidden` when the
    /// actor's role does not cover the edge.
    pub async fn request_transition(
        &self,
        id: ChangeId,
        target: ChangeStatus,
        actor: &Actor,
    ) -> Result<ChangeRequest, WorkflowError> {
        self.ensure_active(actor, "transition a change").await?;
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let mut change = self.load(id).await?;
        self.apply_transition(&mut change, target, actor, true)
            .await?;
        Ok(change)
    }

    /// Perform a validated transition. Role gating is skipped for
    /// machine-issued resolutions (quorum verdicts). Caller holds the
    /// change's lock.
    async fn apply_transition(
        &self,
        change: &mut ChangeRequest,
        target: ChangeStatus,
        actor: &Actor,
        enforce_role: bool,
    ) -> Result<(), WorkflowError> {
        let from = change.status;
        if !from.can_transition(target) {
            return Err(WorkflowError::InvalidTransition { from, to: target });
        }
        if enforce_role {
            let required = required_role(from, target);
            if actor.role < required {
                return Err(WorkflowError::Forbidden {
                    actor: actor.id,
                    action: "transition a change",
                    reason: ForbiddenReason::RoleRequired(required),
                });
            }
        }

        let now = Utc::now();
        change.status = target;
        if target == ChangeStatus::Implementation && change.actual_start.is_none() {
            self.schedule
                .stamp_actual_start(change, now, actor.id)
                .await?;
        }
        if matches!(target, ChangeStatus::Review | ChangeStatus::Closed)
            && change.actual_end.is_none()
        {
            self.schedule.stamp_actual_end(change, now, actor.id).await?;
        }
        change.updated_at = now;
        self.store.put_change(change.clone()).await?;
        self.audit
            .append(
                change.id,
                actor.id,
                HistoryAction::StatusChanged,
                HistoryDetails::Status { from, to: target },
            )
            .await?;
        tracing::info!(change = %change.id, from = %from, to = %target, "status changed");
        Ok(())
    }

    /// Submit one approver's decision.
    ///
    /// Role and stage are gated before the record is touched; the
    /// upsert, quorum re-evaluation, and any resolution transition run
    /// under the change's lock, so racing final votes cannot both
    /// resolve the vote. A vote arriving after resolution fails with
    /// `StaleApproval`.
    pub async fn submit_approval(
        &self,
        id: ChangeId,
        actor: &Actor,
        decision: ApprovalDecision,
        comment: Option<String>,
    ) -> Result<QuorumOutcome, WorkflowError> {
        if !actor.role.can_approve() {
            return Err(WorkflowError::Forbidden {
                actor: actor.id,
                action: "approve a change",
                reason: ForbiddenReason::RoleRequired(Role::Manager),
            });
        }
        // The directory is authoritative over the actor's claim.
        match self.directory.role_of(actor.id).await? {
            None => {
                return Err(WorkflowError::Forbidden {
                    actor: actor.id,
                    action: "approve a change",
                    reason: ForbiddenReason::UnknownUser(actor.id),
                })
            }
            Some(role) if !role.can_approve() => {
                return Err(WorkflowError::Forbidden {
                    actor: actor.id,
                    action: "approve a change",
                    reason: ForbiddenReason::RoleRequired(Role::Manager),
                })
            }
            Some(_) => {}
        }
        self.ensure_active(actor, "approve a change").await?;

        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let mut change = self.load(id).await?;
        match change.status {
            ChangeStatus::Approval => {}
            ChangeStatus::Draft | ChangeStatus::Submitted | ChangeStatus::Assessment => {
                return Err(WorkflowError::Forbidden {
                    actor: actor.id,
                    action: "approve a change",
                    reason: ForbiddenReason::WrongStage(change.status),
                });
            }
            status => return Err(WorkflowError::StaleApproval { status }),
        }

        let outcome = self
            .approvals
            .record_vote(&change, actor, decision, comment)
            .await?;
        match &outcome {
            QuorumOutcome::Approved { approvers } => {
                change.resolved_approvers = approvers.clone();
                self.apply_transition(&mut change, ChangeStatus::Scheduled, actor, false)
                    .await?;
            }
            QuorumOutcome::Rejected { .. } => {
                self.apply_transition(&mut change, ChangeStatus::Rejected, actor, false)
                    .await?;
            }
            QuorumOutcome::Pending { .. } => {}
        }
        Ok(outcome)
    }

    /// Create or update the change's schedule window from caller
    /// input. Actual dates are not settable through this path.
    pub async fn sync_window(
        &self,
        id: ChangeId,
        update: WindowUpdate,
        actor: &Actor,
    ) -> Result<ScheduleWindow, WorkflowError> {
        self.ensure_active(actor, "schedule a change").await?;
        if actor.role < Role::Technician {
            return Err(WorkflowError::Forbidden {
                actor: actor.id,
                action: "schedule a change",
                reason: ForbiddenReason::RoleRequired(Role::Technician),
            });
        }
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let change = self.load(id).await?;
        if change.status.is_terminal() {
            return Err(WorkflowError::Forbidden {
                actor: actor.id,
                action: "schedule a change",
                reason: ForbiddenReason::WrongStage(change.status),
            });
        }
        self.schedule.sync_window(&change, update, actor.id).await
    }

    /// Link the change to a ticket or problem
    pub async fn link(
        &self,
        id: ChangeId,
        target: LinkTarget,
        actor: &Actor,
    ) -> Result<Link, WorkflowError> {
        self.ensure_active(actor, "link a change").await?;
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let change = self.load(id).await?;
        self.links.link(&change, target, actor).await
    }

    /// Remove an existing link
    pub async fn unlink(
        &self,
        id: ChangeId,
        target: LinkTarget,
        actor: &Actor,
    ) -> Result<(), WorkflowError> {
        self.ensure_active(actor, "unlink a change").await?;
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let change = self.load(id).await?;
        self.links.unlink(&change, target, actor).await
    }

    /// All links for a change
    pub async fn links(&self, id: ChangeId) -> Result<Vec<Link>, WorkflowError> {
        let change = self.load(id).await?;
        self.links.links(&change).await
    }

    /// The change's audit trail, newest first
    pub async fn list_history(&self, id: ChangeId) -> Result<Vec<HistoryEntry>, WorkflowError> {
        // Existence check keeps "no such change" distinct from "no
        // history yet".
        let _ = self.load(id).await?;
        self.audit.list(id).await
    }

    /// The change's schedule window, if one exists
    pub async fn get_window(&self, id: ChangeId) -> Result<Option<ScheduleWindow>, WorkflowError> {
        let _ = self.load(id).await?;
        Ok(self.store.get_window(id).await?)
    }

    /// All approval records for a change
    pub async fn approvals(
        &self,
        id: ChangeId,
    ) -> Result<Vec<changeflow_model::ApprovalRecord>, WorkflowError> {
        let _ = self.load(id).await?;
        Ok(self.store.approvals(id).await?)
    }
}
