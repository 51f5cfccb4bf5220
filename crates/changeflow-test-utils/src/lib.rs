//! Testing utilities for the changeflow workspace
//!
//! Shared fixtures: recording collaborator fakes, actor constructors,
//! and helpers that stand up a fully-wired in-memory workflow.

#![allow(missing_docs)]

use async_trait::async_trait;
use changeflow_engine::{
    ChangeWorkflow, CollaboratorError, InMemoryDirectory, MemoryStore, ProblemService,
    TicketService, WorkflowConfig,
};
use changeflow_model::{
    Actor, ApprovalDecision, ChangeRequest, ChangeStatus, NewChange, ProblemId, RiskLevel, Role,
    TenantId, TicketId, UserId,
};
use chrono::{Duration, Utc};
use parking_lot::Mutex;
use std::sync::Arc;

/// One mirrored entry captured by a recording collaborator
#[derive(Debug, Clone, PartialEq)]
pub struct MirroredEntry {
    pub entity: String,
    pub action: String,
    pub details: serde_json::Value,
}

/// Ticket service that records every mirrored entry, optionally
/// failing the first N calls to exercise retry paths.
#[derive(Default)]
pub struct RecordingTicketService {
    entries: Mutex<Vec<MirroredEntry>>,
    failures_remaining: Mutex<u32>,
}

impl RecordingTicketService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` calls with `CollaboratorError::Unavailable`
    pub fn fail_next(&self, n: u32) {
        *self.failures_remaining.lock() = n;
    }

    pub fn entries(&self) -> Vec<MirroredEntry> {
        self.entries.lock().clone()
    }

    fn take_failure(&self) -> bool {
        let mut remaining = self.failures_remaining.lock();
        if *remaining > 0 {
            *remaining -= 1;
            true
        } else {
            false
        }
    }
}

#[async_trait]
impl TicketService for RecordingTicketService {
    async fn append_history(
        &self,
        ticket: TicketId,
        action: &str,
        details: serde_json::Value,
    ) -> Result<(), CollaboratorError> {
        if self.take_failure() {
            return Err(CollaboratorError::Unavailable("injected outage".to_string()));
        }
        self.entries.lock().push(MirroredEntry {
            entity: ticket.to_string(),
            action: action.to_string(),
            details,
        });
        Ok(())
    }
}

/// Problem service twin of [`RecordingTicketService`]
#[derive(Default)]
pub struct RecordingProblemService {
    entries: Mutex<Vec<MirroredEntry>>,
}

impl RecordingProblemService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<MirroredEntry> {
        self.entries.lock().clone()
    }
}

#[async_trait]
impl ProblemService for RecordingProblemService {
    async fn append_history(
        &self,
        problem: ProblemId,
        action: &str,
        details: serde_json::Value,
    ) -> Result<(), CollaboratorError> {
        self.entries.lock().push(MirroredEntry {
            entity: problem.to_string(),
            action: action.to_string(),
            details,
        });
        Ok(())
    }
}

/// Everything a test needs: the workflow plus handles to the fakes
pub struct TestHarness {
    pub workflow: ChangeWorkflow,
    pub directory: Arc<InMemoryDirectory>,
    pub tickets: Arc<RecordingTicketService>,
    pub problems: Arc<RecordingProblemService>,
    pub tenant: TenantId,
    pub requester: Actor,
    pub technician: Actor,
    pub manager: Actor,
    pub second_manager: Actor,
    pub admin: Actor,
}

impl TestHarness {
    /// Register an extra active user and return its actor
    pub fn add_actor(&self, role: Role) -> Actor {
        let actor = Actor::new(UserId::new(), role, self.tenant);
        self.directory.add_user(actor.id, role);
        actor
    }
}

/// Stand up an in-memory workflow with a standard cast of actors
pub fn setup_workflow() -> TestHarness {
    setup_workflow_with(WorkflowConfig::new())
}

/// Same as [`setup_workflow`] with a custom configuration
pub fn setup_workflow_with(config: WorkflowConfig) -> TestHarness {
    let tenant = TenantId::new();
    let requester = Actor::new(UserId::new(), Role::EndUser, tenant);
    let technician = Actor::new(UserId::new(), Role::Technician, tenant);
    let manager = Actor::new(UserId::new(), Role::Manager, tenant);
    let second_manager = Actor::new(UserId::new(), Role::Manager, tenant);
    let admin = Actor::new(UserId::new(), Role::Admin, tenant);

    let directory = Arc::new(InMemoryDirectory::new());
    for actor in [&requester, &technician, &manager, &second_manager, &admin] {
        directory.add_user(actor.id, actor.role);
    }

    let tickets = Arc::new(RecordingTicketService::new());
    let problems = Arc::new(RecordingProblemService::new());
    let workflow = ChangeWorkflow::new(
        config,
        Arc::new(MemoryStore::new()),
        directory.clone(),
        tickets.clone(),
        problems.clone(),
    );

    TestHarness {
        workflow,
        directory,
        tickets,
        problems,
        tenant,
        requester,
        technician,
        manager,
        second_manager,
        admin,
    }
}

/// Intake input with a valid one-day planned window starting tomorrow
pub fn sample_change(risk: RiskLevel) -> NewChange {
    let start = Utc::now() + Duration::days(1);
    NewChange::new(
        "Patch load balancers",
        "Apply the vendor security patch to both LB pairs",
        "CVE remediation deadline",
    )
    .with_risk(risk)
    .with_planned_window(start, start + Duration::hours(2))
}

/// Create a change and walk it to the approval stage
pub async fn change_in_approval(harness: &TestHarness, risk: RiskLevel) -> ChangeRequest {
    let change = harness
        .workflow
        .create_change(sample_change(risk), &harness.requester)
        .await
        .expect("create change");
    harness
        .workflow
        .request_transition(change.id, ChangeStatus::Submitted, &harness.requester)
        .await
        .expect("submit");
    harness
        .workflow
        .request_transition(change.id, ChangeStatus::Assessment, &harness.technician)
        .await
        .expect("assess");
    harness
        .workflow
        .request_transition(change.id, ChangeStatus::Approval, &harness.manager)
        .await
        .expect("to approval")
}

/// Approve with one manager; panics on error
pub async fn approve(
    harness: &TestHarness,
    change: &ChangeRequest,
    approver: &Actor,
) -> changeflow_engine::QuorumOutcome {
    harness
        .workflow
        .submit_approval(change.id, approver, ApprovalDecision::Approved, None)
        .await
        .expect("approval accepted")
}
