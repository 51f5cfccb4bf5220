//! Change-management workflow engine
//!
//! The control plane for a change request's lifecycle:
//! - **State machine** ([`ChangeWorkflow`]): validates transitions and
//!   sparse field updates, always appending to the audit trail
//! - **Approval aggregator**: per-approver upserts, quorum-as-data
//!   policy, single-rejection termination
//! - **Schedule synchronizer**: single owner of the planned/actual
//!   time-box, with engine-only actual-date stamping
//! - **Link manager**: change↔ticket/problem associations with
//!   mirrored history on both sides
//! - **Audit recorder**: append-only, immutable history entries
//!
//! Storage and the external collaborators (tickets, problems, user
//! directory) sit behind async traits; [`MemoryStore`] and
//! [`InMemoryDirectory`] are the in-process reference implementations.

pub mod approvals;
pub mod audit;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod links;
mod retry;
pub mod schedule;
pub mod store;
pub mod workflow;

pub use approvals::{required_approvals, ApprovalAggregator, QuorumOutcome};
pub use audit::AuditRecorder;
pub use collaborators::{
    CollaboratorError, InMemoryDirectory, ProblemService, TicketService, UserDirectory,
};
pub use config::{QuorumPolicy, RetryPolicy, WorkflowConfig};
pub use error::{DatePair, ForbiddenReason, WorkflowError};
pub use links::LinkManager;
pub use schedule::ScheduleSynchronizer;
pub use store::{ChangeStore, MemoryStore, StoreError};
pub use workflow::ChangeWorkflow;
