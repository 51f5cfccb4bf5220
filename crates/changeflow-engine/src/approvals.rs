//! Approval aggregation
//!
//! Collects per-approver decisions, upserting on the unique
//! (change, approver) key, and computes whether the vote is resolved.
//! The quorum rule is a pure lookup over [`QuorumPolicy`]; the
//! aggregation algorithm never branches on risk levels itself.

use crate::audit::AuditRecorder;
use crate::config::QuorumPolicy;
use crate::error::WorkflowError;
use crate::store::ChangeStore;
use changeflow_model::{
    Actor, ApprovalDecision, ApprovalRecord, ChangeRequest, HistoryAction, HistoryDetails,
    RiskLevel, UserId,
};
use chrono::Utc;
use std::sync::Arc;

/// Quorum for a risk level; pure, policy-as-data
#[inline]
#[must_use]
pub fn required_approvals(policy: &QuorumPolicy, risk: RiskLevel) -> u32 {
    policy.required(risk)
}

/// Result of re-evaluating the vote after a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuorumOutcome {
    /// More votes needed
    Pending {
        /// Distinct `approved` records so far
        approvals: u32,
        /// Required count for this change's risk level
        required: u32,
    },
    /// Quorum reached; the change advances
    Approved {
        /// Everyone who voted `approved`
        approvers: Vec<UserId>,
    },
    /// A single rejection terminates the vote
    Rejected {
        /// The rejecting approver
        by: UserId,
        /// Their rationale, if given
        comment: Option<String>,
    },
}

/// Upserts approval records and evaluates the quorum
#[derive(Clone)]
pub struct ApprovalAggregator {
    store: Arc<dyn ChangeStore>,
    audit: AuditRecorder,
    quorum: QuorumPolicy,
}

impl ApprovalAggregator {
    /// Create an aggregator with a quorum table
    #[must_use]
    pub fn new(store: Arc<dyn ChangeStore>, audit: AuditRecorder, quorum: QuorumPolicy) -> Self {
        Self {
            store,
            audit,
            quorum,
        }
    }

    /// Record one approver's decision and re-evaluate the vote.
    ///
    /// A resubmission from the same approver replaces their existing
    /// record; the (change, approver) pair stays unique. The caller
    /// must hold the change's lock and have verified the change is in
    /// the approval stage.
    pub async fn record_vote(
        &self,
        change: &ChangeRequest,
        actor: &Actor,
        decision: ApprovalDecision,
        comment: Option<String>,
    ) -> Result<QuorumOutcome, WorkflowError> {
        let record = ApprovalRecord::decided(
            change.id,
            actor.id,
            decision,
            comment.clone(),
            Utc::now(),
        );
        self.store.upsert_approval(record).await?;

        let action = match decision {
            ApprovalDecision::Approved => HistoryAction::Approved,
            ApprovalDecision::Rejected => HistoryAction::Rejected,
        };
        self.audit
            .append(
                change.id,
                actor.id,
                action,
                HistoryDetails::Approval {
                    approver: actor.id,
                    comment: comment.clone(),
                },
            )
            .await?;

        if decision == ApprovalDecision::Rejected {
            tracing::info!(change = %change.id, approver = %actor.id, "vote resolved: rejected");
            return Ok(QuorumOutcome::Rejected {
                by: actor.id,
                comment,
            });
        }

        let records = self.store.approvals(change.id).await?;
        let approvers: Vec<UserId> = records
            .iter()
            .filter(|r| r.is_approved())
            .map(|r| r.approver)
            .collect();
        let required = required_approvals(&self.quorum, change.risk_level);
        let count = approvers.len() as u32;
        if count >= required {
            tracing::info!(
                change = %change.id,
                approvals = count,
                required,
                "vote resolved: quorum reached"
            );
            Ok(QuorumOutcome::Approved { approvers })
        } else {
            tracing::debug!(change = %change.id, approvals = count, required, "vote pending");
            Ok(QuorumOutcome::Pending {
                approvals: count,
                required,
            })
        }
    }
}
