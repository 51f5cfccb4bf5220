//! The change-request aggregate root

use crate::actor::Actor;
use crate::ids::{ChangeId, TenantId, UserId};
use crate::status::ChangeStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How the change was classified at intake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// Routine, well-understood change with an established procedure
    Standard,
    /// Default path through the full workflow
    Normal,
    /// Expedited change responding to an incident
    Emergency,
    /// Pre-authorized low-risk change
    PreApproved,
}

/// Assessed risk of implementing the change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Minimal blast radius
    Low,
    /// Default
    Medium,
    /// Elevated; requires a wider quorum
    High,
    /// Critical; requires a wider quorum
    VeryHigh,
}

/// Breadth of the affected user population
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    /// A single user
    Individual,
    /// One department
    Department,
    /// Several departments
    MultipleDepartments,
    /// Everyone
    OrganizationWide,
}

/// A change request tracked through the workflow.
///
/// Owned associations (approval records, the schedule window, history
/// entries) live in storage keyed by [`ChangeId`]; the aggregate holds
/// only its own scalar state.
///
/// # Invariants
/// - `planned_end > planned_start` whenever both are set
/// - `actual_end` is only set when `actual_start` is, and
///   `actual_end >= actual_start`
/// - `actual_*` are written exclusively by the workflow engine, never
///   by callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRequest {
    /// Opaque identity
    pub id: ChangeId,
    /// Owning tenant
    pub tenant_id: TenantId,

    /// One-line summary
    pub title: String,
    /// Full description
    pub description: String,
    /// Why the change is needed; required, non-empty
    pub justification: String,
    /// How the change will be carried out
    pub implementation_plan: Option<String>,
    /// How the change will be verified
    pub test_plan: Option<String>,
    /// How the change will be reverted if it fails
    pub backout_plan: Option<String>,

    /// Intake classification
    pub change_type: ChangeType,
    /// Assessed risk; drives the approval quorum
    pub risk_level: RiskLevel,
    /// Affected population
    pub impact: Impact,

    /// Current lifecycle status
    pub status: ChangeStatus,
    /// Assigned implementer, if any
    pub assigned_to: Option<UserId>,
    /// Who asked for the change; defaults to the creator
    pub requested_by: UserId,
    /// Who created the record; immutable
    pub created_by: UserId,

    /// Planned implementation start
    pub planned_start: Option<DateTime<Utc>>,
    /// Planned implementation end
    pub planned_end: Option<DateTime<Utc>>,
    /// Stamped by the engine on entering implementation
    pub actual_start: Option<DateTime<Utc>>,
    /// Stamped by the engine on entering review or closure
    pub actual_end: Option<DateTime<Utc>>,

    /// Ids of the approvers whose votes resolved the quorum
    pub resolved_approvers: Vec<UserId>,

    /// Record creation time
    pub created_at: DateTime<Utc>,
    /// Last mutation time
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a change request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChange {
    /// One-line summary
    pub title: String,
    /// Full description
    pub description: String,
    /// Why the change is needed; must be non-empty
    pub justification: String,
    /// Intake classification
    pub change_type: ChangeType,
    /// Assessed risk
    pub risk_level: RiskLevel,
    /// Affected population
    pub impact: Impact,
    /// Requester; the creating actor when `None`
    pub requested_by: Option<UserId>,
    /// Planned implementation start
    pub planned_start: Option<DateTime<Utc>>,
    /// Planned implementation end
    pub planned_end: Option<DateTime<Utc>>,
}

impl NewChange {
    /// Minimal input with defaults for classification
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        justification: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            justification: justification.into(),
            change_type: ChangeType::Normal,
            risk_level: RiskLevel::Medium,
            impact: Impact::Department,
            requested_by: None,
            planned_start: None,
            planned_end: None,
        }
    }

    /// With a risk level
    #[inline]
    #[must_use]
    pub fn with_risk(mut self, risk: RiskLevel) -> Self {
        self.risk_level = risk;
        self
    }

    /// With a planned window
    #[inline]
    #[must_use]
    pub fn with_planned_window(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.planned_start = Some(start);
        self.planned_end = Some(end);
        self
    }
}

impl ChangeRequest {
    /// Materialize a new draft from intake input.
    ///
    /// Content validation (non-empty justification, date ordering)
    /// belongs to the engine; this is pure construction.
    #[must_use]
    pub fn from_new(input: NewChange, creator: &Actor, now: DateTime<Utc>) -> Self {
        Self {
            id: ChangeId::new(),
            tenant_id: creator.tenant_id,
            title: input.title,
            description: input.description,
            justification: input.justification,
            implementation_plan: None,
            test_plan: None,
            backout_plan: None,
            change_type: input.change_type,
            risk_level: input.risk_level,
            impact: input.impact,
            status: ChangeStatus::Draft,
            assigned_to: None,
            requested_by: input.requested_by.unwrap_or(creator.id),
            created_by: creator.id,
            planned_start: input.planned_start,
            planned_end: input.planned_end,
            actual_start: None,
            actual_end: None,
            resolved_approvers: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}
