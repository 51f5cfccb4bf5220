//! Sparse field patches
//!
//! Partial updates must distinguish "untouched" from "explicitly
//! cleared". Non-nullable fields use `Option<T>` (`None` = untouched);
//! nullable fields use [`FieldPatch`], whose `Clear` variant sets the
//! stored value back to `None`.

use crate::change::{ChangeType, Impact, RiskLevel};
use crate::ids::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Update instruction for one nullable field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldPatch<T> {
    /// Leave the stored value untouched
    #[default]
    Keep,
    /// Replace the stored value
    Set(T),
    /// Null out the stored value
    Clear,
}

impl<T: Clone> FieldPatch<T> {
    /// Whether this instruction changes nothing
    #[inline]
    #[must_use]
    pub fn is_keep(&self) -> bool {
        matches!(self, FieldPatch::Keep)
    }

    /// The value the field will hold after applying this instruction
    /// to `current`
    #[must_use]
    pub fn resolve(&self, current: &Option<T>) -> Option<T> {
        match self {
            FieldPatch::Keep => current.clone(),
            FieldPatch::Set(v) => Some(v.clone()),
            FieldPatch::Clear => None,
        }
    }

    /// Apply in place; returns true when the stored value changed
    pub fn apply(&self, slot: &mut Option<T>) -> bool
    where
        T: PartialEq,
    {
        let next = self.resolve(slot);
        if next == *slot {
            false
        } else {
            *slot = next;
            true
        }
    }
}

/// Partial update of a change request's editable fields
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangePatch {
    /// New title
    pub title: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New justification (must stay non-empty)
    pub justification: Option<String>,
    /// New change type
    pub change_type: Option<ChangeType>,
    /// New risk level
    pub risk_level: Option<RiskLevel>,
    /// New impact
    pub impact: Option<Impact>,
    /// Assignment update
    pub assigned_to: FieldPatch<UserId>,
    /// Implementation plan update
    pub implementation_plan: FieldPatch<String>,
    /// Test plan update
    pub test_plan: FieldPatch<String>,
    /// Backout plan update
    pub backout_plan: FieldPatch<String>,
    /// Planned start update
    pub planned_start: FieldPatch<DateTime<Utc>>,
    /// Planned end update
    pub planned_end: FieldPatch<DateTime<Utc>>,
}

impl ChangePatch {
    /// An empty patch
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the patch touches nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.justification.is_none()
            && self.change_type.is_none()
            && self.risk_level.is_none()
            && self.impact.is_none()
            && self.assigned_to.is_keep()
            && self.implementation_plan.is_keep()
            && self.test_plan.is_keep()
            && self.backout_plan.is_keep()
            && self.planned_start.is_keep()
            && self.planned_end.is_keep()
    }

    /// Whether the patch touches the planned window
    #[inline]
    #[must_use]
    pub fn touches_schedule(&self) -> bool {
        !self.planned_start.is_keep() || !self.planned_end.is_keep()
    }

    /// With a new title
    #[inline]
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// With a new description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// With a new risk level
    #[inline]
    #[must_use]
    pub fn with_risk(mut self, risk: RiskLevel) -> Self {
        self.risk_level = Some(risk);
        self
    }

    /// With an assignment
    #[inline]
    #[must_use]
    pub fn assign_to(mut self, user: UserId) -> Self {
        self.assigned_to = FieldPatch::Set(user);
        self
    }

    /// With a planned window
    #[inline]
    #[must_use]
    pub fn with_planned_window(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.planned_start = FieldPatch::Set(start);
        self.planned_end = FieldPatch::Set(end);
        self
    }
}
