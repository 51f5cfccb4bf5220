//! Schedule window for a change
//!
//! One window per change. The scheduled pair mirrors the planned
//! dates at creation and is independently updatable afterwards; the
//! actual pair is written only by the engine's lifecycle stamping.

use crate::ids::ChangeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The planned/actual time-box for implementing a change
///
/// # Invariants
/// - `scheduled_end > scheduled_start` whenever both are set
/// - `actual_end >= actual_start` whenever both are set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleWindow {
    /// Owning change
    pub change_id: ChangeId,
    /// Scheduled start
    pub scheduled_start: Option<DateTime<Utc>>,
    /// Scheduled end
    pub scheduled_end: Option<DateTime<Utc>>,
    /// Stamped when implementation begins
    pub actual_start: Option<DateTime<Utc>>,
    /// Stamped when implementation ends
    pub actual_end: Option<DateTime<Utc>>,
    /// Whether the window falls inside a maintenance window
    pub maintenance_window: bool,
    /// Whether stakeholders have been notified (data only; delivery
    /// is an external concern)
    pub notification_sent: bool,
    /// Record creation time
    pub created_at: DateTime<Utc>,
    /// Last mutation time
    pub updated_at: DateTime<Utc>,
}

impl ScheduleWindow {
    /// A fresh window seeded from a scheduled pair
    #[must_use]
    pub fn seeded(
        change_id: ChangeId,
        scheduled_start: Option<DateTime<Utc>>,
        scheduled_end: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            change_id,
            scheduled_start,
            scheduled_end,
            actual_start: None,
            actual_end: None,
            maintenance_window: false,
            notification_sent: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Caller-supplied window update.
///
/// Only scheduled dates and the maintenance flag are settable from
/// outside; actual dates belong to the engine's lifecycle stamping.
/// `None` means "leave untouched".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowUpdate {
    /// New scheduled start
    pub scheduled_start: Option<DateTime<Utc>>,
    /// New scheduled end
    pub scheduled_end: Option<DateTime<Utc>>,
    /// New maintenance-window flag
    pub maintenance_window: Option<bool>,
}

impl WindowUpdate {
    /// Update carrying a scheduled pair
    #[inline]
    #[must_use]
    pub fn window(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            scheduled_start: Some(start),
            scheduled_end: Some(end),
            maintenance_window: None,
        }
    }

    /// Whether the update carries nothing
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scheduled_start.is_none()
            && self.scheduled_end.is_none()
            && self.maintenance_window.is_none()
    }
}
