//! Schedule synchronizer
//!
//! Single owner of the planned/actual time-box. External callers can
//! only touch the scheduled pair and the maintenance flag; the actual
//! pair is stamped exclusively through the `pub(crate)` lifecycle
//! hooks the state machine calls on status boundaries. That keeps the
//! two update paths for actual dates from diverging.

use crate::audit::AuditRecorder;
use crate::error::{DatePair, WorkflowError};
use crate::store::ChangeStore;
use changeflow_model::{
    ChangeRequest, HistoryAction, HistoryDetails, ScheduleWindow, UserId, WindowSnapshot,
    WindowUpdate,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Ordering check for a date pair. Scheduled and planned pairs must be
/// strictly ordered; the actual pair allows zero-length windows.
pub(crate) fn validate_pair(
    pair: DatePair,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<(), WorkflowError> {
    if let (Some(s), Some(e)) = (start, end) {
        let ok = match pair {
            DatePair::Actual => e >= s,
            DatePair::Planned | DatePair::Scheduled => e > s,
        };
        if !ok {
            return Err(WorkflowError::InvalidDateRange { pair, start, end });
        }
    }
    Ok(())
}

fn snapshot(window: &ScheduleWindow) -> WindowSnapshot {
    WindowSnapshot {
        scheduled_start: window.scheduled_start,
        scheduled_end: window.scheduled_end,
        actual_start: window.actual_start,
        actual_end: window.actual_end,
    }
}

/// Owns create-or-update of the schedule window and the lifecycle
/// stamping of actual dates
#[derive(Clone)]
pub struct ScheduleSynchronizer {
    store: Arc<dyn ChangeStore>,
    audit: AuditRecorder,
}

impl ScheduleSynchronizer {
    /// Create a synchronizer over a store
    #[must_use]
    pub fn new(store: Arc<dyn ChangeStore>, audit: AuditRecorder) -> Self {
        Self { store, audit }
    }

    /// Create or update the change's window from a caller-supplied
    /// update. Creation seeds the scheduled pair from the update, or
    /// from the change's planned dates when the update omits them.
    ///
    /// # Errors
    /// `InvalidDateRange` when the merged scheduled pair is not
    /// strictly ordered; nothing is mutated on failure.
    pub async fn sync_window(
        &self,
        change: &ChangeRequest,
        update: WindowUpdate,
        actor: UserId,
    ) -> Result<ScheduleWindow, WorkflowError> {
        let now = Utc::now();
        match self.store.get_window(change.id).await? {
            None => {
                let window = ScheduleWindow {
                    maintenance_window: update.maintenance_window.unwrap_or(false),
                    ..ScheduleWindow::seeded(
                        change.id,
                        update.scheduled_start.or(change.planned_start),
                        update.scheduled_end.or(change.planned_end),
                        now,
                    )
                };
                validate_pair(
                    DatePair::Scheduled,
                    window.scheduled_start,
                    window.scheduled_end,
                )?;
                self.store.put_window(window.clone()).await?;
                self.audit
                    .append(
                        change.id,
                        actor,
                        HistoryAction::Scheduled,
                        HistoryDetails::Window {
                            before: None,
                            after: snapshot(&window),
                        },
                    )
                    .await?;
                tracing::info!(change = %change.id, "schedule window created");
                Ok(window)
            }
            Some(mut window) => {
                let before = snapshot(&window);
                let next_start = update.scheduled_start.or(window.scheduled_start);
                let next_end = update.scheduled_end.or(window.scheduled_end);
                validate_pair(DatePair::Scheduled, next_start, next_end)?;

                let mut touched = false;
                if window.scheduled_start != next_start {
                    window.scheduled_start = next_start;
                    touched = true;
                }
                if window.scheduled_end != next_end {
                    window.scheduled_end = next_end;
                    touched = true;
                }
                if let Some(flag) = update.maintenance_window {
                    if window.maintenance_window != flag {
                        window.maintenance_window = flag;
                        touched = true;
                    }
                }
                if !touched {
                    return Ok(window);
                }

                window.updated_at = now;
                self.store.put_window(window.clone()).await?;
                self.audit
                    .append(
                        change.id,
                        actor,
                        HistoryAction::ScheduleUpdated,
                        HistoryDetails::Window {
                            before: Some(before),
                            after: snapshot(&window),
                        },
                    )
                    .await?;
                Ok(window)
            }
        }
    }

    /// Mirror the change's (already validated) planned pair into the
    /// window, creating it when absent. Called by the state machine's
    /// field-update path when planned dates change.
    pub(crate) async fn mirror_planned(
        &self,
        change: &ChangeRequest,
        actor: UserId,
    ) -> Result<(), WorkflowError> {
        let now = Utc::now();
        match self.store.get_window(change.id).await? {
            None => {
                let window =
                    ScheduleWindow::seeded(change.id, change.planned_start, change.planned_end, now);
                self.store.put_window(window.clone()).await?;
                self.audit
                    .append(
                        change.id,
                        actor,
                        HistoryAction::Scheduled,
                        HistoryDetails::Window {
                            before: None,
                            after: snapshot(&window),
                        },
                    )
                    .await?;
            }
            Some(mut window) => {
                let before = snapshot(&window);
                if window.scheduled_start == change.planned_start
                    && window.scheduled_end == change.planned_end
                {
                    return Ok(());
                }
                window.scheduled_start = change.planned_start;
                window.scheduled_end = change.planned_end;
                window.updated_at = now;
                self.store.put_window(window.clone()).await?;
                self.audit
                    .append(
                        change.id,
                        actor,
                        HistoryAction::ScheduleUpdated,
                        HistoryDetails::Window {
                            before: Some(before),
                            after: snapshot(&window),
                        },
                    )
                    .await?;
            }
        }
        Ok(())
    }

    /// Stamp `actual_start` on the aggregate and window. Reserved for
    /// the state machine's entry into implementation.
    pub(crate) async fn stamp_actual_start(
        &self,
        change: &mut ChangeRequest,
        now: DateTime<Utc>,
        actor: UserId,
    ) -> Result<(), WorkflowError> {
        change.actual_start = Some(now);
        self.stamp_window(change, actor, |w| w.actual_start = Some(now))
            .await
    }

    /// Stamp `actual_end` on the aggregate and window. Reserved for
    /// the state machine's entry into review or closure.
    pub(crate) async fn stamp_actual_end(
        &self,
        change: &mut ChangeRequest,
        now: DateTime<Utc>,
        actor: UserId,
    ) -> Result<(), WorkflowError> {
        validate_pair(DatePair::Actual, change.actual_start, Some(now))?;
        change.actual_end = Some(now);
        self.stamp_window(change, actor, |w| w.actual_end = Some(now))
            .await
    }

    async fn stamp_window<F>(
        &self,
        change: &ChangeRequest,
        actor: UserId,
        apply: F,
    ) -> Result<(), WorkflowError>
    where
        F: FnOnce(&mut ScheduleWindow),
    {
        let now = Utc::now();
        let (mut window, before) = match self.store.get_window(change.id).await? {
            Some(w) => {
                let before = snapshot(&w);
                (w, Some(before))
            }
            None => (
                ScheduleWindow::seeded(change.id, change.planned_start, change.planned_end, now),
                None,
            ),
        };
        apply(&mut window);
        window.updated_at = now;
        self.store.put_window(window.clone()).await?;
        let action = if before.is_some() {
            HistoryAction::ScheduleUpdated
        } else {
            HistoryAction::Scheduled
        };
        self.audit
            .append(
                change.id,
                actor,
                action,
                HistoryDetails::Window {
                    before,
                    after: snapshot(&window),
                },
            )
            .await?;
        Ok(())
    }
}
