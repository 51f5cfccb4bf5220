use changeflow_engine::{DatePair, WorkflowError};
use changeflow_model::{ChangePatch, ChangeStatus, FieldPatch, RiskLevel, WindowUpdate};
use changeflow_test_utils::{approve, change_in_approval, sample_change, setup_workflow};
use chrono::{Duration, Utc};

#[tokio::test]
async fn test_inverted_planned_window_rejected_at_intake() {
    let h = setup_workflow();
    let start = Utc::now() + Duration::days(1);
    let input = sample_change(RiskLevel::Medium).with_planned_window(start, start - Duration::hours(1));
    let err = h
        .workflow
        .create_change(input, &h.requester)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::InvalidDateRange {
            pair: DatePair::Planned,
            ..
        }
    ));
}

#[tokio::test]
async fn test_update_fields_is_atomic_on_date_violation() {
    let h = setup_workflow();
    let change = h
        .workflow
        .create_change(sample_change(RiskLevel::Medium), &h.requester)
        .await
        .unwrap();

    let start = Utc::now() + Duration::days(2);
    let patch = ChangePatch::new()
        .with_title("Completely new title")
        .with_planned_window(start, start - Duration::hours(3));
    let err = h
        .workflow
        .update_fields(change.id, patch, &h.requester)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidDateRange { .. }));

    // Nothing from the failed patch persisted, title included.
    let reloaded = h.workflow.get_change(change.id).await.unwrap();
    assert_eq!(reloaded.title, change.title);
    assert_eq!(reloaded.planned_start, change.planned_start);
    assert_eq!(reloaded.planned_end, change.planned_end);
}

#[tokio::test]
async fn test_planned_date_update_creates_window() {
    let h = setup_workflow();
    let change = h
        .workflow
        .create_change(sample_change(RiskLevel::Medium), &h.requester)
        .await
        .unwrap();
    assert_eq!(h.workflow.get_window(change.id).await.unwrap(), None);

    let start = Utc::now() + Duration::days(3);
    let end = start + Duration::hours(6);
    h.workflow
        .update_fields(
            change.id,
            ChangePatch::new().with_planned_window(start, end),
            &h.requester,
        )
        .await
        .unwrap();

    let window = h
        .workflow
        .get_window(change.id)
        .await
        .unwrap()
        .expect("window created");
    assert_eq!(window.scheduled_start, Some(start));
    assert_eq!(window.scheduled_end, Some(end));
    assert!(!window.maintenance_window);
    assert!(!window.notification_sent);
}

#[tokio::test]
async fn test_sync_window_updates_only_supplied_fields() {
    let h = setup_workflow();
    let change = h
        .workflow
        .create_change(sample_change(RiskLevel::Medium), &h.requester)
        .await
        .unwrap();

    let first = h
        .workflow
        .sync_window(change.id, WindowUpdate::default(), &h.technician)
        .await
        .unwrap();
    // Seeded from the change's planned dates.
    assert_eq!(first.scheduled_start, change.planned_start);
    assert_eq!(first.scheduled_end, change.planned_end);

    let updated = h
        .workflow
        .sync_window(
            change.id,
            WindowUpdate {
                maintenance_window: Some(true),
                ..WindowUpdate::default()
            },
            &h.technician,
        )
        .await
        .unwrap();
    assert!(updated.maintenance_window);
    assert_eq!(updated.scheduled_start, first.scheduled_start);
    assert_eq!(updated.scheduled_end, first.scheduled_end);
}

#[tokio::test]
async fn test_sync_window_rejects_inverted_pair_without_mutating() {
    let h = setup_workflow();
    let change = h
        .workflow
        .create_change(sample_change(RiskLevel::Medium), &h.requester)
        .await
        .unwrap();
    let window = h
        .workflow
        .sync_window(change.id, WindowUpdate::default(), &h.technician)
        .await
        .unwrap();

    let bad_start = Utc::now() + Duration::days(5);
    let err = h
        .workflow
        .sync_window(
            change.id,
            WindowUpdate::window(bad_start, bad_start - Duration::hours(1)),
            &h.technician,
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::InvalidDateRange {
            pair: DatePair::Scheduled,
            ..
        }
    ));

    let unchanged = h.workflow.get_window(change.id).await.unwrap().unwrap();
    assert_eq!(unchanged.scheduled_start, window.scheduled_start);
    assert_eq!(unchanged.scheduled_end, window.scheduled_end);
}

#[tokio::test]
async fn test_sync_window_requires_technician() {
    let h = setup_workflow();
    let change = h
        .workflow
        .create_change(sample_change(RiskLevel::Medium), &h.requester)
        .await
        .unwrap();
    let err = h
        .workflow
        .sync_window(change.id, WindowUpdate::default(), &h.requester)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Forbidden { .. }));
}

#[tokio::test]
async fn test_lifecycle_stamps_flow_into_window() {
    let h = setup_workflow();
    let change = change_in_approval(&h, RiskLevel::Medium).await;
    approve(&h, &change, &h.manager).await;
    h.workflow
        .request_transition(change.id, ChangeStatus::Implementation, &h.technician)
        .await
        .unwrap();
    h.workflow
        .request_transition(change.id, ChangeStatus::Review, &h.technician)
        .await
        .unwrap();

    let change = h.workflow.get_change(change.id).await.unwrap();
    let window = h.workflow.get_window(change.id).await.unwrap().unwrap();
    assert_eq!(window.actual_start, change.actual_start);
    assert_eq!(window.actual_end, change.actual_end);
    assert!(window.actual_end.unwrap() >= window.actual_start.unwrap());
}

#[tokio::test]
async fn test_clearing_plan_field_is_recorded_distinctly() {
    let h = setup_workflow();
    let change = h
        .workflow
        .create_change(sample_change(RiskLevel::Medium), &h.requester)
        .await
        .unwrap();

    let mut patch = ChangePatch::new();
    patch.implementation_plan = FieldPatch::Set("drain, patch, rebalance".to_string());
    let change = h
        .workflow
        .update_fields(change.id, patch, &h.technician)
        .await
        .unwrap();
    assert!(change.implementation_plan.is_some());

    let mut patch = ChangePatch::new();
    patch.implementation_plan = FieldPatch::Clear;
    let change = h
        .workflow
        .update_fields(change.id, patch, &h.technician)
        .await
        .unwrap();
    assert_eq!(change.implementation_plan, None);
}
