use changeflow_engine::{ForbiddenReason, WorkflowError};
use changeflow_model::{ChangeStatus, RiskLevel};
use changeflow_test_utils::{approve, change_in_approval, sample_change, setup_workflow};

#[tokio::test]
async fn test_new_change_starts_in_draft() {
    let h = setup_workflow();
    let change = h
        .workflow
        .create_change(sample_change(RiskLevel::Medium), &h.requester)
        .await
        .unwrap();
    assert_eq!(change.status, ChangeStatus::Draft);
    assert_eq!(change.created_by, h.requester.id);
    assert_eq!(change.requested_by, h.requester.id);
}

#[tokio::test]
async fn test_illegal_edge_is_rejected_with_both_endpoints() {
    let h = setup_workflow();
    let change = h
        .workflow
        .create_change(sample_change(RiskLevel::Medium), &h.requester)
        .await
        .unwrap();

    let err = h
        .workflow
        .request_transition(change.id, ChangeStatus::Implementation, &h.admin)
        .await
        .unwrap_err();
    match err {
        WorkflowError::InvalidTransition { from, to } => {
            assert_eq!(from, ChangeStatus::Draft);
            assert_eq!(to, ChangeStatus::Implementation);
        }
        other => panic!("expected InvalidTransition, got {other:?}"),
    }
}

#[tokio::test]
async fn test_implementation_stamps_actual_start_once() {
    let h = setup_workflow();
    let change = change_in_approval(&h, RiskLevel::Medium).await;
    approve(&h, &change, &h.manager).await;

    let before = h.workflow.get_change(change.id).await.unwrap();
    assert_eq!(before.actual_start, None);

    let stamped = h
        .workflow
        .request_transition(change.id, ChangeStatus::Implementation, &h.technician)
        .await
        .unwrap();
    let started_at = stamped.actual_start.expect("actual_start stamped");

    // Re-entering implementation is an illegal edge and must not
    // move the stamp.
    let err = h
        .workflow
        .request_transition(change.id, ChangeStatus::Implementation, &h.technician)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
    let after = h.workflow.get_change(change.id).await.unwrap();
    assert_eq!(after.actual_start, Some(started_at));
}

#[tokio::test]
async fn test_review_stamps_actual_end() {
    let h = setup_workflow();
    let change = change_in_approval(&h, RiskLevel::Medium).await;
    approve(&h, &change, &h.manager).await;
    h.workflow
        .request_transition(change.id, ChangeStatus::Implementation, &h.technician)
        .await
        .unwrap();
    let reviewed = h
        .workflow
        .request_transition(change.id, ChangeStatus::Review, &h.technician)
        .await
        .unwrap();

    let start = reviewed.actual_start.unwrap();
    let end = reviewed.actual_end.unwrap();
    assert!(end >= start);

    // Closing keeps the existing stamp.
    let closed = h
        .workflow
        .request_transition(change.id, ChangeStatus::Closed, &h.technician)
        .await
        .unwrap();
    assert_eq!(closed.actual_end, Some(end));
}

#[tokio::test]
async fn test_assessment_to_approval_needs_manager() {
    let h = setup_workflow();
    let change = h
        .workflow
        .create_change(sample_change(RiskLevel::Medium), &h.requester)
        .await
        .unwrap();
    h.workflow
        .request_transition(change.id, ChangeStatus::Submitted, &h.requester)
        .await
        .unwrap();
    h.workflow
        .request_transition(change.id, ChangeStatus::Assessment, &h.technician)
        .await
        .unwrap();

    let err = h
        .workflow
        .request_transition(change.id, ChangeStatus::Approval, &h.technician)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::Forbidden {
            reason: ForbiddenReason::RoleRequired(changeflow_model::Role::Manager),
            ..
        }
    ));

    h.workflow
        .request_transition(change.id, ChangeStatus::Approval, &h.manager)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_rejection_verdict_needs_manager() {
    let h = setup_workflow();
    let change = h
        .workflow
        .create_change(sample_change(RiskLevel::Medium), &h.requester)
        .await
        .unwrap();

    let err = h
        .workflow
        .request_transition(change.id, ChangeStatus::Rejected, &h.requester)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Forbidden { .. }));

    h.workflow
        .request_transition(change.id, ChangeStatus::Rejected, &h.manager)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_requester_can_cancel() {
    let h = setup_workflow();
    let change = h
        .workflow
        .create_change(sample_change(RiskLevel::Medium), &h.requester)
        .await
        .unwrap();
    let cancelled = h
        .workflow
        .request_transition(change.id, ChangeStatus::Cancelled, &h.requester)
        .await
        .unwrap();
    assert_eq!(cancelled.status, ChangeStatus::Cancelled);

    // Terminal: nothing leaves cancelled.
    let err = h
        .workflow
        .request_transition(change.id, ChangeStatus::Submitted, &h.admin)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
}

#[tokio::test]
async fn test_inactive_actor_is_forbidden() {
    let h = setup_workflow();
    let change = h
        .workflow
        .create_change(sample_change(RiskLevel::Medium), &h.requester)
        .await
        .unwrap();

    h.directory.deactivate(h.requester.id);
    let err = h
        .workflow
        .request_transition(change.id, ChangeStatus::Submitted, &h.requester)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::Forbidden {
            reason: ForbiddenReason::InactiveUser(_),
            ..
        }
    ));
}

#[tokio::test]
async fn test_empty_justification_is_rejected_at_intake() {
    let h = setup_workflow();
    let mut input = sample_change(RiskLevel::Medium);
    input.justification = "   ".to_string();
    let err = h
        .workflow
        .create_change(input, &h.requester)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::MissingRequiredField {
            field: "justification"
        }
    ));
}

#[tokio::test]
async fn test_empty_description_is_rejected_at_intake() {
    let h = setup_workflow();
    let mut input = sample_change(RiskLevel::Medium);
    input.description = "   ".to_string();
    let err = h
        .workflow
        .create_change(input, &h.requester)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::MissingRequiredField {
            field: "description"
        }
    ));
}

#[tokio::test]
async fn test_blanking_description_via_patch_is_rejected() {
    let h = setup_workflow();
    let change = h
        .workflow
        .create_change(sample_change(RiskLevel::Medium), &h.requester)
        .await
        .unwrap();

    let patch = changeflow_model::ChangePatch::new().with_description("  ");
    let err = h
        .workflow
        .update_fields(change.id, patch, &h.technician)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::MissingRequiredField {
            field: "description"
        }
    ));

    let reloaded = h.workflow.get_change(change.id).await.unwrap();
    assert_eq!(reloaded.description, change.description);
}

#[tokio::test]
async fn test_unknown_change_id() {
    let h = setup_workflow();
    let err = h
        .workflow
        .request_transition(
            changeflow_model::ChangeId::new(),
            ChangeStatus::Submitted,
            &h.requester,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::ChangeNotFound { .. }));
}
