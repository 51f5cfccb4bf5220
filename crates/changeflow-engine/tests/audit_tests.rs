use changeflow_model::{
    ApprovalDecision, ChangePatch, ChangeStatus, HistoryAction, HistoryDetails, LinkTarget,
    RiskLevel, TicketId,
};
use changeflow_test_utils::{approve, change_in_approval, sample_change, setup_workflow};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn test_creation_writes_the_first_entry() {
    let h = setup_workflow();
    let input = sample_change(RiskLevel::Medium);
    let title = input.title.clone();
    let change = h.workflow.create_change(input, &h.requester).await.unwrap();

    let trail = h.workflow.list_history(change.id).await.unwrap();
    assert_eq!(trail.len(), 1);
    let entry = &trail[0];
    assert_eq!(entry.change_id, change.id);
    assert_eq!(entry.actor, h.requester.id);
    assert_eq!(entry.action, HistoryAction::Created);
    assert_eq!(entry.details, HistoryDetails::Created { title });
}

#[tokio::test]
async fn test_history_is_returned_newest_first() {
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

    let trail = h.workflow.list_history(change.id).await.unwrap();
    let actions: Vec<_> = trail.iter().map(|e| e.action).collect();
    assert_eq!(
        actions,
        vec![
            HistoryAction::StatusChanged,
            HistoryAction::StatusChanged,
            HistoryAction::Created,
        ]
    );
    assert_eq!(
        trail[0].details,
        HistoryDetails::Status {
            from: ChangeStatus::Submitted,
            to: ChangeStatus::Assessment,
        }
    );
    // Timestamps never run backwards within a trail.
    for pair in trail.windows(2) {
        assert!(pair[0].recorded_at >= pair[1].recorded_at);
    }
}

#[tokio::test]
async fn test_patch_produces_one_batched_entry() {
    let h = setup_workflow();
    let change = h
        .workflow
        .create_change(sample_change(RiskLevel::Medium), &h.requester)
        .await
        .unwrap();

    let patch = ChangePatch::new()
        .with_title("Rotate primary database certificates")
        .with_description("Certs expire at the end of the quarter")
        .with_risk(RiskLevel::High);
    h.workflow
        .update_fields(change.id, patch, &h.technician)
        .await
        .unwrap();

    let trail = h.workflow.list_history(change.id).await.unwrap();
    assert_eq!(trail.len(), 2, "one entry per patch, however many fields");
    assert_eq!(trail[0].action, HistoryAction::Updated);
    assert_eq!(trail[0].actor, h.technician.id);
    let HistoryDetails::Fields { changes } = &trail[0].details else {
        panic!("expected field diffs, got {:?}", trail[0].details);
    };
    let fields: Vec<_> = changes.iter().map(|c| c.field.as_str()).collect();
    assert_eq!(fields, vec!["title", "description", "risk_level"]);
    let title_diff = &changes[0];
    assert_eq!(title_diff.from, serde_json::json!(change.title));
    assert_eq!(
        title_diff.to,
        serde_json::json!("Rotate primary database certificates")
    );
}

#[tokio::test]
async fn test_no_op_patch_leaves_no_trace() {
    let h = setup_workflow();
    let change = h
        .workflow
        .create_change(sample_change(RiskLevel::Medium), &h.requester)
        .await
        .unwrap();

    // Re-setting the current value touches nothing.
    let patch = ChangePatch::new().with_title(change.title.clone());
    h.workflow
        .update_fields(change.id, patch, &h.technician)
        .await
        .unwrap();
    h.workflow
        .update_fields(change.id, ChangePatch::new(), &h.technician)
        .await
        .unwrap();

    assert_eq!(h.workflow.list_history(change.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_full_lifecycle_leaves_a_complete_trail() {
    let h = setup_workflow();
    let change = change_in_approval(&h, RiskLevel::Medium).await;
    approve(&h, &change, &h.manager).await;
    h.workflow
        .link(change.id, LinkTarget::Ticket(TicketId::new()), &h.technician)
        .await
        .unwrap();
    h.workflow
        .request_transition(change.id, ChangeStatus::Implementation, &h.technician)
        .await
        .unwrap();
    h.workflow
        .request_transition(change.id, ChangeStatus::Review, &h.technician)
        .await
        .unwrap();
    h.workflow
        .request_transition(change.id, ChangeStatus::Closed, &h.technician)
        .await
        .unwrap();

    let trail = h.workflow.list_history(change.id).await.unwrap();
    let actions: Vec<_> = trail.iter().rev().map(|e| e.action).collect();
    assert_eq!(
        actions,
        vec![
            HistoryAction::Created,
            HistoryAction::StatusChanged, // draft -> submitted
            HistoryAction::StatusChanged, // submitted -> assessment
            HistoryAction::StatusChanged, // assessment -> approval
            HistoryAction::Approved,
            HistoryAction::StatusChanged, // approval -> scheduled
            HistoryAction::LinkedTicket,
            HistoryAction::Scheduled, // window seeded by the start stamp
            HistoryAction::StatusChanged, // scheduled -> implementation
            HistoryAction::ScheduleUpdated, // end stamp
            HistoryAction::StatusChanged, // implementation -> review
            HistoryAction::StatusChanged, // review -> closed
        ]
    );

    // The approval entry names the voter.
    let approval = trail
        .iter()
        .find(|e| e.action == HistoryAction::Approved)
        .unwrap();
    assert!(matches!(
        &approval.details,
        HistoryDetails::Approval { approver, .. } if *approver == h.manager.id
    ));
}

#[tokio::test]
async fn test_rejection_entry_carries_the_comment() {
    let h = setup_workflow();
    let change = change_in_approval(&h, RiskLevel::Medium).await;
    h.workflow
        .submit_approval(
            change.id,
            &h.manager,
            ApprovalDecision::Rejected,
            Some("collides with the freeze window".to_string()),
        )
        .await
        .unwrap();

    let trail = h.workflow.list_history(change.id).await.unwrap();
    let rejected = trail
        .iter()
        .find(|e| e.action == HistoryAction::Rejected)
        .unwrap();
    assert_eq!(rejected.actor, h.manager.id);
    let HistoryDetails::Approval { approver, comment } = &rejected.details else {
        panic!("expected approval details");
    };
    assert_eq!(*approver, h.manager.id);
    assert_eq!(
        comment.as_deref(),
        Some("collides with the freeze window")
    );
}

#[tokio::test]
async fn test_trails_are_isolated_per_change() {
    let h = setup_workflow();
    let a = h
        .workflow
        .create_change(sample_change(RiskLevel::Medium), &h.requester)
        .await
        .unwrap();
    let b = h
        .workflow
        .create_change(sample_change(RiskLevel::High), &h.requester)
        .await
        .unwrap();
    h.workflow
        .request_transition(a.id, ChangeStatus::Submitted, &h.requester)
        .await
        .unwrap();

    assert_eq!(h.workflow.list_history(a.id).await.unwrap().len(), 2);
    assert_eq!(h.workflow.list_history(b.id).await.unwrap().len(), 1);
}
