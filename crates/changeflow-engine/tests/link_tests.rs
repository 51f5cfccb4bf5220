use changeflow_engine::{RetryPolicy, WorkflowConfig, WorkflowError};
use changeflow_model::{HistoryAction, LinkTarget, ProblemId, RiskLevel, TicketId};
use changeflow_test_utils::{sample_change, setup_workflow, setup_workflow_with};

#[tokio::test]
async fn test_link_then_unlink_mirrors_both_streams_in_order() {
    let h = setup_workflow();
    let change = h
        .workflow
        .create_change(sample_change(RiskLevel::Medium), &h.requester)
        .await
        .unwrap();
    let ticket = TicketId::new();
    let target = LinkTarget::Ticket(ticket);

    h.workflow.link(change.id, target, &h.technician).await.unwrap();
    h.workflow.unlink(change.id, target, &h.technician).await.unwrap();

    // Change side: one linked then one unlinked entry (newest first).
    let actions: Vec<_> = h
        .workflow
        .list_history(change.id)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.action)
        .filter(|a| matches!(a, HistoryAction::LinkedTicket | HistoryAction::UnlinkedTicket))
        .collect();
    assert_eq!(
        actions,
        vec![HistoryAction::UnlinkedTicket, HistoryAction::LinkedTicket]
    );

    // Ticket side: mirrored entries in the same order.
    let mirrored = h.tickets.entries();
    assert_eq!(mirrored.len(), 2);
    assert_eq!(mirrored[0].entity, ticket.to_string());
    assert_eq!(mirrored[0].action, "linked_to_change");
    assert_eq!(mirrored[1].action, "unlinked_from_change");
    assert_eq!(
        mirrored[0].details["change_id"],
        serde_json::json!(change.id)
    );
}

#[tokio::test]
async fn test_duplicate_link_is_rejected() {
    let h = setup_workflow();
    let change = h
        .workflow
        .create_change(sample_change(RiskLevel::Medium), &h.requester)
        .await
        .unwrap();
    let target = LinkTarget::Problem(ProblemId::new());

    h.workflow.link(change.id, target, &h.technician).await.unwrap();
    let err = h
        .workflow
        .link(change.id, target, &h.technician)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::AlreadyLinked { .. }));

    assert_eq!(h.workflow.links(change.id).await.unwrap().len(), 1);
    // Exactly one mirrored entry on the problem side.
    assert_eq!(h.problems.entries().len(), 1);
}

#[tokio::test]
async fn test_unlink_missing_pair_fails() {
    let h = setup_workflow();
    let change = h
        .workflow
        .create_change(sample_change(RiskLevel::Medium), &h.requester)
        .await
        .unwrap();
    let err = h
        .workflow
        .unlink(change.id, LinkTarget::Ticket(TicketId::new()), &h.technician)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::LinkNotFound { .. }));
}

#[tokio::test]
async fn test_mirror_retries_through_transient_outage() {
    let config = WorkflowConfig::new().with_retry(RetryPolicy {
        max_attempts: 3,
        base_delay: std::time::Duration::from_millis(1),
        max_delay: std::time::Duration::from_millis(4),
    });
    let h = setup_workflow_with(config);
    let change = h
        .workflow
        .create_change(sample_change(RiskLevel::Medium), &h.requester)
        .await
        .unwrap();

    h.tickets.fail_next(2);
    h.workflow
        .link(change.id, LinkTarget::Ticket(TicketId::new()), &h.technician)
        .await
        .unwrap();
    assert_eq!(h.tickets.entries().len(), 1);
}

#[tokio::test]
async fn test_mirror_exhaustion_surfaces_storage_unavailable() {
    let config = WorkflowConfig::new().with_retry(RetryPolicy {
        max_attempts: 2,
        base_delay: std::time::Duration::from_millis(1),
        max_delay: std::time::Duration::from_millis(2),
    });
    let h = setup_workflow_with(config);
    let change = h
        .workflow
        .create_change(sample_change(RiskLevel::Medium), &h.requester)
        .await
        .unwrap();

    h.tickets.fail_next(10);
    let err = h
        .workflow
        .link(change.id, LinkTarget::Ticket(TicketId::new()), &h.technician)
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    assert!(matches!(err, WorkflowError::StorageUnavailable { .. }));
}
