//! `changeflow` binary: drive a change end-to-end through the
//! in-memory workflow for smoke-testing and demos.

use anyhow::Context;
use async_trait::async_trait;
use changeflow_engine::{
    ChangeWorkflow, CollaboratorError, InMemoryDirectory, MemoryStore, ProblemService,
    QuorumOutcome, TicketService, WorkflowConfig,
};
use changeflow_model::{
    Actor, ApprovalDecision, ChangeStatus, LinkTarget, NewChange, ProblemId, RiskLevel, Role,
    TenantId, TicketId, UserId, WindowUpdate,
};
use chrono::{Duration, Utc};
use clap::{value_parser, Arg, Command};
use std::sync::Arc;

/// Collaborator stand-ins that log mirrored entries instead of
/// persisting them.
struct LoggingTicketService;
struct LoggingProblemService;

#[async_trait]
impl TicketService for LoggingTicketService {
    async fn append_history(
        &self,
        ticket: TicketId,
        action: &str,
        details: serde_json::Value,
    ) -> Result<(), CollaboratorError> {
        tracing::info!(%ticket, action, %details, "ticket history mirrored");
        Ok(())
    }
}

#[async_trait]
impl ProblemService for LoggingProblemService {
    async fn append_history(
        &self,
        problem: ProblemId,
        action: &str,
        details: serde_json::Value,
    ) -> Result<(), CollaboratorError> {
        tracing::info!(%problem, action, %details, "problem history mirrored");
        Ok(())
    }
}

fn parse_risk(s: &str) -> Result<RiskLevel, String> {
    match s {
        "low" => Ok(RiskLevel::Low),
        "medium" => Ok(RiskLevel::Medium),
        "high" => Ok(RiskLevel::High),
        "very_high" => Ok(RiskLevel::VeryHigh),
        other => Err(format!("unknown risk level `{other}`")),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Command::new("changeflow")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Change-management workflow engine")
        .subcommand(
            Command::new("simulate")
                .about("Drive one change end-to-end through the in-memory workflow")
                .arg(
                    Arg::new("risk")
                        .long("risk")
                        .default_value("high")
                        .value_parser(parse_risk)
                        .help("Risk level (low|medium|high|very_high); drives the quorum"),
                )
                .arg(
                    Arg::new("reject")
                        .long("reject")
                        .action(clap::ArgAction::SetTrue)
                        .help("Have the second approver reject instead of approve"),
                )
                .arg(
                    Arg::new("history-limit")
                        .long("history-limit")
                        .default_value("50")
                        .value_parser(value_parser!(usize))
                        .help("Maximum history entries to print"),
                ),
        )
        .get_matches();

    match cli.subcommand() {
        Some(("simulate", args)) => {
            let risk = *args.get_one::<RiskLevel>("risk").expect("has default");
            let reject = args.get_flag("reject");
            let limit = *args.get_one::<usize>("history-limit").expect("has default");
            simulate(risk, reject, limit).await
        }
        _ => {
            println!("use `changeflow simulate` to run the demo workflow");
            Ok(())
        }
    }
}

async fn simulate(risk: RiskLevel, reject: bool, history_limit: usize) -> anyhow::Result<()> {
    let tenant = TenantId::new();
    let requester = Actor::new(UserId::new(), Role::EndUser, tenant);
    let tech = Actor::new(UserId::new(), Role::Technician, tenant);
    let manager_a = Actor::new(UserId::new(), Role::Manager, tenant);
    let manager_b = Actor::new(UserId::new(), Role::Manager, tenant);

    let directory = Arc::new(InMemoryDirectory::new());
    for actor in [&requester, &tech, &manager_a, &manager_b] {
        directory.add_user(actor.id, actor.role);
    }

    let workflow = ChangeWorkflow::new(
        WorkflowConfig::new(),
        Arc::new(MemoryStore::new()),
        directory,
        Arc::new(LoggingTicketService),
        Arc::new(LoggingProblemService),
    );

    let start = Utc::now() + Duration::hours(24);
    let end = start + Duration::hours(4);
    let change = workflow
        .create_change(
            NewChange::new(
                "Upgrade database cluster",
                "Roll the primary cluster to the next minor version",
                "Current version reaches end of support next quarter",
            )
            .with_risk(risk)
            .with_planned_window(start, end),
            &requester,
        )
        .await
        .context("creating change")?;
    println!("created change {} (risk {:?})", change.id, risk);

    workflow.link(change.id, LinkTarget::Ticket(TicketId::new()), &tech).await?;

    workflow
        .request_transition(change.id, ChangeStatus::Submitted, &requester)
        .await?;
    workflow
        .request_transition(change.id, ChangeStatus::Assessment, &tech)
        .await?;
    workflow
        .request_transition(change.id, ChangeStatus::Approval, &manager_a)
        .await?;

    let mut outcome = workflow
        .submit_approval(
            change.id,
            &manager_a,
            ApprovalDecision::Approved,
            Some("window confirmed".to_string()),
        )
        .await?;
    if let QuorumOutcome::Pending { approvals, required } = outcome {
        println!("quorum pending: {approvals}/{required}");
        let decision = if reject {
            ApprovalDecision::Rejected
        } else {
            ApprovalDecision::Approved
        };
        outcome = workflow
            .submit_approval(change.id, &manager_b, decision, None)
            .await?;
    }
    println!("vote outcome: {outcome:?}");

    let change = workflow.get_change(change.id).await?;
    if change.status == ChangeStatus::Scheduled {
        workflow
            .sync_window(
                change.id,
                WindowUpdate {
                    maintenance_window: Some(true),
                    ..WindowUpdate::default()
                },
                &tech,
            )
            .await?;
        workflow
            .request_transition(change.id, ChangeStatus::Implementation, &tech)
            .await?;
        workflow
            .request_transition(change.id, ChangeStatus::Review, &tech)
            .await?;
        workflow
            .request_transition(change.id, ChangeStatus::Closed, &tech)
            .await?;
    }

    let change = workflow.get_change(change.id).await?;
    println!(
        "final status: {} (actual window {:?} .. {:?})",
        change.status, change.actual_start, change.actual_end
    );

    println!("history (newest first):");
    for entry in workflow.list_history(change.id).await?.iter().take(history_limit) {
        println!(
            "  {} {:>16} by {}",
            entry.recorded_at.format("%H:%M:%S%.3f"),
            entry.action.as_str(),
            entry.actor
        );
    }
    Ok(())
}
