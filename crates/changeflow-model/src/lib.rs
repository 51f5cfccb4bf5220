//! Data model for change-management workflow control
//!
//! Pure data shapes shared by the workflow engine:
//! - Newtype ids and explicit actors (no ambient session state)
//! - The [`ChangeRequest`] aggregate and its classification enums
//! - The [`ChangeStatus`] transition graph
//! - Approval records, schedule windows, history entries, and links
//! - Sparse field patches ([`ChangePatch`]) that distinguish
//!   "untouched" from "explicitly cleared"
//!
//! This crate performs no I/O and holds no business logic beyond the
//! structural invariants of the types themselves.

pub mod actor;
pub mod approval;
pub mod change;
pub mod history;
pub mod ids;
pub mod link;
pub mod patch;
pub mod schedule;
pub mod status;

pub use actor::{Actor, Role};
pub use approval::{ApprovalDecision, ApprovalRecord, ApprovalStatus};
pub use change::{ChangeRequest, ChangeType, Impact, NewChange, RiskLevel};
pub use history::{FieldChange, HistoryAction, HistoryDetails, HistoryEntry, WindowSnapshot};
pub use ids::{ChangeId, EntryId, ProblemId, TenantId, TicketId, UserId};
pub use link::{Link, LinkKind, LinkTarget};
pub use patch::{ChangePatch, FieldPatch};
pub use schedule::{ScheduleWindow, WindowUpdate};
pub use status::ChangeStatus;
