//! Newtype ids for the entities the workflow touches
//!
//! Each id wraps a v4 UUID. Ticket and problem ids identify entities
//! owned by external collaborators; the workflow only links to them.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh random id
            #[inline]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

entity_id!(
    /// Identity of a change request
    ChangeId
);
entity_id!(
    /// Owning tenant of a change request
    TenantId
);
entity_id!(
    /// A user in the external directory
    UserId
);
entity_id!(
    /// A ticket owned by the ticket service
    TicketId
);
entity_id!(
    /// A problem owned by the problem service
    ProblemId
);
entity_id!(
    /// A single audit-trail entry
    EntryId
);
