//! beacon-grants
//!
//! Read-side view of token grants and the release action.
//! Unlocking itself is enforced by the grant contract; this crate computes
//! the schedule, fetches grant records, and drives `withdraw` for either a
//! direct or a managed grant.

pub mod overview;
pub mod release;
pub mod schedule;

pub use overview::{fetch_grant, fetch_managed_grant, GrantDetails, GrantOverview, GrantRecord, Progress};
pub use release::{release_tokens, GrantSource, LogNotifier, Message, MessageKind, Notifier};
pub use schedule::GrantSchedule;
