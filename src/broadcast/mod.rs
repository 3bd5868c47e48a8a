//! Broadcast targeting.
//!
//! Decides who receives a real-time event when membership or chat state
//! changes, and hands the resolved user ids to a [`Notifier`]. The transport
//! itself is out of scope; [`UserHub`] is an in-process implementation that
//! a socket or SSE layer can subscribe to.

mod audience;
mod hub;
mod notifier;
mod workspace;

pub use audience::Audience;
pub use hub::{DEFAULT_CHANNEL_CAPACITY, HubMetrics, Subscription, UserHub};
pub use notifier::{Broadcaster, Event, NoopNotifier, Notifier};
pub use workspace::{ChatroomDetail, ChatroomUpdate, Workspace};

/// An organization role was assigned or removed.
pub const ORGANIZATION_MEMBER_UPDATED: &str = "organization:member_updated";
/// A project role was assigned or removed.
pub const PROJECT_MEMBER_UPDATED: &str = "project:member_updated";
pub const CHATROOM_CREATED: &str = "chatroom:created";
/// A chatroom was renamed or its member list replaced.
pub const CHATROOM_UPDATED: &str = "chatroom:updated";
pub const CHATROOM_DELETED: &str = "chatroom:deleted";
pub const CHATROOM_MESSAGE: &str = "chatroom:message";
