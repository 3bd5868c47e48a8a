//! Storage traits consumed by the membership services.
//!
//! The services never talk to a database directly. They depend on these
//! traits, which are implemented by [`InMemoryStore`] and, with the
//! `database` feature, by [`SeaOrmStore`].

mod audit;
mod chatroom;
mod directory;
mod in_memory;
mod membership;
#[cfg(feature = "database")]
mod sea_orm_store;

pub use audit::{AuditStore, OptionalAuditStore, WithAuditStore};
pub use chatroom::{ChatMessage, Chatroom, ChatroomStore};
pub use directory::{
    NoPlatformAdmins, Organization, PlatformAdmins, Project, ProjectDirectory,
    StaticPlatformAdmins,
};
pub use in_memory::InMemoryStore;
pub use membership::{MembershipStore, Membership};
#[cfg(feature = "database")]
pub use sea_orm_store::SeaOrmStore;

use crate::roles::{OrgRole, ProjectRole};

/// Everything the [`Workspace`](crate::broadcast::Workspace) coordinator needs from one backend.
pub trait WorkspaceStore:
    MembershipStore<OrgRole>
    + MembershipStore<ProjectRole>
    + ProjectDirectory
    + ChatroomStore
    + Clone
    + 'static
{
}

impl<T> WorkspaceStore for T where
    T: MembershipStore<OrgRole>
        + MembershipStore<ProjectRole>
        + ProjectDirectory
        + ChatroomStore
        + Clone
        + 'static
{
}
