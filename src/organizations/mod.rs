//! Organization membership.
//!
//! An organization has two roles: `Invited` and `Admin`. Only an admin may
//! change another user's role; the one exception is a user accepting their
//! own invitation.
//!
//! # Example
//!
//! ```rust,ignore
//! use collab_access::organizations::OrgMembershipService;
//! use collab_access::roles::OrgRole;
//! use collab_access::storage::InMemoryStore;
//!
//! let service = OrgMembershipService::new(InMemoryStore::new())
//!     .with_audit_store(audit_store);
//!
//! // Admin 1 invites user 2, who then accepts.
//! service.assign_member(org_id, 2, OrgRole::Invited, 1).await?;
//! service.assign_member(org_id, 2, OrgRole::Admin, 2).await?;
//! ```

mod service;

pub use service::OrgMembershipService;
