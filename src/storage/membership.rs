//! Membership storage trait.

use crate::error::Result;
use crate::roles::{Involvement, StoredRole, UserId};
use async_trait::async_trait;
use serde::Serialize;

/// A stored `(entity, user) -> role` row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Membership<R> {
    /// Organization or project id.
    pub entity_id: i64,
    pub user_id: UserId,
    pub role: R,
}

/// Trait for membership storage operations, one vocabulary per implementation.
///
/// A store that backs both organizations and projects implements this trait
/// twice, once for [`OrgRole`](crate::roles::OrgRole) and once for
/// [`ProjectRole`](crate::roles::ProjectRole). Each vocabulary lives in its own
/// table keyed on the unique `(entity_id, user_id)` pair.
///
/// # Contract
///
/// - `assign` is an upsert: an existing row has its role overwritten, never
///   duplicated. Concurrent assigns on the same pair resolve as last
///   committed wins.
/// - `unassign` deletes the row and is a no-op when there is none.
/// - A stored value outside the vocabulary is reported as
///   [`AccessError::Integrity`](crate::AccessError::Integrity).
///
/// # Example
///
/// ```rust,ignore
/// use collab_access::storage::MembershipStore;
/// use collab_access::roles::{Involvement, ProjectRole};
///
/// #[async_trait]
/// impl MembershipStore<ProjectRole> for MyStore {
///     async fn get_role(&self, project_id: i64, user_id: i64) -> Result<Involvement<ProjectRole>> {
///         let raw = self.db.project_role(project_id, user_id).await?;
///         Ok(raw.map(|r| parse_role(&r)).transpose()?.into())
///     }
///     // ...
/// }
/// ```
#[async_trait]
pub trait MembershipStore<R: StoredRole>: Send + Sync {
    /// Current role of `user_id` in `entity_id`.
    async fn get_role(&self, entity_id: i64, user_id: UserId) -> Result<Involvement<R>>;

    /// Insert or overwrite the role for the pair.
    async fn assign(&self, entity_id: i64, user_id: UserId, role: R) -> Result<()>;

    /// Delete the row for the pair, if present.
    async fn unassign(&self, entity_id: i64, user_id: UserId) -> Result<()>;

    /// All rows for an entity, ordered by user id.
    async fn list_members(&self, entity_id: i64) -> Result<Vec<Membership<R>>>;
}
