//! Organization membership service.
//!
//! Handles role changes with permission checks.

use crate::audit::{MembershipAuditEntry, MembershipEvent, MembershipScope};
use crate::error::{AccessError, Result};
use crate::roles::{
    AssignOutcome, Involvement, OrgId, OrgRole, StoredRole, UnassignOutcome, UserId,
};
use crate::storage::{AuditStore, Membership, MembershipStore, OptionalAuditStore, WithAuditStore};
use tracing::{debug, info, instrument, warn};

/// Organization membership service.
///
/// # Audit Logging
///
/// Enable audit logging with `with_audit_store`:
///
/// ```rust,ignore
/// let service = OrgMembershipService::new(store.clone())
///     .with_audit_store(store);
/// ```
#[derive(Clone)]
pub struct OrgMembershipService<S, A = ()>
where
    S: MembershipStore<OrgRole>,
    A: OptionalAuditStore,
{
    store: S,
    audit_store: A,
}

impl<S> OrgMembershipService<S, ()>
where
    S: MembershipStore<OrgRole>,
{
    /// Create a new organization membership service.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            audit_store: (),
        }
    }

    /// Enable audit logging with the given store.
    pub fn with_audit_store<Audit: AuditStore + Clone + 'static>(
        self,
        audit_store: Audit,
    ) -> OrgMembershipService<S, WithAuditStore<Audit>> {
        OrgMembershipService {
            store: self.store,
            audit_store: WithAuditStore(audit_store),
        }
    }
}

impl<S, A> OrgMembershipService<S, A>
where
    S: MembershipStore<OrgRole>,
    A: OptionalAuditStore,
{
    /// Get a reference to the membership store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Current role of a user in the organization.
    pub async fn get_member_role(
        &self,
        org_id: OrgId,
        user_id: UserId,
    ) -> Result<Involvement<OrgRole>> {
        self.store.get_role(org_id, user_id).await
    }

    /// Whether the user is an admin of the organization.
    pub async fn is_admin(&self, org_id: OrgId, user_id: UserId) -> Result<bool> {
        Ok(self.get_member_role(org_id, user_id).await?.is(OrgRole::Admin))
    }

    /// All members of the organization, ordered by user id.
    pub async fn list_members(&self, org_id: OrgId) -> Result<Vec<Membership<OrgRole>>> {
        self.store.list_members(org_id).await
    }

    /// Set a user's organization role.
    ///
    /// The sender must be an admin of the organization, unless they are
    /// accepting their own invitation (`Invited` to `Admin`).
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::Forbidden`] for any other combination. Nothing
    /// is written in that case.
    #[instrument(skip(self))]
    pub async fn assign_member(
        &self,
        org_id: OrgId,
        user_id: UserId,
        target_role: OrgRole,
        sender_id: UserId,
    ) -> Result<AssignOutcome<OrgRole>> {
        let sender_role = self.store.get_role(org_id, sender_id).await?;
        let current = self.store.get_role(org_id, user_id).await?;

        let self_accept = sender_id == user_id
            && current.is(OrgRole::Invited)
            && target_role == OrgRole::Admin;

        if !sender_role.is(OrgRole::Admin) && !self_accept {
            warn!(
                org_id,
                user_id,
                sender_id,
                sender_role = %sender_role,
                current = %current,
                requested = %target_role,
                "Organization role change rejected"
            );
            self.audit_store
                .record(
                    MembershipAuditEntry::new(
                        MembershipEvent::TransitionRejected,
                        MembershipScope::Organization,
                        org_id,
                        sender_id,
                        user_id,
                    )
                    .with_role(target_role.as_str()),
                )
                .await;
            return Err(AccessError::forbidden(format!(
                "cannot set organization role '{target_role}' for user {user_id}"
            )));
        }

        if current.is(target_role) {
            debug!(org_id, user_id, role = %target_role, "Organization role already set");
            return Ok(AssignOutcome::Unchanged(target_role));
        }

        self.store.assign(org_id, user_id, target_role).await?;

        info!(
            org_id,
            user_id,
            sender_id,
            previous = %current,
            role = %target_role,
            "Organization role assigned"
        );

        self.audit_store
            .record(
                MembershipAuditEntry::new(
                    MembershipEvent::RoleAssigned,
                    MembershipScope::Organization,
                    org_id,
                    sender_id,
                    user_id,
                )
                .with_role(target_role.as_str()),
            )
            .await;

        Ok(AssignOutcome::Changed {
            previous: current,
            current: target_role,
        })
    }

    /// Remove a user from the organization.
    ///
    /// Allowed for organization admins and for users leaving on their own.
    /// Removing a user who holds no role succeeds without changes.
    #[instrument(skip(self))]
    pub async fn unassign_member(
        &self,
        org_id: OrgId,
        user_id: UserId,
        sender_id: UserId,
    ) -> Result<UnassignOutcome<OrgRole>> {
        if sender_id != user_id && !self.is_admin(org_id, sender_id).await? {
            warn!(org_id, user_id, sender_id, "Organization member removal rejected");
            return Err(AccessError::forbidden(format!(
                "cannot remove user {user_id} from organization {org_id}"
            )));
        }

        let Involvement::Member(previous) = self.store.get_role(org_id, user_id).await? else {
            debug!(org_id, user_id, "User not involved, nothing to remove");
            return Ok(UnassignOutcome::NotInvolved);
        };

        self.store.unassign(org_id, user_id).await?;

        info!(org_id, user_id, sender_id, role = %previous, "Organization member removed");

        self.audit_store
            .record(
                MembershipAuditEntry::new(
                    MembershipEvent::RoleRemoved,
                    MembershipScope::Organization,
                    org_id,
                    sender_id,
                    user_id,
                )
                .with_role(previous.as_str()),
            )
            .await;

        Ok(UnassignOutcome::Removed(previous))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStore;

    const ORG: OrgId = 1;
    const ADMIN: UserId = 10;
    const USER: UserId = 20;
    const OTHER: UserId = 30;

    fn setup() -> (InMemoryStore, OrgMembershipService<InMemoryStore>) {
        let store = InMemoryStore::new();
        store.insert_org_member(ORG, ADMIN, OrgRole::Admin);
        (store.clone(), OrgMembershipService::new(store))
    }

    #[tokio::test]
    async fn test_admin_invites_then_user_accepts() {
        let (_, service) = setup();

        let outcome = service
            .assign_member(ORG, USER, OrgRole::Invited, ADMIN)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            AssignOutcome::Changed {
                previous: Involvement::NotInvolved,
                current: OrgRole::Invited,
            }
        );

        service
            .assign_member(ORG, USER, OrgRole::Admin, USER)
            .await
            .unwrap();
        assert!(service.is_admin(ORG, USER).await.unwrap());
    }

    #[tokio::test]
    async fn test_non_admin_cannot_invite() {
        let (store, service) = setup();
        store.insert_org_member(ORG, OTHER, OrgRole::Invited);

        let result = service
            .assign_member(ORG, USER, OrgRole::Invited, OTHER)
            .await;
        assert!(matches!(result, Err(AccessError::Forbidden(_))));

        let role = service.get_member_role(ORG, USER).await.unwrap();
        assert_eq!(role, Involvement::NotInvolved);
    }

    #[tokio::test]
    async fn test_uninvited_user_cannot_self_promote() {
        let (_, service) = setup();

        let result = service
            .assign_member(ORG, USER, OrgRole::Admin, USER)
            .await;
        assert!(matches!(result, Err(AccessError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_self_accept_only_to_admin() {
        let (store, service) = setup();
        store.insert_org_member(ORG, USER, OrgRole::Invited);

        // Re-requesting the invited role is not self-acceptance.
        let result = service
            .assign_member(ORG, USER, OrgRole::Invited, USER)
            .await;
        assert!(matches!(result, Err(AccessError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_repeat_assign_is_unchanged() {
        let (_, service) = setup();

        service
            .assign_member(ORG, USER, OrgRole::Invited, ADMIN)
            .await
            .unwrap();
        let again = service
            .assign_member(ORG, USER, OrgRole::Invited, ADMIN)
            .await
            .unwrap();

        assert_eq!(again, AssignOutcome::Unchanged(OrgRole::Invited));
    }

    #[tokio::test]
    async fn test_unassign_rules() {
        let (store, service) = setup();
        store.insert_org_member(ORG, USER, OrgRole::Admin);
        store.insert_org_member(ORG, OTHER, OrgRole::Invited);

        // Invited user cannot remove others.
        let result = service.unassign_member(ORG, USER, OTHER).await;
        assert!(matches!(result, Err(AccessError::Forbidden(_))));

        // Self-leave.
        let outcome = service.unassign_member(ORG, OTHER, OTHER).await.unwrap();
        assert_eq!(outcome, UnassignOutcome::Removed(OrgRole::Invited));

        // Admin removal.
        let outcome = service.unassign_member(ORG, USER, ADMIN).await.unwrap();
        assert!(outcome.is_removed());

        // Removing again is a no-op.
        let outcome = service.unassign_member(ORG, USER, ADMIN).await.unwrap();
        assert_eq!(outcome, UnassignOutcome::NotInvolved);
    }

    #[tokio::test]
    async fn test_audit_records_changes_and_rejections() {
        let store = InMemoryStore::new();
        store.insert_org_member(ORG, ADMIN, OrgRole::Admin);
        let service = OrgMembershipService::new(store.clone()).with_audit_store(store.clone());

        service
            .assign_member(ORG, USER, OrgRole::Invited, ADMIN)
            .await
            .unwrap();
        let _ = service.assign_member(ORG, OTHER, OrgRole::Admin, USER).await;
        service.unassign_member(ORG, USER, USER).await.unwrap();

        let events: Vec<MembershipEvent> = store
            .audit_entries()
            .await
            .iter()
            .map(|e| e.event)
            .collect();
        assert_eq!(
            events,
            vec![
                MembershipEvent::RoleAssigned,
                MembershipEvent::TransitionRejected,
                MembershipEvent::RoleRemoved,
            ]
        );
    }
}
