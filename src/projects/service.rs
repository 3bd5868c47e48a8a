//! Project membership service.

use super::hooks::{DefaultTransitionHooks, TransitionHooks};
use super::transitions::{Decision, TransitionRequest, decide};
use crate::audit::{MembershipAuditEntry, MembershipEvent, MembershipScope};
use crate::error::{AccessError, Result};
use crate::organizations::OrgMembershipService;
use crate::roles::{
    AssignOutcome, Involvement, OrgRole, ProjectId, ProjectRole, StoredRole, UnassignOutcome,
    UserId,
};
use crate::storage::{
    AuditStore, Membership, MembershipStore, OptionalAuditStore, PlatformAdmins, Project,
    ProjectDirectory, WithAuditStore,
};
use tracing::{debug, info, instrument, warn};

/// Project membership service.
///
/// Resolves roles (platform admins are project admins everywhere) and runs
/// every requested role change through the transition table.
///
/// # Example
///
/// ```rust,ignore
/// let service = ProjectMembershipService::new(
///     store.clone(),
///     store.clone(),
///     OrgMembershipService::new(store.clone()),
///     StaticPlatformAdmins::from_config(&config.access),
/// );
///
/// // User 5 applies to join project 3.
/// service.assign_member(3, 5, ProjectRole::Pending, 5).await?;
/// ```
#[derive(Clone)]
pub struct ProjectMembershipService<S, D, O, P, H = DefaultTransitionHooks, A = ()>
where
    S: MembershipStore<ProjectRole> + 'static,
    D: ProjectDirectory,
    O: MembershipStore<OrgRole>,
    P: PlatformAdmins,
    H: TransitionHooks,
    A: OptionalAuditStore,
{
    store: S,
    directory: D,
    orgs: OrgMembershipService<O>,
    platform_admins: P,
    hooks: H,
    audit_store: A,
}

impl<S, D, O, P> ProjectMembershipService<S, D, O, P, DefaultTransitionHooks, ()>
where
    S: MembershipStore<ProjectRole> + 'static,
    D: ProjectDirectory,
    O: MembershipStore<OrgRole>,
    P: PlatformAdmins,
{
    /// Create a new project membership service.
    #[must_use]
    pub fn new(store: S, directory: D, orgs: OrgMembershipService<O>, platform_admins: P) -> Self {
        Self {
            store,
            directory,
            orgs,
            platform_admins,
            hooks: DefaultTransitionHooks,
            audit_store: (),
        }
    }
}

impl<S, D, O, P, H> ProjectMembershipService<S, D, O, P, H, ()>
where
    S: MembershipStore<ProjectRole> + 'static,
    D: ProjectDirectory,
    O: MembershipStore<OrgRole>,
    P: PlatformAdmins,
    H: TransitionHooks,
{
    /// Enable audit logging with the given store.
    pub fn with_audit_store<Audit: AuditStore + Clone + 'static>(
        self,
        audit_store: Audit,
    ) -> ProjectMembershipService<S, D, O, P, H, WithAuditStore<Audit>> {
        ProjectMembershipService {
            store: self.store,
            directory: self.directory,
            orgs: self.orgs,
            platform_admins: self.platform_admins,
            hooks: self.hooks,
            audit_store: WithAuditStore(audit_store),
        }
    }
}

impl<S, D, O, P, H, A> ProjectMembershipService<S, D, O, P, H, A>
where
    S: MembershipStore<ProjectRole> + 'static,
    D: ProjectDirectory,
    O: MembershipStore<OrgRole>,
    P: PlatformAdmins,
    H: TransitionHooks,
    A: OptionalAuditStore,
{
    /// Replace the transition hooks.
    pub fn with_hooks<Hooks: TransitionHooks>(
        self,
        hooks: Hooks,
    ) -> ProjectMembershipService<S, D, O, P, Hooks, A> {
        ProjectMembershipService {
            store: self.store,
            directory: self.directory,
            orgs: self.orgs,
            platform_admins: self.platform_admins,
            hooks,
            audit_store: self.audit_store,
        }
    }

    /// Get a reference to the membership store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get a reference to the organization service used for fast-track checks.
    pub fn organizations(&self) -> &OrgMembershipService<O> {
        &self.orgs
    }

    /// Current role of a user in the project.
    ///
    /// Platform admins are reported as `Admin` regardless of stored rows.
    pub async fn get_member_role(
        &self,
        project_id: ProjectId,
        user_id: UserId,
    ) -> Result<Involvement<ProjectRole>> {
        if self.platform_admins.is_platform_admin(user_id).await? {
            return Ok(Involvement::Member(ProjectRole::Admin));
        }
        self.store.get_role(project_id, user_id).await
    }

    /// Whether the user is an admin of the project.
    pub async fn is_admin(&self, project_id: ProjectId, user_id: UserId) -> Result<bool> {
        Ok(self
            .get_member_role(project_id, user_id)
            .await?
            .is(ProjectRole::Admin))
    }

    /// All stored members of the project, ordered by user id.
    pub async fn list_members(&self, project_id: ProjectId) -> Result<Vec<Membership<ProjectRole>>> {
        self.store.list_members(project_id).await
    }

    /// Users with a `Dev` or `Admin` row, ordered by user id.
    pub async fn list_participants(&self, project_id: ProjectId) -> Result<Vec<UserId>> {
        Ok(self
            .store
            .list_members(project_id)
            .await?
            .into_iter()
            .filter(|m| m.role.is_participant())
            .map(|m| m.user_id)
            .collect())
    }

    /// Look up a project that must exist.
    pub async fn require_project(&self, project_id: ProjectId) -> Result<Project> {
        self.directory
            .find_project(project_id)
            .await?
            .ok_or_else(|| AccessError::not_found("project", project_id))
    }

    /// Request a project role change for `user_id`, acting as `sender_id`.
    ///
    /// # Errors
    ///
    /// - [`AccessError::NotFound`] if the project or its owning organization
    ///   cannot be resolved.
    /// - [`AccessError::Forbidden`] if no transition accepts the request.
    ///   Nothing is written in that case.
    #[instrument(skip(self))]
    pub async fn assign_member(
        &self,
        project_id: ProjectId,
        user_id: UserId,
        target_role: ProjectRole,
        sender_id: UserId,
    ) -> Result<AssignOutcome<ProjectRole>> {
        let project = self.require_project(project_id).await?;
        let org_id = project
            .org_id
            .ok_or_else(|| AccessError::not_found("organization", format!("of project {project_id}")))?;
        if self.directory.find_organization(org_id).await?.is_none() {
            return Err(AccessError::not_found("organization", org_id));
        }

        let sender_role = self.get_member_role(project_id, sender_id).await?;
        let current = self.get_member_role(project_id, user_id).await?;
        let actor_is_org_admin = self.orgs.is_admin(org_id, sender_id).await?;

        let request = TransitionRequest {
            actor_is_target: sender_id == user_id,
            requested: target_role,
            current,
            sender_role,
            actor_is_org_admin,
        };

        match decide(&request) {
            Decision::Apply(transition) => {
                self.hooks
                    .apply(transition, &self.store, project_id, user_id)
                    .await?;

                let role = transition.resulting_role();
                info!(
                    project_id,
                    user_id,
                    sender_id,
                    transition = %transition,
                    previous = %current,
                    role = %role,
                    "Project role assigned"
                );

                self.audit_store
                    .record(
                        MembershipAuditEntry::new(
                            MembershipEvent::RoleAssigned,
                            MembershipScope::Project,
                            project_id,
                            sender_id,
                            user_id,
                        )
                        .with_role(role.as_str()),
                    )
                    .await;

                Ok(AssignOutcome::Changed {
                    previous: current,
                    current: role,
                })
            }
            Decision::Replay(role) => {
                debug!(project_id, user_id, role = %role, "Project role already set");
                Ok(AssignOutcome::Unchanged(role))
            }
            Decision::Reject => {
                warn!(
                    project_id,
                    user_id,
                    sender_id,
                    sender_role = %sender_role,
                    current = %current,
                    requested = %target_role,
                    actor_is_org_admin,
                    "Project role change rejected"
                );

                self.audit_store
                    .record(
                        MembershipAuditEntry::new(
                            MembershipEvent::TransitionRejected,
                            MembershipScope::Project,
                            project_id,
                            sender_id,
                            user_id,
                        )
                        .with_role(target_role.as_str()),
                    )
                    .await;

                Err(AccessError::forbidden(format!(
                    "cannot move user {user_id} from '{current}' to '{target_role}'"
                )))
            }
        }
    }

    /// Remove a user from the project.
    ///
    /// Allowed for project admins and for users leaving on their own.
    /// Removing a user with no stored row succeeds without changes.
    #[instrument(skip(self))]
    pub async fn unassign_member(
        &self,
        project_id: ProjectId,
        user_id: UserId,
        sender_id: UserId,
    ) -> Result<UnassignOutcome<ProjectRole>> {
        if sender_id != user_id && !self.is_admin(project_id, sender_id).await? {
            warn!(project_id, user_id, sender_id, "Project member removal rejected");
            return Err(AccessError::forbidden(format!(
                "cannot remove user {user_id} from project {project_id}"
            )));
        }

        let Involvement::Member(previous) = self.store.get_role(project_id, user_id).await? else {
            debug!(project_id, user_id, "User not involved, nothing to remove");
            return Ok(UnassignOutcome::NotInvolved);
        };

        self.store.unassign(project_id, user_id).await?;

        info!(project_id, user_id, sender_id, role = %previous, "Project member removed");

        self.audit_store
            .record(
                MembershipAuditEntry::new(
                    MembershipEvent::RoleRemoved,
                    MembershipScope::Project,
                    project_id,
                    sender_id,
                    user_id,
                )
                .with_role(previous.as_str()),
            )
            .await;

        Ok(UnassignOutcome::Removed(previous))
    }
}
