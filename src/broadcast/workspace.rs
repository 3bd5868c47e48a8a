//! Workspace coordinator.
//!
//! Wires the membership services, the access lists and a [`Notifier`]
//! together. Every mutating action follows the same sequence:
//!
//! 1. capture the audience before the write,
//! 2. apply the write,
//! 3. capture the audience after the write,
//! 4. notify the union once per user.
//!
//! Creations notify only the after-set and deletions only the before-set.

use super::audience::Audience;
use super::notifier::{Broadcaster, Notifier};
use super::{
    CHATROOM_CREATED, CHATROOM_DELETED, CHATROOM_MESSAGE, CHATROOM_UPDATED,
    ORGANIZATION_MEMBER_UPDATED, PROJECT_MEMBER_UPDATED,
};
use crate::access::AccessList;
use crate::config::AccessConfig;
use crate::error::{AccessError, Result};
use crate::organizations::OrgMembershipService;
use crate::projects::{DefaultTransitionHooks, ProjectMembershipService};
use crate::roles::{
    AssignOutcome, ChatroomId, OrgId, OrgRole, ProjectId, ProjectRole, UnassignOutcome, UserId,
};
use crate::storage::{
    AuditStore, ChatMessage, Chatroom, MembershipStore, OptionalAuditStore, PlatformAdmins,
    WithAuditStore, WorkspaceStore,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument};

/// Requested changes to a chatroom.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ChatroomUpdate {
    /// New name.
    #[serde(default)]
    pub name: Option<String>,
    /// New explicit member list. Only valid for standalone rooms.
    #[serde(default)]
    pub members: Option<Vec<UserId>>,
}

/// A chatroom together with its current access list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatroomDetail {
    pub chatroom: Chatroom,
    pub members: Vec<UserId>,
}

type Projects<S, P, A> = ProjectMembershipService<S, S, S, P, DefaultTransitionHooks, A>;

/// Coordinates membership changes, chatrooms and broadcasts over one store.
///
/// # Example
///
/// ```rust,ignore
/// use collab_access::broadcast::{UserHub, Workspace};
/// use collab_access::storage::{InMemoryStore, StaticPlatformAdmins};
///
/// let hub = UserHub::new();
/// let workspace = Workspace::new(store, StaticPlatformAdmins::from_config(&config.access), hub.clone())
///     .with_config(config.access.clone());
///
/// let room = workspace.create_chatroom(sender_id, "general", None, vec![2, 3]).await?;
/// workspace.post_message(room.id, sender_id, "hello").await?;
/// ```
pub struct Workspace<S, P, N, A = ()>
where
    S: WorkspaceStore,
    P: PlatformAdmins,
    N: Notifier,
    A: OptionalAuditStore,
{
    store: S,
    orgs: OrgMembershipService<S, A>,
    projects: Projects<S, P, A>,
    access: AccessList<S, S, S>,
    broadcaster: Broadcaster<N>,
    config: AccessConfig,
}

impl<S, P, N> Workspace<S, P, N, ()>
where
    S: WorkspaceStore,
    P: PlatformAdmins,
    N: Notifier,
{
    /// Create a workspace with the default [`AccessConfig`].
    #[must_use]
    pub fn new(store: S, platform_admins: P, notifier: N) -> Self {
        Self {
            orgs: OrgMembershipService::new(store.clone()),
            projects: ProjectMembershipService::new(
                store.clone(),
                store.clone(),
                OrgMembershipService::new(store.clone()),
                platform_admins,
            ),
            access: AccessList::new(store.clone(), store.clone(), store.clone()),
            store,
            broadcaster: Broadcaster::new(notifier),
            config: AccessConfig::default(),
        }
    }

    /// Enable membership audit logging with the given store.
    pub fn with_audit_store<Audit: AuditStore + Clone + 'static>(
        self,
        audit_store: Audit,
    ) -> Workspace<S, P, N, WithAuditStore<Audit>> {
        Workspace {
            store: self.store,
            orgs: self.orgs.with_audit_store(audit_store.clone()),
            projects: self.projects.with_audit_store(audit_store),
            access: self.access,
            broadcaster: self.broadcaster,
            config: self.config,
        }
    }
}

impl<S, P, N, A> Workspace<S, P, N, A>
where
    S: WorkspaceStore,
    P: PlatformAdmins,
    N: Notifier,
    A: OptionalAuditStore,
{
    /// Replace the access configuration.
    #[must_use]
    pub fn with_config(mut self, config: AccessConfig) -> Self {
        self.config = config;
        self
    }

    /// Get a reference to the store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get a reference to the organization membership service.
    pub fn organizations(&self) -> &OrgMembershipService<S, A> {
        &self.orgs
    }

    /// Get a reference to the project membership service.
    pub fn projects(&self) -> &Projects<S, P, A> {
        &self.projects
    }

    /// Get a reference to the access lists.
    pub fn access(&self) -> &AccessList<S, S, S> {
        &self.access
    }

    /// Get a reference to the broadcaster.
    pub fn broadcaster(&self) -> &Broadcaster<N> {
        &self.broadcaster
    }

    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    fn with_subject(&self, audience: Audience, user_id: UserId) -> Audience {
        if self.config.notify_subject {
            audience.with(user_id)
        } else {
            audience
        }
    }

    async fn org_audience(&self, org_id: OrgId) -> Result<Audience> {
        let members = MembershipStore::<OrgRole>::list_members(&self.store, org_id).await?;
        Ok(members.into_iter().map(|m| m.user_id).collect())
    }

    async fn require_organization(&self, org_id: OrgId) -> Result<()> {
        match self.store.find_organization(org_id).await? {
            Some(_) => Ok(()),
            None => Err(AccessError::not_found("organization", org_id)),
        }
    }

    async fn require_access(&self, chatroom: &Chatroom, user_id: UserId) -> Result<Audience> {
        let members = self.access.members_of(chatroom).await?;
        if !members.contains(&user_id) {
            return Err(AccessError::forbidden(format!(
                "user {user_id} has no access to chatroom {}",
                chatroom.id
            )));
        }
        Ok(members.into())
    }

    // -------------------------------------------------------------------------
    // Organization membership
    // -------------------------------------------------------------------------

    /// Set an organization role and notify the affected members.
    #[instrument(skip(self))]
    pub async fn assign_org_member(
        &self,
        org_id: OrgId,
        user_id: UserId,
        role: OrgRole,
        sender_id: UserId,
    ) -> Result<AssignOutcome<OrgRole>> {
        self.require_organization(org_id).await?;
        let before = self.org_audience(org_id).await?;

        let outcome = self
            .orgs
            .assign_member(org_id, user_id, role, sender_id)
            .await?;
        let AssignOutcome::Changed { previous, current } = outcome else {
            return Ok(outcome);
        };

        let after = self.org_audience(org_id).await?;
        let audience = self.with_subject(before.union(after), user_id);
        let payload = json!({
            "org_id": org_id,
            "user_id": user_id,
            "previous": previous,
            "role": current,
        });
        self.broadcaster
            .notify(&audience, ORGANIZATION_MEMBER_UPDATED, &payload)
            .await;

        Ok(outcome)
    }

    /// Remove an organization member and notify the affected members.
    #[instrument(skip(self))]
    pub async fn unassign_org_member(
        &self,
        org_id: OrgId,
        user_id: UserId,
        sender_id: UserId,
    ) -> Result<UnassignOutcome<OrgRole>> {
        self.require_organization(org_id).await?;
        let before = self.org_audience(org_id).await?;

        let outcome = self.orgs.unassign_member(org_id, user_id, sender_id).await?;
        let UnassignOutcome::Removed(previous) = outcome else {
            return Ok(outcome);
        };

        let after = self.org_audience(org_id).await?;
        let audience = self.with_subject(before.union(after), user_id);
        let payload = json!({
            "org_id": org_id,
            "user_id": user_id,
            "previous": previous,
            "role": null,
        });
        self.broadcaster
            .notify(&audience, ORGANIZATION_MEMBER_UPDATED, &payload)
            .await;

        Ok(outcome)
    }

    // -------------------------------------------------------------------------
    // Project membership
    // -------------------------------------------------------------------------

    /// Request a project role change and notify the affected participants.
    ///
    /// The participants of a project are also the audience of every chatroom
    /// bound to it, so one notification covers both.
    #[instrument(skip(self))]
    pub async fn assign_project_member(
        &self,
        project_id: ProjectId,
        user_id: UserId,
        role: ProjectRole,
        sender_id: UserId,
    ) -> Result<AssignOutcome<ProjectRole>> {
        let before: Audience = self.access.get_project_audience(project_id).await?.into();

        let outcome = self
            .projects
            .assign_member(project_id, user_id, role, sender_id)
            .await?;
        let AssignOutcome::Changed { previous, current } = outcome else {
            return Ok(outcome);
        };

        let after: Audience = self.access.get_project_audience(project_id).await?.into();
        let audience = self.with_subject(before.union(after), user_id);
        let payload = json!({
            "project_id": project_id,
            "user_id": user_id,
            "previous": previous,
            "role": current,
        });
        self.broadcaster
            .notify(&audience, PROJECT_MEMBER_UPDATED, &payload)
            .await;

        Ok(outcome)
    }

    /// Remove a project member and notify the affected participants.
    #[instrument(skip(self))]
    pub async fn unassign_project_member(
        &self,
        project_id: ProjectId,
        user_id: UserId,
        sender_id: UserId,
    ) -> Result<UnassignOutcome<ProjectRole>> {
        let before: Audience = self.access.get_project_audience(project_id).await?.into();

        let outcome = self
            .projects
            .unassign_member(project_id, user_id, sender_id)
            .await?;
        let UnassignOutcome::Removed(previous) = outcome else {
            return Ok(outcome);
        };

        let after: Audience = self.access.get_project_audience(project_id).await?.into();
        let audience = self.with_subject(before.union(after), user_id);
        let payload = json!({
            "project_id": project_id,
            "user_id": user_id,
            "previous": previous,
            "role": null,
        });
        self.broadcaster
            .notify(&audience, PROJECT_MEMBER_UPDATED, &payload)
            .await;

        Ok(outcome)
    }

    // -------------------------------------------------------------------------
    // Chatrooms
    // -------------------------------------------------------------------------

    /// Create a chatroom.
    ///
    /// A standalone room gets `members` plus the creator as its explicit
    /// member list. A project-bound room takes its audience from the project,
    /// so the creator must hold a stored `Dev` or `Admin` row and `members`
    /// must be empty.
    #[instrument(skip(self))]
    pub async fn create_chatroom(
        &self,
        sender_id: UserId,
        name: &str,
        project_id: Option<ProjectId>,
        members: Vec<UserId>,
    ) -> Result<Chatroom> {
        let name = validate_name(name)?;

        let explicit: Vec<UserId> = match project_id {
            Some(project_id) => {
                self.projects.require_project(project_id).await?;
                if !members.is_empty() {
                    return Err(AccessError::validation(
                        "project chatrooms take their members from the project",
                    ));
                }
                // Room access comes from stored rows only, so the creator must
                // hold one. Platform admins without a row are not participants.
                let role =
                    MembershipStore::<ProjectRole>::get_role(&self.store, project_id, sender_id)
                        .await?;
                if !role.role().is_some_and(|r| r.is_participant()) {
                    return Err(AccessError::forbidden(format!(
                        "user {sender_id} is not a participant of project {project_id}"
                    )));
                }
                Vec::new()
            }
            None => Audience::from(members).with(sender_id).to_vec(),
        };

        let chatroom = self
            .store
            .create_chatroom(name, project_id, &explicit)
            .await?;

        info!(chatroom_id = chatroom.id, sender_id, project_id = ?project_id, "Chatroom created");

        let after: Audience = self.access.members_of(&chatroom).await?.into();
        let payload = json!({ "chatroom": &chatroom, "members": &after });
        self.broadcaster
            .notify(&after, CHATROOM_CREATED, &payload)
            .await;

        Ok(chatroom)
    }

    /// Rename a chatroom and/or replace its explicit member list.
    ///
    /// Users removed from the room are notified along with the remaining
    /// members.
    #[instrument(skip(self))]
    pub async fn update_chatroom(
        &self,
        chatroom_id: ChatroomId,
        sender_id: UserId,
        update: ChatroomUpdate,
    ) -> Result<Chatroom> {
        let mut chatroom = self.access.require_chatroom(chatroom_id).await?;
        let before = self.require_access(&chatroom, sender_id).await?;

        if update.members.is_some() && chatroom.is_project_bound() {
            return Err(AccessError::validation(
                "members of a project chatroom are managed through project roles",
            ));
        }
        let name = update.name.as_deref().map(validate_name).transpose()?;

        let members = update.members.map(|m| Audience::from(m).to_vec());

        self.store
            .update_chatroom(chatroom_id, name, members.as_deref())
            .await?;
        if let Some(name) = name {
            chatroom.name = name.to_string();
        }

        info!(chatroom_id, sender_id, "Chatroom updated");

        let after: Audience = self.access.members_of(&chatroom).await?.into();
        let payload = json!({ "chatroom": &chatroom, "members": &after });
        self.broadcaster
            .notify(&before.union(after), CHATROOM_UPDATED, &payload)
            .await;

        Ok(chatroom)
    }

    /// Delete a chatroom. Any user with access may delete it.
    #[instrument(skip(self))]
    pub async fn delete_chatroom(&self, chatroom_id: ChatroomId, sender_id: UserId) -> Result<()> {
        let chatroom = self.access.require_chatroom(chatroom_id).await?;
        let before = self.require_access(&chatroom, sender_id).await?;

        self.store.delete_chatroom(chatroom_id).await?;

        info!(chatroom_id, sender_id, "Chatroom deleted");

        let payload = json!({ "chatroom_id": chatroom_id });
        self.broadcaster
            .notify(&before, CHATROOM_DELETED, &payload)
            .await;

        Ok(())
    }

    /// Post a message and deliver it to everyone with access.
    #[instrument(skip(self, body))]
    pub async fn post_message(
        &self,
        chatroom_id: ChatroomId,
        sender_id: UserId,
        body: &str,
    ) -> Result<ChatMessage> {
        let body = body.trim();
        if body.is_empty() {
            return Err(AccessError::validation("message body cannot be empty"));
        }
        let length = body.chars().count();
        if length > self.config.max_message_length {
            return Err(AccessError::validation(format!(
                "message is {length} characters, maximum is {}",
                self.config.max_message_length
            )));
        }

        let chatroom = self.access.require_chatroom(chatroom_id).await?;
        let audience = self.require_access(&chatroom, sender_id).await?;

        let message = self
            .store
            .insert_message(chatroom_id, sender_id, body)
            .await?;

        let payload = json!(&message);
        self.broadcaster
            .notify(&audience, CHATROOM_MESSAGE, &payload)
            .await;

        Ok(message)
    }

    /// Messages of a chatroom, oldest first.
    pub async fn list_messages(
        &self,
        chatroom_id: ChatroomId,
        user_id: UserId,
    ) -> Result<Vec<ChatMessage>> {
        let chatroom = self.access.require_chatroom(chatroom_id).await?;
        self.require_access(&chatroom, user_id).await?;
        self.store.list_messages(chatroom_id).await
    }

    /// A chatroom and its access list.
    pub async fn chatroom_detail(
        &self,
        chatroom_id: ChatroomId,
        user_id: UserId,
    ) -> Result<ChatroomDetail> {
        let chatroom = self.access.require_chatroom(chatroom_id).await?;
        let members = self.require_access(&chatroom, user_id).await?.to_vec();
        Ok(ChatroomDetail { chatroom, members })
    }
}

fn validate_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AccessError::validation("chatroom name cannot be empty"));
    }
    Ok(name)
}
