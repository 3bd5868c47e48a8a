//! Access-list derivation.
//!
//! An access list is the set of users allowed to read and write a chatroom.
//! It is recomputed from the stored memberships on every call and never
//! cached.
//!
//! - A standalone room's access list is its explicit member list.
//! - A project-bound room's access list is every user whose project role is
//!   `Dev` or `Admin`. `Pending` and `Invited` users are not participants yet.

use crate::error::{AccessError, Result};
use crate::roles::{ChatroomId, ProjectId, ProjectRole, UserId};
use crate::storage::{Chatroom, ChatroomStore, MembershipStore, ProjectDirectory};
use tracing::{debug, error};

/// Derives chatroom and project audiences from stored memberships.
#[derive(Clone)]
pub struct AccessList<S, D, C>
where
    S: MembershipStore<ProjectRole>,
    D: ProjectDirectory,
    C: ChatroomStore,
{
    memberships: S,
    directory: D,
    chatrooms: C,
}

impl<S, D, C> AccessList<S, D, C>
where
    S: MembershipStore<ProjectRole>,
    D: ProjectDirectory,
    C: ChatroomStore,
{
    #[must_use]
    pub fn new(memberships: S, directory: D, chatrooms: C) -> Self {
        Self {
            memberships,
            directory,
            chatrooms,
        }
    }

    /// Look up a chatroom that must exist.
    pub async fn require_chatroom(&self, chatroom_id: ChatroomId) -> Result<Chatroom> {
        self.chatrooms
            .find_chatroom(chatroom_id)
            .await?
            .ok_or_else(|| AccessError::not_found("chatroom", chatroom_id))
    }

    /// Users allowed to see the chatroom, ordered by user id.
    ///
    /// # Errors
    ///
    /// - [`AccessError::NotFound`] if the chatroom does not exist.
    /// - [`AccessError::Integrity`] if a project-bound room references a
    ///   project that no longer exists.
    pub async fn get_chatroom_members(&self, chatroom_id: ChatroomId) -> Result<Vec<UserId>> {
        let chatroom = self.require_chatroom(chatroom_id).await?;
        self.members_of(&chatroom).await
    }

    /// Access list of an already loaded chatroom.
    pub async fn members_of(&self, chatroom: &Chatroom) -> Result<Vec<UserId>> {
        let Some(project_id) = chatroom.project_id else {
            return self.chatrooms.list_chatroom_users(chatroom.id).await;
        };

        if self.directory.find_project(project_id).await?.is_none() {
            error!(
                chatroom_id = chatroom.id,
                project_id, "Chatroom references a missing project"
            );
            return Err(AccessError::integrity(format!(
                "chatroom {} references missing project {project_id}",
                chatroom.id
            )));
        }

        self.participants(project_id).await
    }

    /// Whether the user may read and write the chatroom.
    pub async fn is_allowed(&self, chatroom_id: ChatroomId, user_id: UserId) -> Result<bool> {
        let allowed = self
            .get_chatroom_members(chatroom_id)
            .await?
            .contains(&user_id);
        debug!(chatroom_id, user_id, allowed, "Chatroom access checked");
        Ok(allowed)
    }

    /// Users allowed to see project-scoped resources, ordered by user id.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::NotFound`] if the project does not exist.
    pub async fn get_project_audience(&self, project_id: ProjectId) -> Result<Vec<UserId>> {
        if self.directory.find_project(project_id).await?.is_none() {
            return Err(AccessError::not_found("project", project_id));
        }
        self.participants(project_id).await
    }

    async fn participants(&self, project_id: ProjectId) -> Result<Vec<UserId>> {
        Ok(self
            .memberships
            .list_members(project_id)
            .await?
            .into_iter()
            .filter(|m| m.role.is_participant())
            .map(|m| m.user_id)
            .collect())
    }
}
