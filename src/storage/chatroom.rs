//! Chatroom storage trait.

use crate::error::Result;
use crate::roles::{ChatroomId, MessageId, ProjectId, UserId};
use async_trait::async_trait;
use serde::Serialize;

/// Chatroom record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Chatroom {
    pub id: ChatroomId,
    pub name: String,
    /// Project the room belongs to. Project-bound rooms derive their audience
    /// from project roles; standalone rooms keep an explicit member list.
    pub project_id: Option<ProjectId>,
}

impl Chatroom {
    #[must_use]
    pub fn is_project_bound(&self) -> bool {
        self.project_id.is_some()
    }
}

/// Chat message record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub chatroom_id: ChatroomId,
    pub sender_id: UserId,
    pub body: String,
    /// Unix seconds.
    pub created_at: u64,
}

/// Trait for chatroom storage operations.
///
/// The explicit member list (`chatroom_users`) is only meaningful for
/// standalone rooms. It is an unordered set without roles.
#[async_trait]
pub trait ChatroomStore: Send + Sync {
    /// Find a chatroom by id.
    async fn find_chatroom(&self, chatroom_id: ChatroomId) -> Result<Option<Chatroom>>;

    /// Create a chatroom together with its initial explicit members.
    async fn create_chatroom(
        &self,
        name: &str,
        project_id: Option<ProjectId>,
        members: &[UserId],
    ) -> Result<Chatroom>;

    /// Rename a chatroom and/or replace its explicit member list.
    ///
    /// Both changes are applied together or not at all. Implementations must
    /// delete and re-insert members inside one transaction so a reader never
    /// observes an empty list halfway through.
    async fn update_chatroom(
        &self,
        chatroom_id: ChatroomId,
        name: Option<&str>,
        users: Option<&[UserId]>,
    ) -> Result<()>;

    /// Delete a chatroom along with its members and messages.
    async fn delete_chatroom(&self, chatroom_id: ChatroomId) -> Result<()>;

    /// Explicit members of a chatroom, ordered by user id.
    async fn list_chatroom_users(&self, chatroom_id: ChatroomId) -> Result<Vec<UserId>>;

    /// Persist a message.
    async fn insert_message(
        &self,
        chatroom_id: ChatroomId,
        sender_id: UserId,
        body: &str,
    ) -> Result<ChatMessage>;

    /// Messages of a chatroom, oldest first.
    async fn list_messages(&self, chatroom_id: ChatroomId) -> Result<Vec<ChatMessage>>;
}
