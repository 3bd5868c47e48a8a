//! In-memory implementation of every storage trait.
//!
//! Backed by `dashmap` so it can be shared freely across tasks. Roles are kept
//! in their persisted string form and parsed on read, exactly like a database
//! row, so corrupt values surface as integrity errors here too.

use super::audit::AuditStore;
use super::chatroom::{ChatMessage, Chatroom, ChatroomStore};
use super::directory::{Organization, Project, ProjectDirectory};
use super::membership::{Membership, MembershipStore};
use crate::audit::{MembershipAuditEntry, MembershipScope};
use crate::error::Result;
use crate::roles::{
    ChatroomId, Involvement, OrgId, OrgRole, ProjectId, ProjectRole, StoredRole, UserId,
    parse_role,
};
use crate::utils::current_timestamp;
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;
use tracing::error;

type RoleTable = DashMap<(i64, UserId), String>;

struct InMemoryStoreInner {
    organizations: DashMap<OrgId, Organization>,
    projects: DashMap<ProjectId, Project>,
    org_members: RoleTable,
    project_members: RoleTable,
    chatrooms: DashMap<ChatroomId, Chatroom>,
    chatroom_users: DashMap<ChatroomId, BTreeSet<UserId>>,
    messages: DashMap<ChatroomId, Vec<ChatMessage>>,
    audit_log: RwLock<Vec<MembershipAuditEntry>>,
    next_id: AtomicI64,
}

/// In-memory store implementing all storage traits.
///
/// Cloning shares the same underlying data.
#[derive(Clone)]
pub struct InMemoryStore {
    inner: Arc<InMemoryStoreInner>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(InMemoryStoreInner {
                organizations: DashMap::new(),
                projects: DashMap::new(),
                org_members: DashMap::new(),
                project_members: DashMap::new(),
                chatrooms: DashMap::new(),
                chatroom_users: DashMap::new(),
                messages: DashMap::new(),
                audit_log: RwLock::new(Vec::new()),
                next_id: AtomicI64::new(1),
            }),
        }
    }

    fn next_id(&self) -> i64 {
        self.inner.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Create an organization.
    pub fn create_organization(&self, name: impl Into<String>) -> Organization {
        let org = Organization {
            id: self.next_id(),
            name: name.into(),
        };
        self.inner.organizations.insert(org.id, org.clone());
        org
    }

    /// Create a project, optionally owned by an organization.
    pub fn create_project(&self, name: impl Into<String>, org_id: Option<OrgId>) -> Project {
        let project = Project {
            id: self.next_id(),
            name: name.into(),
            org_id,
        };
        self.inner.projects.insert(project.id, project.clone());
        project
    }

    /// Remove a project record, leaving memberships and chatrooms dangling.
    pub fn remove_project(&self, project_id: ProjectId) {
        self.inner.projects.remove(&project_id);
    }

    /// Remove an organization record, leaving its projects dangling.
    pub fn remove_organization(&self, org_id: OrgId) {
        self.inner.organizations.remove(&org_id);
    }

    /// Insert an organization membership directly, bypassing authorization.
    pub fn insert_org_member(&self, org_id: OrgId, user_id: UserId, role: OrgRole) {
        self.insert_raw_org_role(org_id, user_id, role.as_str());
    }

    /// Insert a project membership directly, bypassing authorization.
    pub fn insert_project_member(&self, project_id: ProjectId, user_id: UserId, role: ProjectRole) {
        self.insert_raw_project_role(project_id, user_id, role.as_str());
    }

    /// Store an arbitrary organization role string.
    pub fn insert_raw_org_role(&self, org_id: OrgId, user_id: UserId, raw: &str) {
        self.inner
            .org_members
            .insert((org_id, user_id), raw.to_string());
    }

    /// Store an arbitrary project role string.
    pub fn insert_raw_project_role(&self, project_id: ProjectId, user_id: UserId, raw: &str) {
        self.inner
            .project_members
            .insert((project_id, user_id), raw.to_string());
    }

    /// Number of stored project membership rows for a project.
    #[must_use]
    pub fn project_row_count(&self, project_id: ProjectId) -> usize {
        self.inner
            .project_members
            .iter()
            .filter(|entry| entry.key().0 == project_id)
            .count()
    }

    /// All recorded audit entries, oldest first.
    pub async fn audit_entries(&self) -> Vec<MembershipAuditEntry> {
        self.inner.audit_log.read().await.clone()
    }
}

fn parse_stored<R: StoredRole>(entity_id: i64, user_id: UserId, raw: &str) -> Result<R> {
    parse_role(raw).inspect_err(|e| {
        error!(kind = R::KIND, entity_id, user_id, error = %e, "Corrupt membership role");
    })
}

fn get_role<R: StoredRole>(table: &RoleTable, entity_id: i64, user_id: UserId) -> Result<Involvement<R>> {
    let raw = table.get(&(entity_id, user_id)).map(|entry| entry.value().clone());
    match raw {
        Some(raw) => Ok(Involvement::Member(parse_stored(entity_id, user_id, &raw)?)),
        None => Ok(Involvement::NotInvolved),
    }
}

fn list_members<R: StoredRole>(table: &RoleTable, entity_id: i64) -> Result<Vec<Membership<R>>> {
    let mut rows: Vec<(UserId, String)> = table
        .iter()
        .filter(|entry| entry.key().0 == entity_id)
        .map(|entry| (entry.key().1, entry.value().clone()))
        .collect();
    rows.sort_by_key(|(user_id, _)| *user_id);

    rows.into_iter()
        .map(|(user_id, raw)| {
            Ok(Membership {
                entity_id,
                user_id,
                role: parse_stored(entity_id, user_id, &raw)?,
            })
        })
        .collect()
}

#[async_trait]
impl MembershipStore<OrgRole> for InMemoryStore {
    async fn get_role(&self, org_id: i64, user_id: UserId) -> Result<Involvement<OrgRole>> {
        get_role(&self.inner.org_members, org_id, user_id)
    }

    async fn assign(&self, org_id: i64, user_id: UserId, role: OrgRole) -> Result<()> {
        self.insert_org_member(org_id, user_id, role);
        Ok(())
    }

    async fn unassign(&self, org_id: i64, user_id: UserId) -> Result<()> {
        self.inner.org_members.remove(&(org_id, user_id));
        Ok(())
    }

    async fn list_members(&self, org_id: i64) -> Result<Vec<Membership<OrgRole>>> {
        list_members(&self.inner.org_members, org_id)
    }
}

#[async_trait]
impl MembershipStore<ProjectRole> for InMemoryStore {
    async fn get_role(&self, project_id: i64, user_id: UserId) -> Result<Involvement<ProjectRole>> {
        get_role(&self.inner.project_members, project_id, user_id)
    }

    async fn assign(&self, project_id: i64, user_id: UserId, role: ProjectRole) -> Result<()> {
        self.insert_project_member(project_id, user_id, role);
        Ok(())
    }

    async fn unassign(&self, project_id: i64, user_id: UserId) -> Result<()> {
        self.inner.project_members.remove(&(project_id, user_id));
        Ok(())
    }

    async fn list_members(&self, project_id: i64) -> Result<Vec<Membership<ProjectRole>>> {
        list_members(&self.inner.project_members, project_id)
    }
}

#[async_trait]
impl ProjectDirectory for InMemoryStore {
    async fn find_project(&self, project_id: ProjectId) -> Result<Option<Project>> {
        Ok(self
            .inner
            .projects
            .get(&project_id)
            .map(|entry| entry.value().clone()))
    }

    async fn find_organization(&self, org_id: OrgId) -> Result<Option<Organization>> {
        Ok(self
            .inner
            .organizations
            .get(&org_id)
            .map(|entry| entry.value().clone()))
    }
}

#[async_trait]
impl ChatroomStore for InMemoryStore {
    async fn find_chatroom(&self, chatroom_id: ChatroomId) -> Result<Option<Chatroom>> {
        Ok(self
            .inner
            .chatrooms
            .get(&chatroom_id)
            .map(|entry| entry.value().clone()))
    }

    async fn create_chatroom(
        &self,
        name: &str,
        project_id: Option<ProjectId>,
        members: &[UserId],
    ) -> Result<Chatroom> {
        let chatroom = Chatroom {
            id: self.next_id(),
            name: name.to_string(),
            project_id,
        };
        self.inner
            .chatroom_users
            .insert(chatroom.id, members.iter().copied().collect());
        self.inner.chatrooms.insert(chatroom.id, chatroom.clone());
        Ok(chatroom)
    }

    async fn update_chatroom(
        &self,
        chatroom_id: ChatroomId,
        name: Option<&str>,
        users: Option<&[UserId]>,
    ) -> Result<()> {
        // Holding the room entry keeps both changes visible together.
        let Some(mut chatroom) = self.inner.chatrooms.get_mut(&chatroom_id) else {
            return Ok(());
        };
        if let Some(name) = name {
            chatroom.name = name.to_string();
        }
        if let Some(users) = users {
            // A single insert swaps the whole set, so readers see old or new, never empty.
            self.inner
                .chatroom_users
                .insert(chatroom_id, users.iter().copied().collect());
        }
        Ok(())
    }

    async fn delete_chatroom(&self, chatroom_id: ChatroomId) -> Result<()> {
        self.inner.chatrooms.remove(&chatroom_id);
        self.inner.chatroom_users.remove(&chatroom_id);
        self.inner.messages.remove(&chatroom_id);
        Ok(())
    }

    async fn list_chatroom_users(&self, chatroom_id: ChatroomId) -> Result<Vec<UserId>> {
        Ok(self
            .inner
            .chatroom_users
            .get(&chatroom_id)
            .map(|entry| entry.value().iter().copied().collect())
            .unwrap_or_default())
    }

    async fn insert_message(
        &self,
        chatroom_id: ChatroomId,
        sender_id: UserId,
        body: &str,
    ) -> Result<ChatMessage> {
        let message = ChatMessage {
            id: self.next_id(),
            chatroom_id,
            sender_id,
            body: body.to_string(),
            created_at: current_timestamp(),
        };
        self.inner
            .messages
            .entry(chatroom_id)
            .or_default()
            .push(message.clone());
        Ok(message)
    }

    async fn list_messages(&self, chatroom_id: ChatroomId) -> Result<Vec<ChatMessage>> {
        Ok(self
            .inner
            .messages
            .get(&chatroom_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl AuditStore for InMemoryStore {
    async fn record_audit(&self, entry: &MembershipAuditEntry) -> Result<()> {
        self.inner.audit_log.write().await.push(entry.clone());
        Ok(())
    }

    async fn get_entity_audit_log(
        &self,
        scope: MembershipScope,
        entity_id: i64,
        limit: usize,
    ) -> Result<Vec<MembershipAuditEntry>> {
        let log = self.inner.audit_log.read().await;
        Ok(log
            .iter()
            .rev()
            .filter(|entry| entry.scope == scope && entry.entity_id == entity_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn get_actor_audit_log(
        &self,
        actor_id: UserId,
        limit: usize,
    ) -> Result<Vec<MembershipAuditEntry>> {
        let log = self.inner.audit_log.read().await;
        Ok(log
            .iter()
            .rev()
            .filter(|entry| entry.actor_id == actor_id)
            .take(limit)
            .cloned()
            .collect())
    }
}
