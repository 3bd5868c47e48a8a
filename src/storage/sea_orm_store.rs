//! SeaORM-backed storage.
//!
//! Implements every storage trait on top of a single [`DatabaseConnection`].
//!
//! # Example
//!
//! ```rust,ignore
//! use collab_access::storage::SeaOrmStore;
//! use sea_orm::Database;
//!
//! let db = Database::connect("postgres://localhost/collab").await?;
//! let store = SeaOrmStore::new(db);
//! store.create_schema().await?;
//! ```
//!
//! # Database Schema
//!
//! ```sql
//! CREATE TABLE organizations (
//!     id BIGSERIAL PRIMARY KEY,
//!     name VARCHAR(255) NOT NULL
//! );
//!
//! CREATE TABLE projects (
//!     id BIGSERIAL PRIMARY KEY,
//!     name VARCHAR(255) NOT NULL,
//!     org_id BIGINT
//! );
//!
//! CREATE TABLE organization_members (
//!     org_id BIGINT NOT NULL,
//!     user_id BIGINT NOT NULL,
//!     role VARCHAR(20) NOT NULL,
//!     PRIMARY KEY (org_id, user_id)
//! );
//!
//! CREATE TABLE project_members (
//!     project_id BIGINT NOT NULL,
//!     user_id BIGINT NOT NULL,
//!     role VARCHAR(20) NOT NULL,
//!     PRIMARY KEY (project_id, user_id)
//! );
//!
//! CREATE TABLE chatrooms (
//!     id BIGSERIAL PRIMARY KEY,
//!     name VARCHAR(255) NOT NULL,
//!     project_id BIGINT
//! );
//!
//! CREATE TABLE chatroom_users (
//!     chatroom_id BIGINT NOT NULL,
//!     user_id BIGINT NOT NULL,
//!     PRIMARY KEY (chatroom_id, user_id)
//! );
//!
//! CREATE TABLE chat_messages (
//!     id BIGSERIAL PRIMARY KEY,
//!     chatroom_id BIGINT NOT NULL,
//!     sender_id BIGINT NOT NULL,
//!     body TEXT NOT NULL,
//!     created_at BIGINT NOT NULL
//! );
//! ```

use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Schema, Set, TransactionTrait,
    sea_query::{Expr, OnConflict},
};

use super::audit::AuditStore;
use super::chatroom::{ChatMessage, Chatroom, ChatroomStore};
use super::directory::{Organization, Project, ProjectDirectory};
use super::membership::{Membership, MembershipStore};
use crate::audit::{MembershipAuditEntry, MembershipEvent, MembershipScope};
use crate::error::{AccessError, Result};
use crate::roles::{
    ChatroomId, Involvement, OrgId, OrgRole, ProjectId, ProjectRole, StoredRole, UserId,
    parse_role,
};
use crate::utils::current_timestamp;

// =============================================================================
// SeaORM Entities
// =============================================================================

mod entity {
    pub mod organization {
        use sea_orm::entity::prelude::*;

        #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
        #[sea_orm(table_name = "organizations")]
        pub struct Model {
            #[sea_orm(primary_key)]
            pub id: i64,
            pub name: String,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }

    pub mod project {
        use sea_orm::entity::prelude::*;

        #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
        #[sea_orm(table_name = "projects")]
        pub struct Model {
            #[sea_orm(primary_key)]
            pub id: i64,
            pub name: String,
            pub org_id: Option<i64>,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }

    pub mod organization_member {
        use sea_orm::entity::prelude::*;

        #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
        #[sea_orm(table_name = "organization_members")]
        pub struct Model {
            #[sea_orm(primary_key, auto_increment = false)]
            pub org_id: i64,
            #[sea_orm(primary_key, auto_increment = false)]
            pub user_id: i64,
            pub role: String,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }

    pub mod project_member {
        use sea_orm::entity::prelude::*;

        #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
        #[sea_orm(table_name = "project_members")]
        pub struct Model {
            #[sea_orm(primary_key, auto_increment = false)]
            pub project_id: i64,
            #[sea_orm(primary_key, auto_increment = false)]
            pub user_id: i64,
            pub role: String,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }

    pub mod chatroom {
        use sea_orm::entity::prelude::*;

        #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
        #[sea_orm(table_name = "chatrooms")]
        pub struct Model {
            #[sea_orm(primary_key)]
            pub id: i64,
            pub name: String,
            pub project_id: Option<i64>,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }

    pub mod chatroom_user {
        use sea_orm::entity::prelude::*;

        #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
        #[sea_orm(table_name = "chatroom_users")]
        pub struct Model {
            #[sea_orm(primary_key, auto_increment = false)]
            pub chatroom_id: i64,
            #[sea_orm(primary_key, auto_increment = false)]
            pub user_id: i64,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }

    pub mod chat_message {
        use sea_orm::entity::prelude::*;

        #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
        #[sea_orm(table_name = "chat_messages")]
        pub struct Model {
            #[sea_orm(primary_key)]
            pub id: i64,
            pub chatroom_id: i64,
            pub sender_id: i64,
            #[sea_orm(column_type = "Text")]
            pub body: String,
            pub created_at: i64,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }

    pub mod membership_audit {
        use sea_orm::entity::prelude::*;

        #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
        #[sea_orm(table_name = "membership_audit_log")]
        pub struct Model {
            #[sea_orm(primary_key, auto_increment = false)]
            pub id: String,
            pub event: String,
            pub scope: String,
            pub entity_id: i64,
            pub actor_id: i64,
            pub target_id: i64,
            pub role: Option<String>,
            pub timestamp: i64,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }
}

use entity::{
    chat_message, chatroom, chatroom_user, membership_audit, organization, organization_member,
    project, project_member,
};

// =============================================================================
// Conversions
// =============================================================================

/// Safely convert i64 to u64, clamping negative values to 0.
#[inline]
fn i64_to_u64(v: i64) -> u64 {
    u64::try_from(v).unwrap_or(0)
}

/// Safely convert u64 to i64, clamping values above i64::MAX.
#[inline]
fn u64_to_i64(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

fn model_to_project(m: project::Model) -> Project {
    Project {
        id: m.id,
        name: m.name,
        org_id: m.org_id,
    }
}

fn model_to_chatroom(m: chatroom::Model) -> Chatroom {
    Chatroom {
        id: m.id,
        name: m.name,
        project_id: m.project_id,
    }
}

fn model_to_message(m: chat_message::Model) -> ChatMessage {
    ChatMessage {
        id: m.id,
        chatroom_id: m.chatroom_id,
        sender_id: m.sender_id,
        body: m.body,
        created_at: i64_to_u64(m.created_at),
    }
}

fn parse_stored<R: StoredRole>(entity_id: i64, user_id: UserId, raw: &str) -> Result<R> {
    parse_role(raw).inspect_err(|e| {
        tracing::error!(kind = R::KIND, entity_id, user_id, error = %e, "Corrupt membership role");
    })
}

fn to_membership<R: StoredRole>(entity_id: i64, user_id: UserId, raw: &str) -> Result<Membership<R>> {
    Ok(Membership {
        entity_id,
        user_id,
        role: parse_stored(entity_id, user_id, raw)?,
    })
}

fn parse_event(raw: &str) -> Result<MembershipEvent> {
    match raw {
        "role_assigned" => Ok(MembershipEvent::RoleAssigned),
        "role_removed" => Ok(MembershipEvent::RoleRemoved),
        "transition_rejected" => Ok(MembershipEvent::TransitionRejected),
        other => Err(AccessError::integrity(format!(
            "unknown audit event: '{other}'"
        ))),
    }
}

fn parse_scope(raw: &str) -> Result<MembershipScope> {
    match raw {
        "organization" => Ok(MembershipScope::Organization),
        "project" => Ok(MembershipScope::Project),
        other => Err(AccessError::integrity(format!(
            "unknown audit scope: '{other}'"
        ))),
    }
}

fn scope_as_str(scope: MembershipScope) -> &'static str {
    match scope {
        MembershipScope::Organization => "organization",
        MembershipScope::Project => "project",
    }
}

fn model_to_audit(m: membership_audit::Model) -> Result<MembershipAuditEntry> {
    Ok(MembershipAuditEntry {
        id: m.id,
        event: parse_event(&m.event)?,
        scope: parse_scope(&m.scope)?,
        entity_id: m.entity_id,
        actor_id: m.actor_id,
        target_id: m.target_id,
        role: m.role,
        timestamp: i64_to_u64(m.timestamp),
    })
}

// =============================================================================
// Store
// =============================================================================

/// SeaORM implementation of all storage traits.
#[derive(Clone, Debug)]
pub struct SeaOrmStore {
    db: DatabaseConnection,
}

impl SeaOrmStore {
    /// Create a new SeaORM store.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Get a reference to the underlying database connection.
    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Create all tables if they do not exist yet.
    ///
    /// Intended for tests and local development. Production deployments
    /// should manage the schema through migrations.
    pub async fn create_schema(&self) -> Result<()> {
        let backend = self.db.get_database_backend();
        let schema = Schema::new(backend);

        let statements = [
            schema.create_table_from_entity(organization::Entity),
            schema.create_table_from_entity(project::Entity),
            schema.create_table_from_entity(organization_member::Entity),
            schema.create_table_from_entity(project_member::Entity),
            schema.create_table_from_entity(chatroom::Entity),
            schema.create_table_from_entity(chatroom_user::Entity),
            schema.create_table_from_entity(chat_message::Entity),
            schema.create_table_from_entity(membership_audit::Entity),
        ];

        for mut stmt in statements {
            stmt.if_not_exists();
            self.db.execute(backend.build(&stmt)).await?;
        }

        tracing::debug!("schema created");
        Ok(())
    }

    /// Insert an organization record.
    pub async fn insert_organization(&self, name: &str) -> Result<Organization> {
        let model = organization::ActiveModel {
            name: Set(name.to_string()),
            ..Default::default()
        };

        let id = organization::Entity::insert(model)
            .exec(&self.db)
            .await?
            .last_insert_id;

        Ok(Organization {
            id,
            name: name.to_string(),
        })
    }

    /// Insert a project record.
    pub async fn insert_project(&self, name: &str, org_id: Option<OrgId>) -> Result<Project> {
        let model = project::ActiveModel {
            name: Set(name.to_string()),
            org_id: Set(org_id),
            ..Default::default()
        };

        let id = project::Entity::insert(model)
            .exec(&self.db)
            .await?
            .last_insert_id;

        Ok(Project {
            id,
            name: name.to_string(),
            org_id,
        })
    }
}

// =============================================================================
// MembershipStore Implementations
// =============================================================================

#[async_trait]
impl MembershipStore<OrgRole> for SeaOrmStore {
    async fn get_role(&self, org_id: i64, user_id: UserId) -> Result<Involvement<OrgRole>> {
        let row = organization_member::Entity::find_by_id((org_id, user_id))
            .one(&self.db)
            .await?;

        Ok(row
            .map(|m| parse_stored::<OrgRole>(org_id, user_id, &m.role))
            .transpose()?
            .into())
    }

    async fn assign(&self, org_id: i64, user_id: UserId, role: OrgRole) -> Result<()> {
        tracing::debug!(org_id, user_id, role = %role, "writing organization role");

        let model = organization_member::ActiveModel {
            org_id: Set(org_id),
            user_id: Set(user_id),
            role: Set(role.as_str().to_string()),
        };

        organization_member::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    organization_member::Column::OrgId,
                    organization_member::Column::UserId,
                ])
                .update_columns([organization_member::Column::Role])
                .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        Ok(())
    }

    async fn unassign(&self, org_id: i64, user_id: UserId) -> Result<()> {
        tracing::debug!(org_id, user_id, "deleting organization role");

        organization_member::Entity::delete_many()
            .filter(organization_member::Column::OrgId.eq(org_id))
            .filter(organization_member::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await?;

        Ok(())
    }

    async fn list_members(&self, org_id: i64) -> Result<Vec<Membership<OrgRole>>> {
        let rows = organization_member::Entity::find()
            .filter(organization_member::Column::OrgId.eq(org_id))
            .order_by_asc(organization_member::Column::UserId)
            .all(&self.db)
            .await?;

        rows.iter()
            .map(|m| to_membership(m.org_id, m.user_id, &m.role))
            .collect()
    }
}

#[async_trait]
impl MembershipStore<ProjectRole> for SeaOrmStore {
    async fn get_role(&self, project_id: i64, user_id: UserId) -> Result<Involvement<ProjectRole>> {
        let row = project_member::Entity::find_by_id((project_id, user_id))
            .one(&self.db)
            .await?;

        Ok(row
            .map(|m| parse_stored::<ProjectRole>(project_id, user_id, &m.role))
            .transpose()?
            .into())
    }

    async fn assign(&self, project_id: i64, user_id: UserId, role: ProjectRole) -> Result<()> {
        tracing::debug!(project_id, user_id, role = %role, "writing project role");

        let model = project_member::ActiveModel {
            project_id: Set(project_id),
            user_id: Set(user_id),
            role: Set(role.as_str().to_string()),
        };

        project_member::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    project_member::Column::ProjectId,
                    project_member::Column::UserId,
                ])
                .update_columns([project_member::Column::Role])
                .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        Ok(())
    }

    async fn unassign(&self, project_id: i64, user_id: UserId) -> Result<()> {
        tracing::debug!(project_id, user_id, "deleting project role");

        project_member::Entity::delete_many()
            .filter(project_member::Column::ProjectId.eq(project_id))
            .filter(project_member::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await?;

        Ok(())
    }

    async fn list_members(&self, project_id: i64) -> Result<Vec<Membership<ProjectRole>>> {
        let rows = project_member::Entity::find()
            .filter(project_member::Column::ProjectId.eq(project_id))
            .order_by_asc(project_member::Column::UserId)
            .all(&self.db)
            .await?;

        rows.iter()
            .map(|m| to_membership(m.project_id, m.user_id, &m.role))
            .collect()
    }
}

// =============================================================================
// ProjectDirectory Implementation
// =============================================================================

#[async_trait]
impl ProjectDirectory for SeaOrmStore {
    async fn find_project(&self, project_id: ProjectId) -> Result<Option<Project>> {
        let row = project::Entity::find_by_id(project_id).one(&self.db).await?;
        Ok(row.map(model_to_project))
    }

    async fn find_organization(&self, org_id: OrgId) -> Result<Option<Organization>> {
        let row = organization::Entity::find_by_id(org_id).one(&self.db).await?;
        Ok(row.map(|m| Organization {
            id: m.id,
            name: m.name,
        }))
    }
}

// =============================================================================
// ChatroomStore Implementation
// =============================================================================

#[async_trait]
impl ChatroomStore for SeaOrmStore {
    async fn find_chatroom(&self, chatroom_id: ChatroomId) -> Result<Option<Chatroom>> {
        let row = chatroom::Entity::find_by_id(chatroom_id)
            .one(&self.db)
            .await?;
        Ok(row.map(model_to_chatroom))
    }

    async fn create_chatroom(
        &self,
        name: &str,
        project_id: Option<ProjectId>,
        members: &[UserId],
    ) -> Result<Chatroom> {
        let txn = self.db.begin().await?;

        let model = chatroom::ActiveModel {
            name: Set(name.to_string()),
            project_id: Set(project_id),
            ..Default::default()
        };
        let id = chatroom::Entity::insert(model)
            .exec(&txn)
            .await?
            .last_insert_id;

        if !members.is_empty() {
            let rows = members.iter().map(|user_id| chatroom_user::ActiveModel {
                chatroom_id: Set(id),
                user_id: Set(*user_id),
            });
            chatroom_user::Entity::insert_many(rows)
                .on_conflict(
                    OnConflict::columns([
                        chatroom_user::Column::ChatroomId,
                        chatroom_user::Column::UserId,
                    ])
                    .do_nothing()
                    .to_owned(),
                )
                .exec_without_returning(&txn)
                .await?;
        }

        txn.commit().await?;

        tracing::debug!(chatroom_id = id, project_id = ?project_id, "chatroom created");

        Ok(Chatroom {
            id,
            name: name.to_string(),
            project_id,
        })
    }

    async fn update_chatroom(
        &self,
        chatroom_id: ChatroomId,
        name: Option<&str>,
        users: Option<&[UserId]>,
    ) -> Result<()> {
        let txn = self.db.begin().await?;

        if let Some(name) = name {
            chatroom::Entity::update_many()
                .col_expr(chatroom::Column::Name, Expr::value(name))
                .filter(chatroom::Column::Id.eq(chatroom_id))
                .exec(&txn)
                .await?;
        }

        if let Some(users) = users {
            chatroom_user::Entity::delete_many()
                .filter(chatroom_user::Column::ChatroomId.eq(chatroom_id))
                .exec(&txn)
                .await?;

            if !users.is_empty() {
                let rows = users.iter().map(|user_id| chatroom_user::ActiveModel {
                    chatroom_id: Set(chatroom_id),
                    user_id: Set(*user_id),
                });
                chatroom_user::Entity::insert_many(rows)
                    .on_conflict(
                        OnConflict::columns([
                            chatroom_user::Column::ChatroomId,
                            chatroom_user::Column::UserId,
                        ])
                        .do_nothing()
                        .to_owned(),
                    )
                    .exec_without_returning(&txn)
                    .await?;
            }
        }

        txn.commit().await?;

        tracing::debug!(
            chatroom_id,
            renamed = name.is_some(),
            members = ?users.map(<[UserId]>::len),
            "chatroom updated"
        );
        Ok(())
    }

    async fn delete_chatroom(&self, chatroom_id: ChatroomId) -> Result<()> {
        let txn = self.db.begin().await?;

        chat_message::Entity::delete_many()
            .filter(chat_message::Column::ChatroomId.eq(chatroom_id))
            .exec(&txn)
            .await?;
        chatroom_user::Entity::delete_many()
            .filter(chatroom_user::Column::ChatroomId.eq(chatroom_id))
            .exec(&txn)
            .await?;
        chatroom::Entity::delete_by_id(chatroom_id).exec(&txn).await?;

        txn.commit().await?;
        Ok(())
    }

    async fn list_chatroom_users(&self, chatroom_id: ChatroomId) -> Result<Vec<UserId>> {
        let rows = chatroom_user::Entity::find()
            .filter(chatroom_user::Column::ChatroomId.eq(chatroom_id))
            .order_by_asc(chatroom_user::Column::UserId)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(|m| m.user_id).collect())
    }

    async fn insert_message(
        &self,
        chatroom_id: ChatroomId,
        sender_id: UserId,
        body: &str,
    ) -> Result<ChatMessage> {
        let created_at = current_timestamp();
        let model = chat_message::ActiveModel {
            chatroom_id: Set(chatroom_id),
            sender_id: Set(sender_id),
            body: Set(body.to_string()),
            created_at: Set(u64_to_i64(created_at)),
            ..Default::default()
        };

        let id = chat_message::Entity::insert(model)
            .exec(&self.db)
            .await?
            .last_insert_id;

        Ok(ChatMessage {
            id,
            chatroom_id,
            sender_id,
            body: body.to_string(),
            created_at,
        })
    }

    async fn list_messages(&self, chatroom_id: ChatroomId) -> Result<Vec<ChatMessage>> {
        let rows = chat_message::Entity::find()
            .filter(chat_message::Column::ChatroomId.eq(chatroom_id))
            .order_by_asc(chat_message::Column::Id)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(model_to_message).collect())
    }
}

// =============================================================================
// AuditStore Implementation
// =============================================================================

#[async_trait]
impl AuditStore for SeaOrmStore {
    async fn record_audit(&self, entry: &MembershipAuditEntry) -> Result<()> {
        let model = membership_audit::ActiveModel {
            id: Set(entry.id.clone()),
            event: Set(entry.event.to_string()),
            scope: Set(scope_as_str(entry.scope).to_string()),
            entity_id: Set(entry.entity_id),
            actor_id: Set(entry.actor_id),
            target_id: Set(entry.target_id),
            role: Set(entry.role.clone()),
            timestamp: Set(u64_to_i64(entry.timestamp)),
        };

        membership_audit::Entity::insert(model)
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    async fn get_entity_audit_log(
        &self,
        scope: MembershipScope,
        entity_id: i64,
        limit: usize,
    ) -> Result<Vec<MembershipAuditEntry>> {
        let rows = membership_audit::Entity::find()
            .filter(membership_audit::Column::Scope.eq(scope_as_str(scope)))
            .filter(membership_audit::Column::EntityId.eq(entity_id))
            .order_by_desc(membership_audit::Column::Timestamp)
            .limit(limit as u64)
            .all(&self.db)
            .await?;
        rows.into_iter().map(model_to_audit).collect()
    }

    async fn get_actor_audit_log(
        &self,
        actor_id: UserId,
        limit: usize,
    ) -> Result<Vec<MembershipAuditEntry>> {
        let rows = membership_audit::Entity::find()
            .filter(membership_audit::Column::ActorId.eq(actor_id))
            .order_by_desc(membership_audit::Column::Timestamp)
            .limit(limit as u64)
            .all(&self.db)
            .await?;
        rows.into_iter().map(model_to_audit).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::{NoopNotifier, Workspace};
    use crate::storage::NoPlatformAdmins;
    use sea_orm::Database;
    use tracing_test::traced_test;

    async fn sqlite_store() -> SeaOrmStore {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        let store = SeaOrmStore::new(db);
        store.create_schema().await.unwrap();
        store
    }

    #[test]
    fn test_safe_integer_conversions() {
        assert_eq!(i64_to_u64(100), 100);
        assert_eq!(i64_to_u64(-1), 0);
        assert_eq!(u64_to_i64(100), 100);
        assert_eq!(u64_to_i64(u64::MAX), i64::MAX);
    }

    #[test]
    fn test_model_to_chatroom() {
        let model = chatroom::Model {
            id: 4,
            name: "general".to_string(),
            project_id: Some(2),
        };
        let room = model_to_chatroom(model);
        assert_eq!(room.id, 4);
        assert!(room.is_project_bound());
    }

    #[test]
    #[traced_test]
    fn test_to_membership_rejects_unknown_role() {
        let ok: Membership<ProjectRole> = to_membership(1, 2, "dev").unwrap();
        assert_eq!(ok.role, ProjectRole::Dev);

        let err = to_membership::<ProjectRole>(1, 2, "owner").unwrap_err();
        assert!(matches!(err, AccessError::Integrity(_)));
        assert!(logs_contain("Corrupt membership role"));
    }

    #[test]
    fn test_audit_model_roundtrip_fields() {
        let model = membership_audit::Model {
            id: "a".to_string(),
            event: "transition_rejected".to_string(),
            scope: "project".to_string(),
            entity_id: 1,
            actor_id: 2,
            target_id: 3,
            role: Some("admin".to_string()),
            timestamp: 1_700_000_000,
        };
        let entry = model_to_audit(model).unwrap();
        assert_eq!(entry.event, MembershipEvent::TransitionRejected);
        assert_eq!(entry.scope, MembershipScope::Project);

        let bad = membership_audit::Model {
            id: "b".to_string(),
            event: "exploded".to_string(),
            scope: "project".to_string(),
            entity_id: 1,
            actor_id: 2,
            target_id: 3,
            role: None,
            timestamp: 0,
        };
        assert!(matches!(model_to_audit(bad), Err(AccessError::Integrity(_))));
    }

    #[tokio::test]
    async fn test_sqlite_membership_upsert() {
        let store = sqlite_store().await;
        let org = store.insert_organization("Acme").await.unwrap();
        let project = store.insert_project("Rocket", Some(org.id)).await.unwrap();

        MembershipStore::<ProjectRole>::assign(&store, project.id, 7, ProjectRole::Pending)
            .await
            .unwrap();
        MembershipStore::<ProjectRole>::assign(&store, project.id, 7, ProjectRole::Dev)
            .await
            .unwrap();

        let members: Vec<Membership<ProjectRole>> = store.list_members(project.id).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].role, ProjectRole::Dev);

        MembershipStore::<ProjectRole>::unassign(&store, project.id, 7)
            .await
            .unwrap();
        let role: Involvement<ProjectRole> = store.get_role(project.id, 7).await.unwrap();
        assert_eq!(role, Involvement::NotInvolved);

        let found = store.find_project(project.id).await.unwrap().unwrap();
        assert_eq!(found.org_id, Some(org.id));
    }

    #[tokio::test]
    async fn test_sqlite_audit_log_separates_scopes() {
        let store = sqlite_store().await;
        let org = store.insert_organization("Acme").await.unwrap();
        let project = store.insert_project("Rocket", Some(org.id)).await.unwrap();
        assert_eq!(org.id, project.id);

        MembershipStore::<OrgRole>::assign(&store, org.id, 5, OrgRole::Admin)
            .await
            .unwrap();
        let workspace = Workspace::new(store.clone(), NoPlatformAdmins, NoopNotifier)
            .with_audit_store(store.clone());

        workspace
            .assign_org_member(org.id, 6, OrgRole::Invited, 5)
            .await
            .unwrap();
        workspace
            .assign_project_member(project.id, 7, ProjectRole::Pending, 7)
            .await
            .unwrap();

        let project_log = store
            .get_entity_audit_log(MembershipScope::Project, project.id, 10)
            .await
            .unwrap();
        assert_eq!(project_log.len(), 1);
        assert_eq!(project_log[0].target_id, 7);

        let org_log = store
            .get_entity_audit_log(MembershipScope::Organization, org.id, 10)
            .await
            .unwrap();
        assert_eq!(org_log.len(), 1);
        assert_eq!(org_log[0].target_id, 6);

        let limited = store.get_actor_audit_log(5, 0).await.unwrap();
        assert!(limited.is_empty());
    }

    #[tokio::test]
    async fn test_sqlite_failed_update_keeps_name() {
        let store = sqlite_store().await;
        let room = store.create_chatroom("general", None, &[1]).await.unwrap();

        store
            .connection()
            .execute_unprepared("DROP TABLE chatroom_users")
            .await
            .unwrap();

        let result = store
            .update_chatroom(room.id, Some("random"), Some(&[2]))
            .await;
        assert!(matches!(result, Err(AccessError::Storage(_))));

        let found = store.find_chatroom(room.id).await.unwrap().unwrap();
        assert_eq!(found.name, "general");
    }

    #[tokio::test]
    async fn test_sqlite_chatroom_members_replaced() {
        let store = sqlite_store().await;
        let room = store.create_chatroom("general", None, &[3, 1]).await.unwrap();
        assert_eq!(store.list_chatroom_users(room.id).await.unwrap(), vec![1, 3]);

        store
            .update_chatroom(room.id, Some("random"), Some(&[2, 5]))
            .await
            .unwrap();
        assert_eq!(store.list_chatroom_users(room.id).await.unwrap(), vec![2, 5]);
        let found = store.find_chatroom(room.id).await.unwrap().unwrap();
        assert_eq!(found.name, "random");

        store.insert_message(room.id, 2, "hi").await.unwrap();
        store.delete_chatroom(room.id).await.unwrap();
        assert!(store.find_chatroom(room.id).await.unwrap().is_none());
        assert!(store.list_messages(room.id).await.unwrap().is_empty());
    }
}
