//! Membership audit trail.
//!
//! Every accepted role change and every rejected transition is recorded
//! through an [`OptionalAuditStore`](crate::storage::OptionalAuditStore).

use crate::roles::UserId;
use crate::utils::current_timestamp;
use serde::{Deserialize, Serialize};

/// Which membership vocabulary an entry refers to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MembershipScope {
    Organization,
    Project,
}

/// Membership audit event types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MembershipEvent {
    /// A role was written for the target.
    RoleAssigned,
    /// The target's membership row was deleted.
    RoleRemoved,
    /// A requested transition was refused.
    TransitionRejected,
}

impl std::fmt::Display for MembershipEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RoleAssigned => write!(f, "role_assigned"),
            Self::RoleRemoved => write!(f, "role_removed"),
            Self::TransitionRejected => write!(f, "transition_rejected"),
        }
    }
}

/// Audit entry for a membership operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipAuditEntry {
    /// Unique identifier for this audit entry.
    pub id: String,
    pub event: MembershipEvent,
    pub scope: MembershipScope,
    /// Organization or project id, depending on `scope`.
    pub entity_id: i64,
    /// User who performed the action.
    pub actor_id: UserId,
    /// User whose membership was affected.
    pub target_id: UserId,
    /// Role involved (requested role for rejections, stored role otherwise).
    pub role: Option<String>,
    /// Timestamp (Unix seconds).
    pub timestamp: u64,
}

impl MembershipAuditEntry {
    #[must_use]
    pub fn new(
        event: MembershipEvent,
        scope: MembershipScope,
        entity_id: i64,
        actor_id: UserId,
        target_id: UserId,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event,
            scope,
            entity_id,
            actor_id,
            target_id,
            role: None,
            timestamp: current_timestamp(),
        }
    }

    /// Set the role involved.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }
}
