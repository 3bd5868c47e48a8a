//! Membership audit storage trait.

use crate::audit::{MembershipAuditEntry, MembershipScope};
use crate::error::Result;
use crate::roles::UserId;
use async_trait::async_trait;
use std::future::Future;

/// Trait for membership audit storage.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Record an audit entry.
    async fn record_audit(&self, entry: &MembershipAuditEntry) -> Result<()>;

    /// Entries for one organization or project, newest first.
    ///
    /// Organization and project ids are numbered independently, so the scope
    /// is part of the key.
    async fn get_entity_audit_log(
        &self,
        scope: MembershipScope,
        entity_id: i64,
        limit: usize,
    ) -> Result<Vec<MembershipAuditEntry>>;

    /// Entries where the user was the actor, newest first.
    async fn get_actor_audit_log(
        &self,
        actor_id: UserId,
        limit: usize,
    ) -> Result<Vec<MembershipAuditEntry>>;
}

/// Optional audit store for fire-and-forget audit logging.
///
/// Services record through this trait so a failing audit backend never fails
/// a membership operation.
pub trait OptionalAuditStore: Send + Sync + Clone + 'static {
    /// Record an audit entry. Errors are logged, not propagated.
    fn record(&self, entry: MembershipAuditEntry) -> impl Future<Output = ()> + Send;
}

/// No-op implementation for when audit logging is disabled.
impl OptionalAuditStore for () {
    async fn record(&self, _entry: MembershipAuditEntry) {}
}

/// Wrapper to enable audit logging with a real store.
#[derive(Clone)]
pub struct WithAuditStore<A: AuditStore + Clone>(pub A);

impl<A: AuditStore + Clone + 'static> OptionalAuditStore for WithAuditStore<A> {
    async fn record(&self, entry: MembershipAuditEntry) {
        if let Err(e) = self.0.record_audit(&entry).await {
            tracing::warn!(
                error = %e,
                event = %entry.event,
                entity_id = entry.entity_id,
                "Failed to record audit entry"
            );
        }
    }
}
