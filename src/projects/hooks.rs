//! Transition hooks.
//!
//! Each accepted transition is persisted through its own hook method. The
//! default bodies issue the single `assign` for that transition; override a
//! method to add side effects to one transition without touching the
//! authorization rules.
//!
//! # Example
//!
//! ```rust,ignore
//! struct WelcomeOnAccept { mailer: Mailer }
//!
//! #[async_trait]
//! impl TransitionHooks for WelcomeOnAccept {
//!     async fn accept_pending_dev_request(
//!         &self,
//!         store: &dyn MembershipStore<ProjectRole>,
//!         project_id: ProjectId,
//!         user_id: UserId,
//!     ) -> Result<()> {
//!         store.assign(project_id, user_id, ProjectRole::Dev).await?;
//!         self.mailer.send_welcome(user_id).await;
//!         Ok(())
//!     }
//! }
//! ```

use super::transitions::Transition;
use crate::error::Result;
use crate::roles::{ProjectId, ProjectRole, UserId};
use crate::storage::MembershipStore;
use async_trait::async_trait;

/// Persistence seams for the five project role transitions.
#[async_trait]
pub trait TransitionHooks: Send + Sync {
    /// An org admin applied and becomes project admin.
    async fn promote_org_admin_as_project_admin(
        &self,
        store: &dyn MembershipStore<ProjectRole>,
        project_id: ProjectId,
        user_id: UserId,
    ) -> Result<()> {
        store.assign(project_id, user_id, ProjectRole::Admin).await
    }

    /// A project admin invited the user.
    async fn invite_dev_to_join(
        &self,
        store: &dyn MembershipStore<ProjectRole>,
        project_id: ProjectId,
        user_id: UserId,
    ) -> Result<()> {
        store.assign(project_id, user_id, ProjectRole::Invited).await
    }

    /// The user applied to join.
    async fn store_pending_dev_request(
        &self,
        store: &dyn MembershipStore<ProjectRole>,
        project_id: ProjectId,
        user_id: UserId,
    ) -> Result<()> {
        store.assign(project_id, user_id, ProjectRole::Pending).await
    }

    /// The user accepted their invitation.
    async fn promote_invited_dev(
        &self,
        store: &dyn MembershipStore<ProjectRole>,
        project_id: ProjectId,
        user_id: UserId,
    ) -> Result<()> {
        store.assign(project_id, user_id, ProjectRole::Dev).await
    }

    /// A project admin approved the user's application.
    async fn accept_pending_dev_request(
        &self,
        store: &dyn MembershipStore<ProjectRole>,
        project_id: ProjectId,
        user_id: UserId,
    ) -> Result<()> {
        store.assign(project_id, user_id, ProjectRole::Dev).await
    }

    /// Route a transition to its hook.
    async fn apply(
        &self,
        transition: Transition,
        store: &dyn MembershipStore<ProjectRole>,
        project_id: ProjectId,
        user_id: UserId,
    ) -> Result<()> {
        match transition {
            Transition::PromoteOrgAdminAsProjectAdmin => {
                self.promote_org_admin_as_project_admin(store, project_id, user_id)
                    .await
            }
            Transition::InviteDevToJoin => {
                self.invite_dev_to_join(store, project_id, user_id).await
            }
            Transition::StorePendingDevRequest => {
                self.store_pending_dev_request(store, project_id, user_id)
                    .await
            }
            Transition::PromoteInvitedDev => {
                self.promote_invited_dev(store, project_id, user_id).await
            }
            Transition::AcceptPendingDevRequest => {
                self.accept_pending_dev_request(store, project_id, user_id)
                    .await
            }
        }
    }
}

/// Hooks that only persist the role.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultTransitionHooks;

impl TransitionHooks for DefaultTransitionHooks {}
