//! Entity lookups and the platform super-role collaborator.

use crate::config::AccessConfig;
use crate::error::Result;
use crate::roles::{OrgId, ProjectId, UserId};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashSet;

/// Organization record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Organization {
    pub id: OrgId,
    pub name: String,
}

/// Project record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    /// Owning organization, if any.
    pub org_id: Option<OrgId>,
}

/// Read access to organizations and projects.
///
/// Project role resolution needs the owning organization, so the project
/// service consults this before evaluating any transition.
#[async_trait]
pub trait ProjectDirectory: Send + Sync {
    /// Find a project by id.
    async fn find_project(&self, project_id: ProjectId) -> Result<Option<Project>>;

    /// Find an organization by id.
    async fn find_organization(&self, org_id: OrgId) -> Result<Option<Organization>>;
}

/// The platform-level super-role check.
///
/// Platform admins are treated as project `Admin` everywhere.
#[async_trait]
pub trait PlatformAdmins: Send + Sync {
    async fn is_platform_admin(&self, user_id: UserId) -> Result<bool>;
}

/// No user holds the platform super-role.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoPlatformAdmins;

#[async_trait]
impl PlatformAdmins for NoPlatformAdmins {
    async fn is_platform_admin(&self, _user_id: UserId) -> Result<bool> {
        Ok(false)
    }
}

/// A fixed set of platform admins, usually loaded from configuration.
#[derive(Clone, Debug, Default)]
pub struct StaticPlatformAdmins {
    admins: HashSet<UserId>,
}

impl StaticPlatformAdmins {
    #[must_use]
    pub fn new(admins: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            admins: admins.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn from_config(config: &AccessConfig) -> Self {
        Self::new(config.platform_admins.iter().copied())
    }

    #[must_use]
    pub fn contains(&self, user_id: UserId) -> bool {
        self.admins.contains(&user_id)
    }
}

#[async_trait]
impl PlatformAdmins for StaticPlatformAdmins {
    async fn is_platform_admin(&self, user_id: UserId) -> Result<bool> {
        Ok(self.contains(user_id))
    }
}
