//! collab-access - membership state machines and access lists for
//! collaborative workspaces
//!
//! Organizations contain projects, projects own chatrooms, and users move
//! between membership states inside each of them. This crate decides which
//! moves are allowed, who may read a chatroom, and who must hear about a
//! change.
//!
//! # Modules
//!
//! - **roles**: closed role vocabularies and the `NotInvolved` sentinel
//! - **storage**: store traits plus in-memory and SeaORM implementations
//! - **organizations**: organization membership service
//! - **projects**: project membership service and its transition table
//! - **access**: chatroom and project access lists
//! - **broadcast**: audiences, notifiers and the `Workspace` coordinator
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use collab_access::broadcast::{UserHub, Workspace};
//! use collab_access::roles::ProjectRole;
//! use collab_access::storage::{InMemoryStore, StaticPlatformAdmins};
//! use collab_access::ConfigBuilder;
//!
//! #[tokio::main]
//! async fn main() -> collab_access::Result<()> {
//!     collab_access::init_tracing();
//!
//!     let config = ConfigBuilder::new().from_env().build()?;
//!     let store = InMemoryStore::new();
//!     let hub = UserHub::new();
//!
//!     let workspace = Workspace::new(
//!         store.clone(),
//!         StaticPlatformAdmins::from_config(&config.access),
//!         hub.clone(),
//!     )
//!     .with_config(config.access.clone());
//!
//!     let org = store.create_organization("Acme");
//!     let project = store.create_project("Rocket", Some(org.id));
//!
//!     // User 7 applies to join the project.
//!     workspace
//!         .assign_project_member(project.id, 7, ProjectRole::Pending, 7)
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod access;
pub mod audit;
pub mod broadcast;
mod config;
mod error;
pub mod organizations;
pub mod projects;
pub mod roles;
pub mod storage;
pub mod utils;

// Re-exports for public API
pub use access::AccessList;
pub use broadcast::{Notifier, UserHub, Workspace};
pub use config::{AccessConfig, Config, ConfigBuilder, LoggingConfig};
pub use error::{AccessError, ErrorCategory, Result};
pub use organizations::OrgMembershipService;
pub use projects::{ProjectMembershipService, TransitionHooks};
pub use roles::{
    AssignOutcome, ChatroomId, Involvement, MessageId, OrgId, OrgRole, ProjectId, ProjectRole,
    UnassignOutcome, UserId,
};
pub use storage::InMemoryStore;
#[cfg(feature = "database")]
pub use storage::SeaOrmStore;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging with sensible defaults
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "info", "debug", "collab_access=debug")
/// - `COLLAB_LOG_JSON`: Set to "true" for JSON formatted logs
///
/// # Example
///
/// ```rust,no_run
/// collab_access::init_tracing();
/// ```
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = utils::get_env_with_prefix("LOG_JSON")
        .map(|v| v.parse::<bool>().unwrap_or(false))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Initialize tracing with a custom configuration
pub fn init_tracing_with_config(config: &Config) {
    let env_filter = EnvFilter::new(&config.logging.level);

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
