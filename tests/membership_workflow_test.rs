//! End-to-end membership workflows through the workspace coordinator.

use async_trait::async_trait;
use collab_access::broadcast::{Event, PROJECT_MEMBER_UPDATED};
use collab_access::storage::{InMemoryStore, MembershipStore, NoPlatformAdmins};
use collab_access::{
    AccessError, AssignOutcome, ErrorCategory, Involvement, Notifier, OrgId, OrgRole, ProjectId,
    ProjectRole, Result, UnassignOutcome, UserId, Workspace,
};
use serde_json::Value;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct RecordingNotifier {
    sent: Arc<Mutex<Vec<(Vec<UserId>, Event)>>>,
}

impl RecordingNotifier {
    fn take(&self) -> Vec<(Vec<UserId>, Event)> {
        std::mem::take(&mut *self.sent.lock().unwrap())
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, user_ids: &[UserId], event: &str, payload: &Value) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((user_ids.to_vec(), Event::new(event, payload.clone())));
        Ok(())
    }
}

const ORG_ADMIN: UserId = 1;
const PROJECT_ADMIN: UserId = 2;
const USER: UserId = 3;
const OTHER: UserId = 4;

struct Setup {
    store: InMemoryStore,
    notifier: RecordingNotifier,
    workspace: Workspace<InMemoryStore, NoPlatformAdmins, RecordingNotifier>,
    org: OrgId,
    project: ProjectId,
}

fn setup() -> Setup {
    let store = InMemoryStore::new();
    let org = store.create_organization("Acme");
    let project = store.create_project("Rocket", Some(org.id));
    store.insert_org_member(org.id, ORG_ADMIN, OrgRole::Admin);
    store.insert_project_member(project.id, PROJECT_ADMIN, ProjectRole::Admin);

    let notifier = RecordingNotifier::default();
    let workspace = Workspace::new(store.clone(), NoPlatformAdmins, notifier.clone());

    Setup {
        store,
        notifier,
        workspace,
        org: org.id,
        project: project.id,
    }
}

async fn role_of(s: &Setup, user_id: UserId) -> Involvement<ProjectRole> {
    s.workspace
        .projects()
        .get_member_role(s.project, user_id)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_self_application() {
    let s = setup();

    s.workspace
        .assign_project_member(s.project, USER, ProjectRole::Pending, USER)
        .await
        .unwrap();

    assert_eq!(role_of(&s, USER).await, Involvement::Member(ProjectRole::Pending));
}

#[tokio::test]
async fn test_org_admin_fast_track() {
    let s = setup();

    s.workspace
        .assign_project_member(s.project, ORG_ADMIN, ProjectRole::Pending, ORG_ADMIN)
        .await
        .unwrap();

    assert_eq!(role_of(&s, ORG_ADMIN).await, Involvement::Member(ProjectRole::Admin));
}

#[tokio::test]
async fn test_approval_requires_admin() {
    let s = setup();
    s.store.insert_project_member(s.project, USER, ProjectRole::Pending);
    s.store.insert_project_member(s.project, OTHER, ProjectRole::Dev);

    let err = s
        .workspace
        .assign_project_member(s.project, USER, ProjectRole::Dev, OTHER)
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Authorization);
    assert_eq!(role_of(&s, USER).await, Involvement::Member(ProjectRole::Pending));

    s.workspace
        .assign_project_member(s.project, USER, ProjectRole::Dev, PROJECT_ADMIN)
        .await
        .unwrap();
    assert_eq!(role_of(&s, USER).await, Involvement::Member(ProjectRole::Dev));
}

#[tokio::test]
async fn test_no_self_promotion() {
    let s = setup();
    s.store.insert_project_member(s.project, USER, ProjectRole::Pending);

    let result = s
        .workspace
        .assign_project_member(s.project, USER, ProjectRole::Dev, USER)
        .await;

    assert!(matches!(result, Err(AccessError::Forbidden(_))));
    assert_eq!(role_of(&s, USER).await, Involvement::Member(ProjectRole::Pending));
}

#[tokio::test]
async fn test_failed_application_leaves_user_uninvolved() {
    let s = setup();

    let result = s
        .workspace
        .assign_project_member(s.project, USER, ProjectRole::Admin, USER)
        .await;

    assert!(matches!(result, Err(AccessError::Forbidden(_))));
    assert_eq!(role_of(&s, USER).await, Involvement::NotInvolved);
    assert!(s.notifier.take().is_empty());
}

#[tokio::test]
async fn test_idempotent_assign_notifies_once() {
    let s = setup();

    let first = s
        .workspace
        .assign_project_member(s.project, USER, ProjectRole::Invited, PROJECT_ADMIN)
        .await
        .unwrap();
    let second = s
        .workspace
        .assign_project_member(s.project, USER, ProjectRole::Invited, PROJECT_ADMIN)
        .await
        .unwrap();

    assert!(first.is_changed());
    assert_eq!(second, AssignOutcome::Unchanged(ProjectRole::Invited));
    assert_eq!(role_of(&s, USER).await, Involvement::Member(ProjectRole::Invited));

    let sent = s.notifier.take();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].1.name, PROJECT_MEMBER_UPDATED);
    assert_eq!(sent[0].0, vec![PROJECT_ADMIN, USER]);
}

#[tokio::test]
async fn test_unassign_is_idempotent() {
    let s = setup();

    let outcome = s
        .workspace
        .unassign_project_member(s.project, USER, USER)
        .await
        .unwrap();

    assert_eq!(outcome, UnassignOutcome::NotInvolved);
    assert_eq!(role_of(&s, USER).await, Involvement::NotInvolved);
    assert!(s.notifier.take().is_empty());
}

#[tokio::test]
async fn test_removed_participant_is_notified() {
    let s = setup();
    s.store.insert_project_member(s.project, USER, ProjectRole::Dev);

    s.workspace
        .unassign_project_member(s.project, USER, PROJECT_ADMIN)
        .await
        .unwrap();

    let sent = s.notifier.take();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, vec![PROJECT_ADMIN, USER]);
    assert_eq!(sent[0].1.payload["previous"], "dev");
    assert!(sent[0].1.payload["role"].is_null());
}

#[tokio::test]
async fn test_corrupt_role_is_integrity_error() {
    let s = setup();
    s.store.insert_raw_project_role(s.project, USER, "owner");

    let err = s
        .workspace
        .assign_project_member(s.project, USER, ProjectRole::Dev, PROJECT_ADMIN)
        .await
        .unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Integrity);
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_org_invite_and_accept() {
    let s = setup();
    let org_id = s.org;

    s.workspace
        .assign_org_member(org_id, USER, OrgRole::Invited, ORG_ADMIN)
        .await
        .unwrap();
    s.workspace
        .assign_org_member(org_id, USER, OrgRole::Admin, USER)
        .await
        .unwrap();

    let members = MembershipStore::<OrgRole>::list_members(&s.store, org_id)
        .await
        .unwrap();
    assert!(members.iter().all(|m| m.role == OrgRole::Admin));
    assert_eq!(members.len(), 2);

    // An org admin of the owning org now fast-tracks into the project.
    s.workspace
        .assign_project_member(s.project, USER, ProjectRole::Pending, USER)
        .await
        .unwrap();
    assert_eq!(role_of(&s, USER).await, Involvement::Member(ProjectRole::Admin));
}
