//! Chatroom access lists and broadcast audiences.

use collab_access::broadcast::{
    CHATROOM_MESSAGE, CHATROOM_UPDATED, ChatroomUpdate, PROJECT_MEMBER_UPDATED, UserHub,
};
use collab_access::storage::{InMemoryStore, StaticPlatformAdmins};
use collab_access::{AccessError, OrgRole, ProjectRole, UserId, Workspace};

type HubWorkspace = Workspace<InMemoryStore, StaticPlatformAdmins, UserHub>;

fn workspace(store: &InMemoryStore, hub: &UserHub) -> HubWorkspace {
    Workspace::new(store.clone(), StaticPlatformAdmins::default(), hub.clone())
}

fn drain(sub: &mut collab_access::broadcast::Subscription) -> Vec<String> {
    let mut names = Vec::new();
    while let Some(event) = sub.try_recv() {
        names.push(event.name);
    }
    names
}

#[tokio::test]
async fn test_project_room_visibility_follows_roles() {
    let store = InMemoryStore::new();
    let hub = UserHub::new();
    let ws = workspace(&store, &hub);

    let org = store.create_organization("Acme");
    let project = store.create_project("Rocket", Some(org.id));
    let admin: UserId = 1;
    store.insert_project_member(project.id, admin, ProjectRole::Admin);

    let room = ws
        .create_chatroom(admin, "dev", Some(project.id), vec![])
        .await
        .unwrap();

    // Invited and pending users are excluded.
    ws.assign_project_member(project.id, 2, ProjectRole::Invited, admin)
        .await
        .unwrap();
    ws.assign_project_member(project.id, 3, ProjectRole::Pending, 3)
        .await
        .unwrap();

    let access = ws.access();
    assert_eq!(access.get_chatroom_members(room.id).await.unwrap(), vec![admin]);
    assert!(!access.is_allowed(room.id, 2).await.unwrap());
    assert!(!access.is_allowed(room.id, 3).await.unwrap());
    assert!(matches!(
        ws.post_message(room.id, 3, "let me in").await,
        Err(AccessError::Forbidden(_))
    ));

    // Once promoted to dev they are included.
    ws.assign_project_member(project.id, 2, ProjectRole::Dev, 2)
        .await
        .unwrap();
    ws.assign_project_member(project.id, 3, ProjectRole::Dev, admin)
        .await
        .unwrap();

    assert_eq!(
        access.get_chatroom_members(room.id).await.unwrap(),
        vec![admin, 2, 3]
    );
    let detail = ws.chatroom_detail(room.id, 3).await.unwrap();
    assert_eq!(detail.members, vec![admin, 2, 3]);
}

#[tokio::test]
async fn test_rename_and_remove_notifies_union_once() {
    let store = InMemoryStore::new();
    let hub = UserHub::new();
    let ws = workspace(&store, &hub);

    let room = ws
        .create_chatroom(1, "lounge", None, vec![2, 3])
        .await
        .unwrap();

    let mut subs: Vec<_> = [1, 2, 3, 4].into_iter().map(|u| hub.subscribe(u)).collect();

    let update = ChatroomUpdate {
        name: Some("quiet lounge".to_string()),
        members: Some(vec![1, 2]),
    };
    let updated = ws.update_chatroom(room.id, 1, update).await.unwrap();
    assert_eq!(updated.name, "quiet lounge");

    // Removed user 3 and the remaining members each get exactly one event.
    for sub in subs.iter_mut().take(3) {
        assert_eq!(drain(sub), vec![CHATROOM_UPDATED.to_string()]);
    }
    assert!(drain(&mut subs[3]).is_empty());

    assert!(!ws.access().is_allowed(room.id, 3).await.unwrap());
    assert!(matches!(
        ws.list_messages(room.id, 3).await,
        Err(AccessError::Forbidden(_))
    ));
}

#[tokio::test]
async fn test_messages_reach_room_members_only() {
    let store = InMemoryStore::new();
    let hub = UserHub::new();
    let ws = workspace(&store, &hub);

    let room = ws.create_chatroom(1, "pair", None, vec![2]).await.unwrap();
    let mut member = hub.subscribe(2);
    let mut outsider = hub.subscribe(5);

    let message = ws.post_message(room.id, 1, "  hello  ").await.unwrap();
    assert_eq!(message.body, "hello");

    let event = member.recv().await.unwrap();
    assert_eq!(event.name, CHATROOM_MESSAGE);
    assert_eq!(event.payload["body"], "hello");
    assert!(outsider.try_recv().is_none());

    let messages = ws.list_messages(room.id, 2).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].sender_id, 1);
}

#[tokio::test]
async fn test_promotion_notifies_project_participants() {
    let store = InMemoryStore::new();
    let hub = UserHub::new();
    let ws = workspace(&store, &hub);

    let org = store.create_organization("Acme");
    let project = store.create_project("Rocket", Some(org.id));
    store.insert_org_member(org.id, 9, OrgRole::Admin);
    store.insert_project_member(project.id, 1, ProjectRole::Admin);
    store.insert_project_member(project.id, 2, ProjectRole::Dev);
    store.insert_project_member(project.id, 3, ProjectRole::Pending);

    let mut dev = hub.subscribe(2);
    let mut applicant = hub.subscribe(3);
    let mut org_admin = hub.subscribe(9);

    ws.assign_project_member(project.id, 3, ProjectRole::Dev, 1)
        .await
        .unwrap();

    assert_eq!(drain(&mut dev), vec![PROJECT_MEMBER_UPDATED.to_string()]);
    assert_eq!(drain(&mut applicant), vec![PROJECT_MEMBER_UPDATED.to_string()]);
    assert!(drain(&mut org_admin).is_empty());
}

#[tokio::test]
async fn test_platform_admin_acts_as_project_admin() {
    let store = InMemoryStore::new();
    let hub = UserHub::new();
    let ws = Workspace::new(store.clone(), StaticPlatformAdmins::new([99]), hub.clone());

    let org = store.create_organization("Acme");
    let project = store.create_project("Rocket", Some(org.id));
    store.insert_project_member(project.id, 1, ProjectRole::Admin);

    // A platform admin counts as project admin and may invite.
    assert!(ws.projects().is_admin(project.id, 99).await.unwrap());
    ws.assign_project_member(project.id, 4, ProjectRole::Invited, 99)
        .await
        .unwrap();

    // Without a stored row they are not part of any project room.
    assert!(matches!(
        ws.create_chatroom(99, "ops", Some(project.id), vec![]).await,
        Err(AccessError::Forbidden(_))
    ));

    let room = ws
        .create_chatroom(1, "ops", Some(project.id), vec![])
        .await
        .unwrap();
    assert!(!ws.access().is_allowed(room.id, 99).await.unwrap());
    assert!(matches!(
        ws.post_message(room.id, 99, "hello").await,
        Err(AccessError::Forbidden(_))
    ));
}

#[tokio::test]
async fn test_room_creator_can_post() {
    let store = InMemoryStore::new();
    let hub = UserHub::new();
    let ws = Workspace::new(store.clone(), StaticPlatformAdmins::new([99]), hub.clone());

    let org = store.create_organization("Acme");
    let project = store.create_project("Rocket", Some(org.id));
    store.insert_project_member(project.id, 99, ProjectRole::Dev);

    let room = ws
        .create_chatroom(99, "ops", Some(project.id), vec![])
        .await
        .unwrap();

    let message = ws.post_message(room.id, 99, "deploying").await.unwrap();
    assert_eq!(message.sender_id, 99);
    let detail = ws.chatroom_detail(room.id, 99).await.unwrap();
    assert_eq!(detail.members, vec![99]);
}
