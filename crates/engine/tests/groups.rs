mod common;

use common::{
    ScriptedCodes, alice, bob, carol, connect, count_rows, engine_from, engine_with_db, scope,
    shared_group,
};
use engine::{DEFAULT_GROUP_NAME, Engine, EngineError, ErrorKind, Identity, MemberRole, Scope};

#[tokio::test]
async fn first_session_provisions_a_personal_group_once() {
    let (engine, db) = engine_with_db().await;

    let group = engine.ensure_group(&alice()).await.unwrap();
    assert_eq!(group.name, DEFAULT_GROUP_NAME);
    assert_eq!(group.created_by, "alice");
    assert_eq!(group.members.len(), 1);
    assert_eq!(group.members[0].role, MemberRole::Admin);
    assert_eq!(group.members[0].display_name, "Alice");
    assert!(group.invite_code.is_none());

    let again = engine.ensure_group(&alice()).await.unwrap();
    assert_eq!(again.id, group.id);
    assert_eq!(count_rows(&db, "groups").await, 1);
}

#[tokio::test]
async fn profile_changes_show_up_in_the_roster() {
    let (engine, _db) = engine_with_db().await;
    engine.ensure_group(&alice()).await.unwrap();

    let renamed = Identity::new("alice", "Alice Liddell");
    let group = engine.ensure_group(&renamed).await.unwrap();
    assert_eq!(group.members[0].display_name, "Alice Liddell");
    assert_eq!(group.members[0].email, None);
}

#[tokio::test]
async fn blank_identity_is_rejected() {
    let (engine, _db) = engine_with_db().await;
    let err = engine
        .ensure_group(&Identity::new("  ", "Nobody"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn joining_moves_the_membership() {
    let (engine, db) = engine_with_db().await;
    let alice_group = engine.ensure_group(&alice()).await.unwrap();
    let bob_group = engine.ensure_group(&bob()).await.unwrap();
    let code = engine
        .generate_invite_code(&scope(&alice(), &alice_group))
        .await
        .unwrap();

    let joined = engine
        .join_group(&bob(), &format!("  {}  ", code.as_str().to_lowercase()))
        .await
        .unwrap();
    assert_eq!(joined.id, alice_group.id);
    let ids: Vec<&str> = joined.member_ids().collect();
    assert_eq!(ids, ["alice", "bob"]);
    assert_eq!(joined.member("bob").unwrap().role, MemberRole::Member);

    // Bob is in exactly one group now; his old group still exists.
    let current = engine.current_group("bob").await.unwrap().unwrap();
    assert_eq!(current.id, alice_group.id);
    let err = engine.group(&scope(&bob(), &bob_group)).await.unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("group not exists".to_string()));
    assert_eq!(count_rows(&db, "groups").await, 2);
    assert_eq!(count_rows(&db, "group_members").await, 2);
}

#[tokio::test]
async fn join_preconditions() {
    let (engine, _db) = engine_with_db().await;
    let group = shared_group(&engine, &[bob()]).await;
    let code = group.invite_code.clone().unwrap();

    let err = engine.join_group(&bob(), code.as_str()).await.unwrap_err();
    assert!(matches!(err, EngineError::AlreadyMember(_)));
    assert_eq!(err.kind(), ErrorKind::Membership);

    let err = engine.join_group(&carol(), "ZZZZ9999").await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidInviteCode(_)));

    let err = engine.join_group(&carol(), "nope").await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidInviteCode(_)));
}

#[tokio::test]
async fn admin_removes_member_but_not_the_other_way_round() {
    let (engine, _db) = engine_with_db().await;
    let group = shared_group(&engine, &[bob()]).await;

    let err = engine
        .remove_member(&scope(&bob(), &group), "alice")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PermissionDenied(_)));

    let err = engine
        .remove_member(&scope(&alice(), &group), "alice")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PermissionDenied(_)));

    let group = engine
        .remove_member(&scope(&alice(), &group), "bob")
        .await
        .unwrap();
    assert!(!group.is_member("bob"));
    assert_eq!(group.member_count(), 1);
    assert!(engine.current_group("bob").await.unwrap().is_none());

    let err = engine
        .remove_member(&scope(&alice(), &group), "bob")
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("member not exists".to_string()));
}

#[tokio::test]
async fn leaving_lands_in_a_fresh_personal_group() {
    let (engine, _db) = engine_with_db().await;
    let group = shared_group(&engine, &[bob()]).await;

    let fresh = engine.leave_group(&scope(&bob(), &group)).await.unwrap();
    assert_ne!(fresh.id, group.id);
    assert_eq!(fresh.name, DEFAULT_GROUP_NAME);
    assert!(fresh.is_admin("bob"));

    let old = engine.group(&scope(&alice(), &group)).await.unwrap();
    assert!(!old.is_member("bob"));
}

#[tokio::test]
async fn rename_is_admin_only() {
    let (engine, _db) = engine_with_db().await;
    let group = shared_group(&engine, &[bob()]).await;

    let err = engine
        .rename_group(&scope(&bob(), &group), "Flat 4B")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PermissionDenied(_)));

    let err = engine
        .rename_group(&scope(&alice(), &group), "   ")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));

    let renamed = engine
        .rename_group(&scope(&alice(), &group), "  Flat 4B ")
        .await
        .unwrap();
    assert_eq!(renamed.name, "Flat 4B");
    assert_eq!(renamed.invite_code, group.invite_code);
}

#[tokio::test]
async fn any_member_can_issue_a_code_and_old_codes_stop_working() {
    let (engine, _db) = engine_with_db().await;
    let group = shared_group(&engine, &[bob()]).await;
    let old = group.invite_code.clone().unwrap();

    let fresh = engine
        .generate_invite_code(&scope(&bob(), &group))
        .await
        .unwrap();
    assert_ne!(fresh, old);

    let err = engine.join_group(&carol(), old.as_str()).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidInviteCode(_)));
    let joined = engine.join_group(&carol(), fresh.as_str()).await.unwrap();
    assert_eq!(joined.member_count(), 3);
}

#[tokio::test]
async fn colliding_codes_are_retried() {
    let codes = ScriptedCodes::new(&["AAAA1111", "AAAA1111", "AAAA1111", "BBBB2222"]);
    let (engine, _db) = engine_from(Engine::builder().invite_codes(codes)).await;
    let alice_group = engine.ensure_group(&alice()).await.unwrap();
    let bob_group = engine.ensure_group(&bob()).await.unwrap();

    let first = engine
        .generate_invite_code(&scope(&alice(), &alice_group))
        .await
        .unwrap();
    assert_eq!(first.as_str(), "AAAA1111");

    let second = engine
        .generate_invite_code(&scope(&bob(), &bob_group))
        .await
        .unwrap();
    assert_eq!(second.as_str(), "BBBB2222");

    let alice_group = engine.group(&scope(&alice(), &alice_group)).await.unwrap();
    assert_eq!(alice_group.invite_code, Some(first));
}

#[tokio::test]
async fn retries_are_bounded() {
    let codes = ScriptedCodes::new(&["CCCC3333"]);
    let builder = Engine::builder().invite_codes(codes).invite_code_attempts(3);
    let (engine, _db) = engine_from(builder).await;
    let alice_group = engine.ensure_group(&alice()).await.unwrap();
    let bob_group = engine.ensure_group(&bob()).await.unwrap();
    engine
        .generate_invite_code(&scope(&alice(), &alice_group))
        .await
        .unwrap();

    let err = engine
        .generate_invite_code(&scope(&bob(), &bob_group))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::CodeGenerationExhausted { attempts: 3 });
    assert_eq!(err.kind(), ErrorKind::Exhausted);

    let bob_group = engine.group(&scope(&bob(), &bob_group)).await.unwrap();
    assert!(bob_group.invite_code.is_none());
}

#[tokio::test]
async fn random_codes_are_unique_across_groups() {
    let (engine, _db) = engine_with_db().await;
    let mut seen = std::collections::HashSet::new();
    for idx in 0..12 {
        let identity = Identity::new(format!("user-{idx}"), format!("User {idx}"));
        let group = engine.ensure_group(&identity).await.unwrap();
        let code = engine
            .generate_invite_code(&scope(&identity, &group))
            .await
            .unwrap();
        assert!(seen.insert(code));
    }
}

#[tokio::test]
async fn operations_need_actor_and_group() {
    let (engine, _db) = engine_with_db().await;
    let group = engine.ensure_group(&alice()).await.unwrap();

    let err = engine
        .generate_invite_code(&Scope::default())
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::NotAuthenticated);

    let err = engine
        .generate_invite_code(&Scope::user("alice"))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::NoGroup);

    let err = engine
        .generate_invite_code(&scope(&bob(), &group))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn zero_attempts_is_a_configuration_error() {
    let db = connect().await;
    let err = Engine::builder()
        .database(db)
        .invite_code_attempts(0)
        .build()
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));
}

#[tokio::test]
async fn stored_profiles_can_be_read_back() {
    let (engine, _db) = engine_with_db().await;
    engine.ensure_user(&alice()).await.unwrap();

    assert_eq!(engine.user("alice").await.unwrap(), alice());
    let err = engine.user("bob").await.unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("user not exists".to_string()));
}
