mod common;

use uuid::Uuid;

use common::{alice, bob, carol, day, engine_with_db, scope, shared_group};
use engine::{Category, EngineError, GoalPatch, GoalStats, Money, NewGoal, Scope};

fn money(value: &str) -> Money {
    value.parse().unwrap()
}

#[tokio::test]
async fn personal_goals_stay_private() {
    let (engine, _db) = engine_with_db().await;
    let group = shared_group(&engine, &[bob()]).await;

    let goal = engine
        .create_goal(
            &Scope::user("alice"),
            NewGoal::new("  Bike ", money("600.00")).category(Category::Transport),
        )
        .await
        .unwrap();
    assert_eq!(goal.name, "Bike");
    assert_eq!(goal.group_id, None);

    let mine = engine.list_goals(&scope(&alice(), &group)).await.unwrap();
    assert_eq!(mine, [goal.clone()]);
    assert!(engine.list_goals(&scope(&bob(), &group)).await.unwrap().is_empty());

    let err = engine
        .add_goal_progress(&Scope::user("bob"), goal.id, money("1.00"))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("goal not exists".to_string()));
}

#[tokio::test]
async fn shared_goals_are_visible_to_the_group() {
    let (engine, _db) = engine_with_db().await;
    let group = shared_group(&engine, &[bob()]).await;

    let goal = engine
        .create_goal(
            &scope(&alice(), &group),
            NewGoal::new("Holiday", money("2000.00"))
                .target_date(day(30))
                .shared(true),
        )
        .await
        .unwrap();
    assert_eq!(goal.group_id, Some(group.id));

    let seen = engine.list_goals(&scope(&bob(), &group)).await.unwrap();
    assert_eq!(seen, [goal.clone()]);

    let updated = engine
        .add_goal_progress(&Scope::user("bob"), goal.id, money("250.00"))
        .await
        .unwrap();
    assert_eq!(updated.current_amount, money("250.00"));
    assert_eq!(updated.remaining(), money("1750.00"));

    // Carol is not part of the group.
    engine.ensure_group(&carol()).await.unwrap();
    let err = engine
        .delete_goal(&Scope::user("carol"), goal.id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn shared_goal_needs_a_group() {
    let (engine, _db) = engine_with_db().await;
    engine.ensure_group(&alice()).await.unwrap();

    let err = engine
        .create_goal(
            &Scope::user("alice"),
            NewGoal::new("Holiday", money("2000.00")).shared(true),
        )
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::NoGroup);

    let err = engine
        .create_goal(&Scope::default(), NewGoal::new("Holiday", money("2000.00")))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::NotAuthenticated);
}

#[tokio::test]
async fn progress_and_stats() {
    let (engine, _db) = engine_with_db().await;
    engine.ensure_group(&alice()).await.unwrap();
    let me = Scope::user("alice");

    let laptop = engine
        .create_goal(
            &me,
            NewGoal::new("Laptop", money("1200.00"))
                .category(Category::Education)
                .target_date(day(20)),
        )
        .await
        .unwrap();
    let fund = engine
        .create_goal(
            &me,
            NewGoal::new("Emergency fund", money("500.00")).current_amount(money("100.00")),
        )
        .await
        .unwrap();
    let course = engine
        .create_goal(&me, NewGoal::new("Course", money("80.00")).target_date(day(5)))
        .await
        .unwrap();

    let err = engine
        .add_goal_progress(&me, laptop.id, Money::ZERO)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));
    engine
        .add_goal_progress(&me, course.id, money("80.00"))
        .await
        .unwrap();

    let goals = engine.list_goals(&me).await.unwrap();
    let order: Vec<Uuid> = goals.iter().map(|g| g.id).collect();
    assert_eq!(order, [course.id, laptop.id, fund.id]);

    let stats = GoalStats::from_goals(&goals, day(25));
    assert_eq!(stats.total, 3);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.overdue, 1);
    assert_eq!(stats.saved_sum, money("180.00"));
    assert_eq!(stats.target_sum, money("1780.00"));
    assert_eq!(stats.completion_rate, 33);

    engine.delete_goal(&me, fund.id).await.unwrap();
    assert_eq!(engine.list_goals(&me).await.unwrap().len(), 2);
    let err = engine.delete_goal(&me, fund.id).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn invalid_goals_are_rejected() {
    let (engine, db) = engine_with_db().await;
    engine.ensure_group(&alice()).await.unwrap();
    let me = Scope::user("alice");

    let err = engine
        .create_goal(&me, NewGoal::new("Nothing", Money::ZERO))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let err = engine
        .create_goal(&me, NewGoal::new(" ", money("10.00")))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));

    assert_eq!(common::count_rows(&db, "goals").await, 0);
}

#[tokio::test]
async fn goals_can_be_edited_and_completed() {
    let (engine, _db) = engine_with_db().await;
    let group = shared_group(&engine, &[bob()]).await;
    let goal = engine
        .create_goal(
            &scope(&alice(), &group),
            NewGoal::new("Sofa", money("800.00"))
                .current_amount(money("100.00"))
                .shared(true),
        )
        .await
        .unwrap();

    let edited = engine
        .update_goal(
            &Scope::user("bob"),
            goal.id,
            GoalPatch::default()
                .name("Corner sofa")
                .category(Category::Housing)
                .target_amount(money("1200.00"))
                .target_date(day(28)),
        )
        .await
        .unwrap();
    assert_eq!(edited.name, "Corner sofa");
    assert_eq!(edited.current_amount, money("100.00"));

    let err = engine
        .update_goal(
            &Scope::user("alice"),
            goal.id,
            GoalPatch::default().name("Chair").target_amount(Money::ZERO),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let done = engine.complete_goal(&Scope::user("alice"), goal.id).await.unwrap();
    assert!(done.is_completed());
    assert_eq!(done.current_amount, money("1200.00"));

    let stored = engine.list_goals(&scope(&alice(), &group)).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].name, "Corner sofa");
    assert_eq!(stored[0].category, Category::Housing);
    assert_eq!(stored[0].target_date, Some(day(28)));
    assert_eq!(stored[0].current_amount, money("1200.00"));

    let err = engine
        .complete_goal(&Scope::user("carol"), goal.id)
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("goal not exists".to_string()));
}
