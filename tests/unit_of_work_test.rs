//! Integration tests for the unit of work and its repositories.

mod common;

use sea_orm::TransactionTrait;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use common::test_database;
use factory_api::domain::{NewProduct, Product, User};
use factory_api::errors::AppError;
use factory_api::infra::{Persistence, ProductRecord, UnitState, UserRecord};

async fn persistence() -> Persistence {
    Persistence::new(test_database().await.get_connection())
}

fn user(user_name: &str) -> UserRecord {
    User::new(user_name.to_string(), None, "hash".to_string()).into()
}

fn product(name: &str, owner: Uuid) -> ProductRecord {
    Product::new(
        NewProduct {
            name: name.to_string(),
            description: None,
            quantity: 4,
            unit_price: 1.25,
        },
        owner,
    )
    .into()
}

fn assert_invalid_state<T>(result: Result<T, AppError>) {
    match result {
        Err(AppError::InvalidState(_)) => {}
        Err(other) => panic!("expected InvalidState, got {:?}", other),
        Ok(_) => panic!("expected InvalidState, got Ok"),
    }
}

#[tokio::test]
async fn test_staged_changes_are_visible_inside_the_unit() {
    let persistence = persistence().await;
    let unit = persistence.begin();
    let users = unit.repository::<UserRecord>().unwrap();

    let alice = user("alice");
    users.add(alice.clone()).unwrap();

    assert_eq!(users.get_by_id(alice.id).await.unwrap(), Some(alice.clone()));
    assert_eq!(users.get_all().await.unwrap(), vec![alice.clone()]);
    assert_eq!(unit.pending_changes(), 1);

    let outsider = persistence.begin();
    let other = outsider.repository::<UserRecord>().unwrap();
    assert!(other.get_by_id(alice.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_repository_is_one_instance_per_type() {
    let persistence = persistence().await;
    let unit = persistence.begin();

    let first = unit.repository::<ProductRecord>().unwrap();
    let second = unit.repository::<ProductRecord>().unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let owner = Uuid::new_v4();
    let bolt = product("bolt", owner);
    first.add(bolt.clone()).unwrap();
    assert_eq!(second.get_by_id(bolt.id).await.unwrap(), Some(bolt));
}

#[tokio::test]
async fn test_commit_publishes_changes_to_later_units() {
    let persistence = persistence().await;
    let owner = user("owner");
    let mut nut = product("nut", owner.id);

    let unit = persistence.begin();
    unit.repository::<UserRecord>().unwrap().add(owner.clone()).unwrap();
    unit.repository::<ProductRecord>().unwrap().add(nut.clone()).unwrap();
    unit.commit().await.unwrap();
    assert_eq!(unit.state(), UnitState::Committed);
    assert_eq!(unit.pending_changes(), 0);

    let unit = persistence.begin();
    let products = unit.repository::<ProductRecord>().unwrap();
    let stored = products.get_by_id(nut.id).await.unwrap().unwrap();
    assert_eq!(stored.name, "nut");
    assert_eq!(stored.created_by, owner.id);

    nut.quantity = 40;
    products.update(nut.clone()).await.unwrap();
    unit.commit().await.unwrap();

    let unit = persistence.begin();
    let products = unit.repository::<ProductRecord>().unwrap();
    assert_eq!(products.get_by_id(nut.id).await.unwrap().unwrap().quantity, 40);

    products.remove(nut.id).await.unwrap();
    assert!(products.get_by_id(nut.id).await.unwrap().is_none());
    unit.commit().await.unwrap();

    let unit = persistence.begin();
    assert!(unit
        .repository::<ProductRecord>()
        .unwrap()
        .get_all()
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_failed_commit_applies_nothing_across_types() {
    let persistence = persistence().await;

    let taken = persistence.begin();
    taken.repository::<UserRecord>().unwrap().add(user("taken")).unwrap();
    taken.commit().await.unwrap();

    let unit = persistence.begin();
    let gear = product("gear", Uuid::new_v4());
    unit.repository::<ProductRecord>().unwrap().add(gear.clone()).unwrap();
    unit.repository::<UserRecord>().unwrap().add(user("taken")).unwrap();

    let result = unit.commit().await;
    assert!(matches!(result, Err(AppError::Persistence(_))));
    assert_eq!(unit.state(), UnitState::RolledBack);

    let check = persistence.begin();
    assert!(check
        .repository::<ProductRecord>()
        .unwrap()
        .get_by_id(gear.id)
        .await
        .unwrap()
        .is_none());
    assert_eq!(
        check.repository::<UserRecord>().unwrap().get_all().await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn test_rollback_discards_staged_changes() {
    let persistence = persistence().await;
    let unit = persistence.begin();
    let ghost = user("ghost");
    unit.repository::<UserRecord>().unwrap().add(ghost.clone()).unwrap();

    unit.rollback().unwrap();
    assert_eq!(unit.state(), UnitState::RolledBack);
    assert_eq!(unit.pending_changes(), 0);
    assert_invalid_state(unit.rollback());
    assert_invalid_state(unit.commit().await);

    let check = persistence.begin();
    let users = check.repository::<UserRecord>().unwrap();
    assert!(users.get_by_id(ghost.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_finished_units_refuse_repository_access() {
    let persistence = persistence().await;

    let committed = persistence.begin();
    let users = committed.repository::<UserRecord>().unwrap();
    committed.commit().await.unwrap();
    assert_invalid_state(committed.repository::<UserRecord>());
    assert_invalid_state(committed.commit().await);
    assert_invalid_state(users.add(user("late")));
    assert_invalid_state(users.get_all().await);

    let dropped = persistence.begin();
    let products = dropped.repository::<ProductRecord>().unwrap();
    let staged = product("orphan", Uuid::new_v4());
    products.add(staged.clone()).unwrap();
    drop(dropped);

    assert_invalid_state(products.get_by_id(staged.id).await);
    assert_invalid_state(products.get_all().await);
    assert_invalid_state(products.add(product("late", Uuid::new_v4())));
    assert_invalid_state(products.update(staged.clone()).await);
    assert_invalid_state(products.remove(staged.id).await);

    let check = persistence.begin();
    assert!(check
        .repository::<ProductRecord>()
        .unwrap()
        .get_all()
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_update_or_remove_of_missing_record_is_not_found() {
    let persistence = persistence().await;
    let unit = persistence.begin();
    let products = unit.repository::<ProductRecord>().unwrap();

    let missing = product("missing", Uuid::new_v4());
    assert!(matches!(products.update(missing.clone()).await, Err(AppError::NotFound)));
    assert!(matches!(products.remove(missing.id).await, Err(AppError::NotFound)));
    assert_eq!(unit.pending_changes(), 0);

    unit.commit().await.unwrap();
    assert_eq!(unit.state(), UnitState::Committed);
}

#[tokio::test]
async fn test_cancelled_commit_ends_rolled_back() {
    let database = test_database().await;
    let persistence = Persistence::new(database.get_connection());

    let unit = persistence.begin();
    let products = unit.repository::<ProductRecord>().unwrap();
    let staged = product("pending", Uuid::new_v4());
    products.add(staged.clone()).unwrap();

    // The in-memory pool has a single connection; holding it keeps the
    // commit waiting inside `begin` until the timeout drops it.
    let blocker = database.get_connection().begin().await.unwrap();
    let cancelled = tokio::time::timeout(Duration::from_millis(50), unit.commit()).await;
    assert!(cancelled.is_err());
    drop(blocker);

    assert_eq!(unit.state(), UnitState::RolledBack);
    assert_eq!(unit.pending_changes(), 0);
    assert_invalid_state(products.get_by_id(staged.id).await);
    assert_invalid_state(unit.commit().await);
    assert_invalid_state(unit.rollback());

    let check = persistence.begin();
    assert!(check
        .repository::<ProductRecord>()
        .unwrap()
        .get_by_id(staged.id)
        .await
        .unwrap()
        .is_none());
}
