mod common;

use axum::http::StatusCode;
use common::{create_category, register, send, spawn_app, test_config};
use inventory_master::db::{ActivityFilter, NewActivity, Store};
use inventory_master::domain::{AccountId, ActivityAction, EntityType};
use sea_orm::ConnectionTrait;
use serde_json::json;

const DAY: i64 = 24 * 60 * 60;

fn seeded_entry(account: i32, name: &str) -> NewActivity {
    NewActivity {
        account: AccountId::new(account),
        action: ActivityAction::Created,
        entity_type: EntityType::Category,
        entity_id: None,
        entity_name: Some(name.to_string()),
        details: None,
    }
}

#[tokio::test]
async fn activity_logs_paginate_newest_first() {
    let (_state, app) = spawn_app().await;
    let (token, _) = register(&app, "Acme", "owner@acme.test").await;
    for name in ["One", "Two", "Three", "Four", "Five"] {
        create_category(&app, &token, name).await;
    }

    let (status, body) = send(
        &app,
        "GET",
        "/api/inventory/activity-logs?limit=2&offset=1",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let data = &body["data"];
    assert_eq!(data["total"], 5);
    assert_eq!(data["limit"], 2);
    assert_eq!(data["offset"], 1);
    let names: Vec<&str> = data["logs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["entityName"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Four", "Three"]);
}

#[tokio::test]
async fn activity_logs_filter_by_date_range() {
    let (state, app) = spawn_app().await;
    let (token, account_id) = register(&app, "Acme", "owner@acme.test").await;

    for (name, at) in [("Jan", 1_000), ("Feb", 2_000), ("Mar", 3_000)] {
        state
            .store()
            .add_activity_at(seeded_entry(account_id, name), at)
            .await
            .unwrap();
    }

    let (status, body) = send(
        &app,
        "GET",
        "/api/inventory/activity-logs?fromDate=2000&toDate=3000",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 2);
    assert_eq!(body["data"]["fromDate"], 2000);
    assert_eq!(body["data"]["logs"][0]["entityName"], "Mar");
    assert_eq!(body["data"]["logs"][1]["entityName"], "Feb");

    let (status, _) = send(
        &app,
        "GET",
        "/api/inventory/activity-logs?fromDate=3000&toDate=1000",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn activity_log_limit_is_bounded() {
    let (_state, app) = spawn_app().await;
    let (token, _) = register(&app, "Acme", "owner@acme.test").await;

    for limit in [0, 1001] {
        let (status, body) = send(
            &app,
            "GET",
            &format!("/api/inventory/activity-logs?limit={limit}"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }
}

#[tokio::test]
async fn renames_do_not_rewrite_history() {
    let (_state, app) = spawn_app().await;
    let (token, _) = register(&app, "Acme", "owner@acme.test").await;
    let id = create_category(&app, &token, "Bakery").await;

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/inventory/categories/{id}"),
        Some(&token),
        Some(json!({ "name": "Breads" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(
        &app,
        "GET",
        "/api/inventory/activity-logs",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(body["data"]["logs"][0]["entityName"], "Breads");
    assert_eq!(body["data"]["logs"][1]["entityName"], "Bakery");
    assert_eq!(body["data"]["logs"][1]["action"], "created");
}

#[tokio::test]
async fn purge_removes_only_entries_past_the_horizon() {
    let (state, app) = spawn_app().await;
    let (token, account_id) = register(&app, "Acme", "owner@acme.test").await;
    create_category(&app, &token, "Fresh").await;

    let now = chrono::Utc::now().timestamp();
    state
        .store()
        .add_activity_at(seeded_entry(account_id, "Ancient"), now - 200 * DAY)
        .await
        .unwrap();
    state
        .store()
        .add_activity_at(seeded_entry(account_id, "Recent"), now - 10 * DAY)
        .await
        .unwrap();

    let audit = state.audit_service();
    assert_eq!(audit.purge_older_than(180 * DAY).await.unwrap(), 1);
    assert_eq!(audit.purge_older_than(180 * DAY).await.unwrap(), 0);

    let (logs, total) = state
        .store()
        .get_activity_page(AccountId::new(account_id), ActivityFilter::default(), 50, 0)
        .await
        .unwrap();
    assert_eq!(total, 2);
    assert!(logs.iter().all(|l| l.entity_name.as_deref() != Some("Ancient")));
}

#[tokio::test]
async fn purge_command_uses_day_override() {
    let config = test_config();
    let store = Store::new(&config.general.database_path).await.unwrap();

    let now = chrono::Utc::now().timestamp();
    let account = store
        .account_repo()
        .create("Acme", "owner@acme.test", "not-a-real-hash".to_string())
        .await
        .unwrap();
    store
        .add_activity_at(seeded_entry(account.id, "Week old"), now - 7 * DAY)
        .await
        .unwrap();
    store
        .add_activity_at(seeded_entry(account.id, "Today"), now)
        .await
        .unwrap();

    inventory_master::cli::cmd_purge_logs(&config, Some(3))
        .await
        .unwrap();

    let (logs, total) = store
        .get_activity_page(AccountId::new(account.id), ActivityFilter::default(), 50, 0)
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(logs[0].entity_name.as_deref(), Some("Today"));

    assert!(
        inventory_master::cli::cmd_purge_logs(&config, Some(0))
            .await
            .is_err()
    );
}

#[tokio::test]
async fn audit_write_failure_does_not_block_the_mutation() {
    let (state, app) = spawn_app().await;
    let (token, _) = register(&app, "Acme", "owner@acme.test").await;

    state
        .store()
        .conn
        .execute_unprepared("DROP TABLE activity_logs")
        .await
        .unwrap();

    create_category(&app, &token, "Still Works").await;

    let (status, body) = send(&app, "GET", "/api/inventory", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["categories"][0]["name"], "Still Works");
}

#[tokio::test]
async fn health_endpoints_are_public() {
    let (_state, app) = spawn_app().await;

    let (status, body) = send(&app, "GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");

    let (status, body) = send(&app, "GET", "/api/health/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["ready"], true);
}
