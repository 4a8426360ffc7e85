//! Integration tests for the HTTP remote repository
//!
//! **Coverage:**
//! - CRUD round trips against a WireMock server
//! - Versioned writes: applied, 409 stale, 412 stale
//! - 404 handling per operation
//! - Status classification: 5xx as transport, 422 as validation
//! - Health probe

use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::json;
use tether_core::preservation::ports::{HealthProbe, RemoteRepository};
use tether_domain::{Reminder, ReminderInput, RemoteConfig, TetherError};
use tether_infra::sync::HttpRemoteRepository;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn reminder(id: &str, version: Option<u64>) -> Reminder {
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
    let input = ReminderInput::new("Call the bank", NaiveDate::from_ymd_opt(2026, 4, 2).unwrap())
        .with_id(id);
    Reminder { version, ..Reminder::from_input(input, now) }
}

fn repository(server: &MockServer) -> HttpRemoteRepository {
    let config = RemoteConfig {
        base_url: format!("{}/api", server.uri()),
        api_token: Some("token-1".into()),
        ..RemoteConfig::default()
    };
    HttpRemoteRepository::from_config(&config).expect("repository")
}

#[tokio::test]
async fn create_posts_and_returns_the_stored_copy() {
    let server = MockServer::start().await;
    let stored = reminder("r1", Some(1));
    Mock::given(method("POST"))
        .and(path("/api/reminders"))
        .and(header("authorization", "Bearer token-1"))
        .and(body_partial_json(json!({ "id": "r1", "title": "Call the bank" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(&stored))
        .expect(1)
        .mount(&server)
        .await;

    let created = repository(&server).create(&reminder("r1", None)).await.unwrap();
    assert_eq!(created.version, Some(1));
}

#[tokio::test]
async fn versioned_update_sends_if_match_and_reads_new_version() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/reminders/r1"))
        .and(header("if-match", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reminder("r1", Some(2))))
        .expect(1)
        .mount(&server)
        .await;

    let write = repository(&server).update_versioned(&reminder("r1", Some(1)), 1).await.unwrap();
    assert!(write.updated);
    assert_eq!(write.new_version, Some(2));
}

#[tokio::test]
async fn versioned_update_conflicts_are_stale_writes() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/reminders/r1"))
        .and(header("if-match", "1"))
        .respond_with(ResponseTemplate::new(409))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/reminders/r2"))
        .respond_with(ResponseTemplate::new(412))
        .mount(&server)
        .await;

    let repo = repository(&server);
    assert!(!repo.update_versioned(&reminder("r1", Some(1)), 1).await.unwrap().updated);
    assert!(!repo.update_versioned(&reminder("r2", Some(1)), 1).await.unwrap().updated);
}

#[tokio::test]
async fn missing_rows_map_to_none_and_false() {
    let server = MockServer::start().await;
    Mock::given(path("/api/reminders/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let repo = repository(&server);
    assert_eq!(repo.get("gone").await.unwrap(), None);
    assert_eq!(repo.update(&reminder("gone", Some(3))).await.unwrap(), None);
    assert!(!repo.delete("gone").await.unwrap());
}

#[tokio::test]
async fn delete_of_an_existing_row_is_true() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/reminders/r1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    assert!(repository(&server).delete("r1").await.unwrap());
}

#[tokio::test]
async fn delta_query_passes_the_timestamp() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/reminders"))
        .and(query_param("updated_since", "2026-03-01T09:00:00.000Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![reminder("r1", Some(4))]))
        .expect(1)
        .mount(&server)
        .await;

    let since = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
    let changed = repository(&server).query_updated_since(since).await.unwrap();
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0].version, Some(4));
}

#[tokio::test]
async fn orphan_tasks_are_listed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tasks/orphans"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{ "task_id": "t1", "reminder_id": "deleted" }])),
        )
        .mount(&server)
        .await;

    let orphans = repository(&server).find_orphan_tasks().await.unwrap();
    assert_eq!(orphans.len(), 1);
    assert_eq!(orphans[0].reminder_id, "deleted");
}

#[tokio::test]
async fn server_errors_are_transport_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/reminders"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = repository(&server).get_all().await.unwrap_err();
    assert!(err.is_transport());
}

#[tokio::test]
async fn rejected_payloads_are_validation_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/reminders"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "errors": [{ "field": "due_date", "message": "out of range" }]
        })))
        .mount(&server)
        .await;

    let err = repository(&server).create(&reminder("r1", None)).await.unwrap_err();
    match err {
        TetherError::Validation(errors) => assert_eq!(errors.field_errors("due_date").len(), 1),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn health_probe_follows_the_health_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    let repo = repository(&server);
    repo.health_check().await.unwrap();
    assert!(!repo.remote_status().await.connected);
    assert!(repo.health_check().await.unwrap_err().is_transport());
}
