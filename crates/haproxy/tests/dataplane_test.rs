//! Data Plane client tests against a mock API.

use mapsync_haproxy::{DataplaneClient, DataplaneConfig};
use mapsync_reconciler::{ActualStateStore, Entry, StoreError};
use serde_json::json;
use wiremock::matchers::{basic_auth, body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

const ENTRIES: &str = "/v2/services/haproxy/runtime/maps_entries";

fn client(server: &MockServer) -> Result<DataplaneClient, mapsync_haproxy::Error> {
    let config = DataplaneConfig::with_host(server.address().to_string()).credentials("ops", "s3cret");
    DataplaneClient::with_config(config)
}

#[tokio::test]
async fn test_list_entries() -> TestResult {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ENTRIES))
        .and(query_param("map", "hosts"))
        .and(basic_auth("ops", "s3cret"))
        .and(header("accept", "application/json; charset=utf-8"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "0x55d1", "key": "a.example.com", "value": "backend_a"},
            {"id": "0x55d2", "key": "b.example.com", "value": "backend_b"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let entries = client(&server)?.list("hosts").await?;

    assert_eq!(entries.len(), 2);
    let first = entries.get("a.example.com");
    assert_eq!(first.map(|e| e.value.as_str()), Some("backend_a"));
    assert_eq!(first.and_then(|e| e.id.as_deref()), Some("0x55d1"));
    Ok(())
}

#[tokio::test]
async fn test_list_missing_map_is_not_found() -> TestResult {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ENTRIES))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "code": 404, "message": "map not found"
        })))
        .mount(&server)
        .await;

    let result = client(&server)?.list("missing").await;

    assert!(matches!(result, Err(StoreError::NotFound { .. })));
    Ok(())
}

#[tokio::test]
async fn test_create_posts_entry_with_force_sync() -> TestResult {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENTRIES))
        .and(query_param("map", "hosts"))
        .and(query_param("force_sync", "true"))
        .and(body_json(json!({"key": "a.example.com", "value": "backend_a"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "0x99", "key": "a.example.com", "value": "backend_a"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let created = client(&server)?
        .create("hosts", &Entry::new("a.example.com", "backend_a"))
        .await?;

    assert_eq!(created.id.as_deref(), Some("0x99"));
    Ok(())
}

#[tokio::test]
async fn test_update_targets_encoded_key() -> TestResult {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path(format!("{ENTRIES}/example.com%2Fapi")))
        .and(query_param("map", "hosts"))
        .and(query_param("force_sync", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "key": "example.com/api", "value": "backend_b"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let updated = client(&server)?
        .update("hosts", &Entry::new("example.com/api", "backend_b"))
        .await?;

    assert_eq!(updated.value, "backend_b");
    Ok(())
}

#[tokio::test]
async fn test_no_content_echoes_submitted_entry() -> TestResult {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path(format!("{ENTRIES}/a.example.com")))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let entry = Entry::new("a.example.com", "backend_a");
    let deleted = client(&server)?.delete("hosts", &entry).await?;

    assert_eq!(deleted, entry);
    Ok(())
}

#[tokio::test]
async fn test_error_status_carries_server_message() -> TestResult {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENTRIES))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": 409, "message": "entry already exists"
        })))
        .mount(&server)
        .await;

    let result = client(&server)?
        .create("hosts", &Entry::new("a.example.com", "backend_a"))
        .await;

    match result {
        Err(StoreError::Status { status, message }) => {
            assert_eq!(status, 409);
            assert_eq!(message, "entry already exists");
        }
        other => return Err(format!("unexpected result: {other:?}").into()),
    }
    Ok(())
}

#[tokio::test]
async fn test_error_status_without_json_body() -> TestResult {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let result = client(&server)?
        .update("hosts", &Entry::new("a", "1"))
        .await;

    assert!(matches!(result, Err(StoreError::Status { status: 500, .. })));
    Ok(())
}

#[tokio::test]
async fn test_malformed_body_is_invalid_payload() -> TestResult {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ENTRIES))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let result = client(&server)?.list("hosts").await;

    assert!(matches!(result, Err(StoreError::InvalidPayload { .. })));
    Ok(())
}

#[tokio::test]
async fn test_timeout_is_transport_error() -> TestResult {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(std::time::Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let config = DataplaneConfig::with_host(server.address().to_string())
        .timeout(std::time::Duration::from_millis(100));
    let result = DataplaneClient::with_config(config)?.list("hosts").await;

    assert!(matches!(result, Err(StoreError::Transport { .. })));
    Ok(())
}
