use assert_matches::assert_matches;
use reqwest::Method;
use serde_json::{json, Value};
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{method, path, header, query_param};

use shared_config::{AppConfig, StorageBackend};
use shared_database::{DatabaseError, SupabaseClient};

fn test_config(url: &str, service_role_key: Option<&str>) -> AppConfig {
    AppConfig {
        supabase_url: url.to_string(),
        supabase_anon_key: "test-anon-key".to_string(),
        supabase_service_role_key: service_role_key.map(str::to_string),
        storage_backend: StorageBackend::Supabase,
        port: 3000,
    }
}

#[tokio::test]
async fn test_request_sends_api_key_and_bearer() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(header("apikey", "test-anon-key"))
        .and(header("authorization", "Bearer service-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1, "full_name": "Ana"}])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = SupabaseClient::new(&test_config(&mock_server.uri(), Some("service-key")));
    let rows: Vec<Value> = client.request(Method::GET, "/rest/v1/patients", None).await.unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["full_name"], "Ana");
}

#[tokio::test]
async fn test_conflict_status_maps_to_conflict() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint"
        })))
        .mount(&mock_server)
        .await;

    let client = SupabaseClient::new(&test_config(&mock_server.uri(), None));
    let result: Result<Vec<Value>, _> = client
        .request(Method::POST, "/rest/v1/appointments", Some(json!({})))
        .await;

    let err = result.unwrap_err();
    assert!(err.is_conflict());
    assert_matches!(err, DatabaseError::Conflict(_));
}

#[tokio::test]
async fn test_error_statuses_are_classified() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/forbidden"))
        .respond_with(ResponseTemplate::new(401).set_body_string("no"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/broken"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let client = SupabaseClient::new(&test_config(&mock_server.uri(), None));

    let auth: Result<Value, _> = client.request(Method::GET, "/rest/v1/forbidden", None).await;
    assert_matches!(auth.unwrap_err(), DatabaseError::Auth(_));

    let api: Result<Value, _> = client.request(Method::GET, "/rest/v1/broken", None).await;
    assert_matches!(api.unwrap_err(), DatabaseError::Api { status: 500, .. });
}

#[tokio::test]
async fn test_request_counted_reads_content_range() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("limit", "2"))
        .and(header("prefer", "count=exact"))
        .respond_with(
            ResponseTemplate::new(206)
                .insert_header("content-range", "0-1/5")
                .set_body_json(json!([{"id": 1}, {"id": 2}])),
        )
        .mount(&mock_server)
        .await;

    let client = SupabaseClient::new(&test_config(&mock_server.uri(), None));
    let (rows, total): (Vec<Value>, Option<u64>) = client
        .request_counted("/rest/v1/appointments?limit=2")
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(total, Some(5));
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server)
        .await;

    let client = SupabaseClient::new(&test_config(&mock_server.uri(), None));
    let result: Result<Vec<Value>, _> = client.request(Method::GET, "/rest/v1/patients", None).await;

    assert_matches!(result.unwrap_err(), DatabaseError::Decode(_));
}
