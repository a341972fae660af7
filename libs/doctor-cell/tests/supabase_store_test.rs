use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::NaiveTime;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use doctor_cell::models::{AvailabilityError, Weekday};
use doctor_cell::services::{AvailabilityStore, SupabaseAvailabilityStore};
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

fn store_for(server: &MockServer) -> SupabaseAvailabilityStore {
    let mut config = AppConfig::in_memory();
    config.supabase_url = server.uri();
    config.supabase_anon_key = "test-anon-key".to_string();
    SupabaseAvailabilityStore::new(Arc::new(SupabaseClient::new(&config)))
}

#[tokio::test]
async fn active_windows_queries_by_doctor_and_weekday() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_availability"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .and(query_param("weekday", "eq.Mon"))
        .and(query_param("is_active", "eq.true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": Uuid::new_v4(),
                "doctor_id": doctor_id,
                "weekday": "Monday",
                "start_time": "09:00:00",
                "end_time": "13:00:00",
                "is_active": true,
                "created_at": "2025-06-01T10:00:00Z"
            }
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let windows = store_for(&mock_server)
        .active_windows(doctor_id, Weekday::Mon)
        .await
        .unwrap();

    assert_eq!(windows.len(), 1);
    assert_eq!(windows[0].weekday, Weekday::Mon);
    assert_eq!(windows[0].window_start, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
    assert_eq!(windows[0].window_end, NaiveTime::from_hms_opt(13, 0, 0).unwrap());
}

#[tokio::test]
async fn storage_failures_surface_as_storage_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_availability"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database unavailable"))
        .mount(&mock_server)
        .await;

    let result = store_for(&mock_server)
        .active_windows_for_doctor(Uuid::new_v4())
        .await;

    assert_matches!(result, Err(AvailabilityError::Storage(_)));
}

#[tokio::test]
async fn malformed_rows_are_rejected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_availability"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": Uuid::new_v4(), "doctor_id": Uuid::new_v4(), "weekday": "Someday",
              "start_time": "09:00:00", "end_time": "10:00:00" }
        ])))
        .mount(&mock_server)
        .await;

    let result = store_for(&mock_server)
        .active_windows_for_doctor(Uuid::new_v4())
        .await;

    assert_matches!(result, Err(AvailabilityError::Storage(msg)) if msg.contains("parse"));
}
