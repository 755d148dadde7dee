use serde_json::json;

use shared_config::{AppConfig, StorageBackend};

pub struct TestConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub service_role_key: Option<String>,
    pub storage_backend: StorageBackend,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            service_role_key: None,
            storage_backend: StorageBackend::Memory,
        }
    }
}

impl TestConfig {
    /// Config pointing at a mock PostgREST server (e.g. `MockServer::uri()`).
    pub fn supabase(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            storage_backend: StorageBackend::Supabase,
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_service_role_key: self.service_role_key.clone(),
            storage_backend: self.storage_backend,
            port: 0,
        }
    }
}

pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn patient_response(patient_id: i64, full_name: &str) -> serde_json::Value {
        json!({
            "id": patient_id,
            "full_name": full_name
        })
    }

    pub fn practitioner_response(practitioner_id: i64, full_name: &str) -> serde_json::Value {
        json!({
            "id": practitioner_id,
            "full_name": full_name
        })
    }

    pub fn appointment_response(
        appointment_id: i64,
        patient_id: i64,
        practitioner_id: i64,
        scheduled_at: &str,
        status: &str,
    ) -> serde_json::Value {
        json!({
            "id": appointment_id,
            "patient_id": patient_id,
            "practitioner_id": practitioner_id,
            "scheduled_at": scheduled_at,
            "status": status
        })
    }

    /// PostgREST error body for a unique index violation.
    pub fn unique_violation_response(constraint: &str) -> serde_json::Value {
        json!({
            "code": "23505",
            "details": null,
            "hint": null,
            "message": format!("duplicate key value violates unique constraint \"{}\"", constraint)
        })
    }

    pub fn foreign_key_violation_response(column: &str, table: &str) -> serde_json::Value {
        json!({
            "code": "23503",
            "details": format!("Key ({})=(1) is not present in table \"{}\".", column, table),
            "hint": null,
            "message": "insert or update on table \"appointments\" violates foreign key constraint"
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default();
        let app_config = config.to_app_config();

        assert_eq!(app_config.supabase_url, "http://localhost:54321");
        assert_eq!(app_config.supabase_anon_key, "test-anon-key");
        assert_eq!(app_config.storage_backend, StorageBackend::Memory);
    }

    #[test]
    fn test_supabase_config_points_at_mock() {
        let config = TestConfig::supabase("http://127.0.0.1:9999").to_app_config();

        assert_eq!(config.supabase_url, "http://127.0.0.1:9999");
        assert_eq!(config.storage_backend, StorageBackend::Supabase);
        assert!(config.is_configured());
    }

    #[test]
    fn test_appointment_response_shape() {
        let body = MockSupabaseResponses::appointment_response(1, 2, 3, "2024-05-01T10:00:00", "scheduled");

        assert_eq!(body["id"], 1);
        assert_eq!(body["practitioner_id"], 3);
        assert_eq!(body["status"], "scheduled");
    }
}
