// libs/appointment-cell/src/models.rs
use serde::{Deserialize, Serialize};
use chrono::NaiveDateTime;
use std::fmt;

use shared_database::DatabaseError;

pub type PatientId = i64;
pub type PractitionerId = i64;
pub type AppointmentId = i64;

// ==============================================================================
// IDENTITY RECORDS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: PatientId,
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Practitioner {
    pub id: PractitionerId,
    pub full_name: String,
}

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub patient_id: PatientId,
    pub practitioner_id: PractitionerId,
    pub scheduled_at: NaiveDateTime,
    pub status: AppointmentStatus,
}

impl Appointment {
    pub fn is_cancelled(&self) -> bool {
        self.status == AppointmentStatus::Cancelled
    }

    /// Whether this appointment holds its practitioner's slot. Cancelling
    /// does not release the slot.
    pub fn occupies_slot(&self, practitioner_id: PractitionerId, scheduled_at: NaiveDateTime) -> bool {
        self.practitioner_id == practitioner_id && self.scheduled_at == scheduled_at
    }
}

/// An appointment that has not been persisted yet; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAppointment {
    pub patient_id: PatientId,
    pub practitioner_id: PractitionerId,
    pub scheduled_at: NaiveDateTime,
    pub status: AppointmentStatus,
}

impl NewAppointment {
    pub fn scheduled(
        patient_id: PatientId,
        practitioner_id: PractitionerId,
        scheduled_at: NaiveDateTime,
    ) -> Self {
        Self {
            patient_id,
            practitioner_id,
            scheduled_at,
            status: AppointmentStatus::Scheduled,
        }
    }

    pub fn with_id(self, id: AppointmentId) -> Appointment {
        Appointment {
            id,
            patient_id: self.patient_id,
            practitioner_id: self.practitioner_id,
            scheduled_at: self.scheduled_at,
            status: self.status,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Cancelled,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleAppointmentRequest {
    pub patient_id: PatientId,
    pub practitioner_id: PractitionerId,
    #[serde(deserialize_with = "deserialize_local_datetime")]
    pub scheduled_at: NaiveDateTime,
}

// Seconds are optional: `2024-05-01T10:00` and `2024-05-01T10:00:00.5` both parse.
const LOCAL_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

pub fn parse_local_datetime(value: &str) -> Option<NaiveDateTime> {
    LOCAL_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value.trim(), format).ok())
}

fn deserialize_local_datetime<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de;

    let raw = String::deserialize(deserializer)?;
    parse_local_datetime(&raw).ok_or_else(|| {
        de::Error::custom(format!(
            "invalid timestamp '{}', expected YYYY-MM-DDTHH:MM[:SS[.fff]]",
            raw
        ))
    })
}

/// Read-only projection handed to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentView {
    pub id: AppointmentId,
    pub patient_id: PatientId,
    pub practitioner_id: PractitionerId,
    pub scheduled_at: NaiveDateTime,
    pub status: AppointmentStatus,
}

impl From<&Appointment> for AppointmentView {
    fn from(appointment: &Appointment) -> Self {
        Self {
            id: appointment.id,
            patient_id: appointment.patient_id,
            practitioner_id: appointment.practitioner_id,
            scheduled_at: appointment.scheduled_at,
            status: appointment.status,
        }
    }
}

impl From<Appointment> for AppointmentView {
    fn from(appointment: Appointment) -> Self {
        Self::from(&appointment)
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AppointmentError {
    #[error("{0}")]
    NotFound(String),

    #[error("Practitioner already has an appointment scheduled at this time")]
    ConflictDetected,

    #[error("Write attempted in a read-only unit of work")]
    ReadOnlyTransaction,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl AppointmentError {
    pub fn patient_not_found() -> Self {
        AppointmentError::NotFound("Patient not found".to_string())
    }

    pub fn practitioner_not_found() -> Self {
        AppointmentError::NotFound("Practitioner not found".to_string())
    }

    pub fn appointment_not_found() -> Self {
        AppointmentError::NotFound("Appointment not found".to_string())
    }
}

impl From<DatabaseError> for AppointmentError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Conflict(_) => AppointmentError::ConflictDetected,
            // The referenced row disappeared between lookup and write.
            DatabaseError::ForeignKeyViolation(detail) if detail.contains("practitioner_id") => {
                AppointmentError::practitioner_not_found()
            }
            DatabaseError::ForeignKeyViolation(_) => AppointmentError::patient_not_found(),
            other => AppointmentError::DatabaseError(other.to_string()),
        }
    }
}
