// libs/appointment-cell/src/services/supabase.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::Method;
use serde_json::json;
use tracing::{debug, warn};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::pagination::{Page, PageRequest};

use crate::models::{
    Appointment, AppointmentError, AppointmentId, NewAppointment, Patient, PatientId,
    Practitioner, PractitionerId,
};
use crate::store::{
    AppointmentStore, Database, PatientStore, PractitionerStore, TransactionMode, UnitOfWork,
};

const APPOINTMENTS: &str = "/rest/v1/appointments";

/// PostgREST-backed database.
///
/// PostgREST has no multi-request transactions. Every statement is atomic on
/// its own, and the service issues at most one write per unit of work as its
/// final step, so that write is the commit point. The unique index
/// `appointments_practitioner_slot_key` rejects concurrent double bookings
/// with a 409, which surfaces as [`AppointmentError::ConflictDetected`].
pub struct SupabaseDatabase {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseDatabase {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
        }
    }
}

#[async_trait]
impl Database for SupabaseDatabase {
    async fn begin(&self, mode: TransactionMode) -> Result<Box<dyn UnitOfWork>, AppointmentError> {
        Ok(Box::new(SupabaseUnitOfWork {
            supabase: Arc::clone(&self.supabase),
            mode,
            pending_write: false,
        }))
    }
}

pub struct SupabaseUnitOfWork {
    supabase: Arc<SupabaseClient>,
    mode: TransactionMode,
    pending_write: bool,
}

impl SupabaseUnitOfWork {
    fn ensure_writable(&self) -> Result<(), AppointmentError> {
        match self.mode {
            TransactionMode::ReadWrite => Ok(()),
            TransactionMode::ReadOnly => Err(AppointmentError::ReadOnlyTransaction),
        }
    }

    async fn first_row<T>(&self, path: &str) -> Result<Option<T>, AppointmentError>
    where
        T: serde::de::DeserializeOwned,
    {
        let mut rows: Vec<T> = self.supabase.request(Method::GET, path, None).await?;
        if rows.is_empty() {
            return Ok(None);
        }
        Ok(Some(rows.swap_remove(0)))
    }

    async fn fetch_page(&self, filter: &str, page: PageRequest) -> Result<Page<Appointment>, AppointmentError> {
        let path = format!(
            "{}?{}order=id.asc&limit={}&offset={}",
            APPOINTMENTS, filter, page.limit(), page.offset()
        );

        let (rows, total) = self.supabase.request_counted::<Appointment>(&path).await?;
        let total = total.unwrap_or(page.offset() + rows.len() as u64);

        Ok(Page::new(rows, page, total))
    }
}

fn timestamp_param(scheduled_at: NaiveDateTime) -> String {
    let formatted = scheduled_at.format("%Y-%m-%dT%H:%M:%S%.f").to_string();
    urlencoding::encode(&formatted).into_owned()
}

impl Drop for SupabaseUnitOfWork {
    fn drop(&mut self) {
        if self.pending_write {
            warn!("Unit of work dropped after a write was applied; PostgREST statements cannot be rolled back");
        }
    }
}

#[async_trait]
impl PatientStore for SupabaseUnitOfWork {
    async fn find_patient(&self, id: PatientId) -> Result<Option<Patient>, AppointmentError> {
        debug!("Fetching patient: {}", id);
        self.first_row(&format!("/rest/v1/patients?id=eq.{}&select=id,full_name", id)).await
    }
}

#[async_trait]
impl PractitionerStore for SupabaseUnitOfWork {
    async fn find_practitioner(&self, id: PractitionerId) -> Result<Option<Practitioner>, AppointmentError> {
        debug!("Fetching practitioner: {}", id);
        self.first_row(&format!("/rest/v1/practitioners?id=eq.{}&select=id,full_name", id)).await
    }
}

#[async_trait]
impl AppointmentStore for SupabaseUnitOfWork {
    async fn exists_at(
        &self,
        practitioner_id: PractitionerId,
        scheduled_at: NaiveDateTime,
    ) -> Result<bool, AppointmentError> {
        let path = format!(
            "{}?practitioner_id=eq.{}&scheduled_at=eq.{}&select=id&limit=1",
            APPOINTMENTS, practitioner_id, timestamp_param(scheduled_at)
        );

        let rows: Vec<serde_json::Value> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(!rows.is_empty())
    }

    async fn find_appointment(&self, id: AppointmentId) -> Result<Option<Appointment>, AppointmentError> {
        debug!("Fetching appointment: {}", id);
        self.first_row(&format!("{}?id=eq.{}", APPOINTMENTS, id)).await
    }

    async fn insert(&mut self, appointment: NewAppointment) -> Result<Appointment, AppointmentError> {
        self.ensure_writable()?;

        let body = json!({
            "patient_id": appointment.patient_id,
            "practitioner_id": appointment.practitioner_id,
            "scheduled_at": appointment.scheduled_at,
            "status": appointment.status,
        });

        let mut rows: Vec<Appointment> = self.supabase.request_with_headers(
            Method::POST,
            APPOINTMENTS,
            Some(body),
            Some(SupabaseClient::prefer("return=representation")),
        ).await?;
        self.pending_write = true;

        if rows.is_empty() {
            return Err(AppointmentError::DatabaseError("Insert returned no representation".to_string()));
        }
        Ok(rows.swap_remove(0))
    }

    async fn update(&mut self, appointment: &Appointment) -> Result<Appointment, AppointmentError> {
        self.ensure_writable()?;

        let body = json!({
            "patient_id": appointment.patient_id,
            "practitioner_id": appointment.practitioner_id,
            "scheduled_at": appointment.scheduled_at,
            "status": appointment.status,
        });

        let path = format!("{}?id=eq.{}", APPOINTMENTS, appointment.id);
        let mut rows: Vec<Appointment> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(body),
            Some(SupabaseClient::prefer("return=representation")),
        ).await?;
        self.pending_write = true;

        if rows.is_empty() {
            return Err(AppointmentError::appointment_not_found());
        }
        Ok(rows.swap_remove(0))
    }

    async fn find_all(&self, page: PageRequest) -> Result<Page<Appointment>, AppointmentError> {
        self.fetch_page("", page).await
    }

    async fn find_by_practitioner(
        &self,
        practitioner_id: PractitionerId,
        page: PageRequest,
    ) -> Result<Page<Appointment>, AppointmentError> {
        self.fetch_page(&format!("practitioner_id=eq.{}&", practitioner_id), page).await
    }
}

#[async_trait]
impl UnitOfWork for SupabaseUnitOfWork {
    fn patients(&mut self) -> &mut dyn PatientStore {
        self
    }

    fn practitioners(&mut self) -> &mut dyn PractitionerStore {
        self
    }

    fn appointments(&mut self) -> &mut dyn AppointmentStore {
        self
    }

    async fn commit(self: Box<Self>) -> Result<(), AppointmentError> {
        let mut this = self;
        if this.pending_write {
            debug!("Committed PostgREST unit of work");
        }
        this.pending_write = false;
        Ok(())
    }
}
