// libs/appointment-cell/src/services/scheduling.rs
use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use shared_models::pagination::{Page, PageRequest};

use crate::models::{
    AppointmentError, AppointmentId, AppointmentStatus, AppointmentView, NewAppointment,
    PatientId, PractitionerId,
};
use crate::store::{Database, TransactionMode};

pub struct AppointmentService {
    database: Arc<dyn Database>,
}

impl AppointmentService {
    pub fn new(database: Arc<dyn Database>) -> Self {
        Self { database }
    }

    /// Book a practitioner's slot for a patient.
    ///
    /// Fails with `NotFound` when either party does not exist and with
    /// `ConflictDetected` when the practitioner already holds a scheduled
    /// appointment at exactly `scheduled_at`.
    pub async fn schedule(
        &self,
        patient_id: PatientId,
        practitioner_id: PractitionerId,
        scheduled_at: NaiveDateTime,
    ) -> Result<AppointmentView, AppointmentError> {
        info!("Scheduling appointment for patient {} with practitioner {} at {}",
              patient_id, practitioner_id, scheduled_at);

        let mut uow = self.database.begin(TransactionMode::ReadWrite).await?;

        let patient = uow.patients()
            .find_patient(patient_id)
            .await?
            .ok_or_else(AppointmentError::patient_not_found)?;

        let practitioner = uow.practitioners()
            .find_practitioner(practitioner_id)
            .await?
            .ok_or_else(AppointmentError::practitioner_not_found)?;

        if uow.appointments().exists_at(practitioner.id, scheduled_at).await? {
            warn!("Practitioner {} already has an appointment at {}", practitioner.id, scheduled_at);
            return Err(AppointmentError::ConflictDetected);
        }

        let appointment = uow.appointments()
            .insert(NewAppointment::scheduled(patient.id, practitioner.id, scheduled_at))
            .await?;

        uow.commit().await?;

        info!("Appointment {} scheduled", appointment.id);
        Ok(AppointmentView::from(appointment))
    }

    /// Cancel an appointment. Cancelling one that is already cancelled is a no-op.
    pub async fn cancel(&self, appointment_id: AppointmentId) -> Result<(), AppointmentError> {
        debug!("Cancelling appointment: {}", appointment_id);

        let mut uow = self.database.begin(TransactionMode::ReadWrite).await?;

        let mut appointment = uow.appointments()
            .find_appointment(appointment_id)
            .await?
            .ok_or_else(AppointmentError::appointment_not_found)?;

        if appointment.is_cancelled() {
            debug!("Appointment {} already cancelled", appointment_id);
            return uow.commit().await;
        }

        appointment.status = AppointmentStatus::Cancelled;
        uow.appointments().update(&appointment).await?;
        uow.commit().await?;

        info!("Appointment {} cancelled successfully", appointment_id);
        Ok(())
    }

    pub async fn list(&self, page: PageRequest) -> Result<Page<AppointmentView>, AppointmentError> {
        debug!("Listing appointments, page {} (size {})", page.page, page.page_size);

        let mut uow = self.database.begin(TransactionMode::ReadOnly).await?;
        let appointments = uow.appointments().find_all(page).await?;
        uow.commit().await?;

        Ok(appointments.map(|appointment| AppointmentView::from(&appointment)))
    }

    /// Unknown practitioners are not an error; they simply have no appointments.
    pub async fn list_by_practitioner(
        &self,
        practitioner_id: PractitionerId,
        page: PageRequest,
    ) -> Result<Page<AppointmentView>, AppointmentError> {
        debug!("Listing appointments for practitioner {}, page {} (size {})",
               practitioner_id, page.page, page.page_size);

        let mut uow = self.database.begin(TransactionMode::ReadOnly).await?;
        let appointments = uow.appointments().find_by_practitioner(practitioner_id, page).await?;
        uow.commit().await?;

        Ok(appointments.map(|appointment| AppointmentView::from(&appointment)))
    }
}
