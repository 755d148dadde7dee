// libs/appointment-cell/src/store.rs
use async_trait::async_trait;
use chrono::NaiveDateTime;

use shared_models::pagination::{Page, PageRequest};

use crate::models::{
    Appointment, AppointmentError, AppointmentId, NewAppointment, Patient, PatientId,
    Practitioner, PractitionerId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionMode {
    ReadOnly,
    ReadWrite,
}

#[async_trait]
pub trait PatientStore: Send {
    async fn find_patient(&self, id: PatientId) -> Result<Option<Patient>, AppointmentError>;
}

#[async_trait]
pub trait PractitionerStore: Send {
    async fn find_practitioner(&self, id: PractitionerId) -> Result<Option<Practitioner>, AppointmentError>;
}

#[async_trait]
pub trait AppointmentStore: Send {
    /// True when any appointment, cancelled or not, holds the practitioner's slot.
    async fn exists_at(
        &self,
        practitioner_id: PractitionerId,
        scheduled_at: NaiveDateTime,
    ) -> Result<bool, AppointmentError>;

    async fn find_appointment(&self, id: AppointmentId) -> Result<Option<Appointment>, AppointmentError>;

    /// First save of an appointment; the store assigns the id.
    async fn insert(&mut self, appointment: NewAppointment) -> Result<Appointment, AppointmentError>;

    async fn update(&mut self, appointment: &Appointment) -> Result<Appointment, AppointmentError>;

    async fn find_all(&self, page: PageRequest) -> Result<Page<Appointment>, AppointmentError>;

    async fn find_by_practitioner(
        &self,
        practitioner_id: PractitionerId,
        page: PageRequest,
    ) -> Result<Page<Appointment>, AppointmentError>;
}

/// An atomic sequence of reads and writes. Dropping a unit of work without
/// calling [`UnitOfWork::commit`] rolls it back.
#[async_trait]
pub trait UnitOfWork: Send {
    fn patients(&mut self) -> &mut dyn PatientStore;

    fn practitioners(&mut self) -> &mut dyn PractitionerStore;

    fn appointments(&mut self) -> &mut dyn AppointmentStore;

    async fn commit(self: Box<Self>) -> Result<(), AppointmentError>;
}

#[async_trait]
pub trait Database: Send + Sync {
    async fn begin(&self, mode: TransactionMode) -> Result<Box<dyn UnitOfWork>, AppointmentError>;
}
