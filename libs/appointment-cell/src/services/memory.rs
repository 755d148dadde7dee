// libs/appointment-cell/src/services/memory.rs
use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

use shared_models::pagination::{Page, PageRequest};

use crate::models::{
    Appointment, AppointmentError, AppointmentId, NewAppointment, Patient,
    PatientId, Practitioner, PractitionerId,
};
use crate::store::{
    AppointmentStore, Database, PatientStore, PractitionerStore, TransactionMode, UnitOfWork,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    patients: BTreeMap<PatientId, Patient>,
    practitioners: BTreeMap<PractitionerId, Practitioner>,
    appointments: BTreeMap<AppointmentId, Appointment>,
    last_patient_id: PatientId,
    last_practitioner_id: PractitionerId,
    last_appointment_id: AppointmentId,
}

/// Process-local database. Units of work are serialized on a single lock,
/// and read-write units operate on a private copy that is published on commit.
#[derive(Clone, Default)]
pub struct InMemoryDatabase {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_patient(&self, full_name: &str) -> PatientId {
        let mut state = self.state.lock().await;
        state.last_patient_id += 1;
        let id = state.last_patient_id;
        state.patients.insert(id, Patient { id, full_name: full_name.to_string() });
        debug!("Registered patient {} in memory", id);
        id
    }

    pub async fn add_practitioner(&self, full_name: &str) -> PractitionerId {
        let mut state = self.state.lock().await;
        state.last_practitioner_id += 1;
        let id = state.last_practitioner_id;
        state.practitioners.insert(id, Practitioner { id, full_name: full_name.to_string() });
        debug!("Registered practitioner {} in memory", id);
        id
    }

    pub async fn appointment_count(&self) -> usize {
        self.state.lock().await.appointments.len()
    }
}

#[async_trait]
impl Database for InMemoryDatabase {
    async fn begin(&self, mode: TransactionMode) -> Result<Box<dyn UnitOfWork>, AppointmentError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = match mode {
            TransactionMode::ReadOnly => None,
            TransactionMode::ReadWrite => Some((*guard).clone()),
        };

        Ok(Box::new(InMemoryUnitOfWork {
            guard,
            working,
            committed: false,
        }))
    }
}

pub struct InMemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    // None for read-only units of work.
    working: Option<MemoryState>,
    committed: bool,
}

impl InMemoryUnitOfWork {
    fn state(&self) -> &MemoryState {
        self.working.as_ref().unwrap_or(&*self.guard)
    }

    fn state_mut(&mut self) -> Result<&mut MemoryState, AppointmentError> {
        self.working.as_mut().ok_or(AppointmentError::ReadOnlyTransaction)
    }

    fn page_of<'a, I>(appointments: I, page: PageRequest) -> Page<Appointment>
    where
        I: Iterator<Item = &'a Appointment> + Clone,
    {
        let total = appointments.clone().count() as u64;
        let items = appointments
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .cloned()
            .collect();
        Page::new(items, page, total)
    }
}

impl Drop for InMemoryUnitOfWork {
    fn drop(&mut self) {
        if self.working.is_some() && !self.committed {
            debug!("Rolling back uncommitted in-memory unit of work");
        }
    }
}

#[async_trait]
impl PatientStore for InMemoryUnitOfWork {
    async fn find_patient(&self, id: PatientId) -> Result<Option<Patient>, AppointmentError> {
        Ok(self.state().patients.get(&id).cloned())
    }
}

#[async_trait]
impl PractitionerStore for InMemoryUnitOfWork {
    async fn find_practitioner(&self, id: PractitionerId) -> Result<Option<Practitioner>, AppointmentError> {
        Ok(self.state().practitioners.get(&id).cloned())
    }
}

#[async_trait]
impl AppointmentStore for InMemoryUnitOfWork {
    async fn exists_at(
        &self,
        practitioner_id: PractitionerId,
        scheduled_at: NaiveDateTime,
    ) -> Result<bool, AppointmentError> {
        Ok(self.state()
            .appointments
            .values()
            .any(|a| a.occupies_slot(practitioner_id, scheduled_at)))
    }

    async fn find_appointment(&self, id: AppointmentId) -> Result<Option<Appointment>, AppointmentError> {
        Ok(self.state().appointments.get(&id).cloned())
    }

    async fn insert(&mut self, appointment: NewAppointment) -> Result<Appointment, AppointmentError> {
        let state = self.state_mut()?;

        // Mirrors the unique index on (practitioner_id, scheduled_at).
        let slot_taken = state.appointments.values()
            .any(|a| a.occupies_slot(appointment.practitioner_id, appointment.scheduled_at));
        if slot_taken {
            warn!("Slot constraint violated for practitioner {} at {}",
                  appointment.practitioner_id, appointment.scheduled_at);
            return Err(AppointmentError::ConflictDetected);
        }

        state.last_appointment_id += 1;
        let saved = appointment.with_id(state.last_appointment_id);
        state.appointments.insert(saved.id, saved.clone());
        Ok(saved)
    }

    async fn update(&mut self, appointment: &Appointment) -> Result<Appointment, AppointmentError> {
        let state = self.state_mut()?;

        if !state.appointments.contains_key(&appointment.id) {
            return Err(AppointmentError::appointment_not_found());
        }

        let slot_taken = state.appointments.values()
            .any(|a| a.id != appointment.id
                && a.occupies_slot(appointment.practitioner_id, appointment.scheduled_at));
        if slot_taken {
            return Err(AppointmentError::ConflictDetected);
        }

        state.appointments.insert(appointment.id, appointment.clone());
        Ok(appointment.clone())
    }

    async fn find_all(&self, page: PageRequest) -> Result<Page<Appointment>, AppointmentError> {
        Ok(Self::page_of(self.state().appointments.values(), page))
    }

    async fn find_by_practitioner(
        &self,
        practitioner_id: PractitionerId,
        page: PageRequest,
    ) -> Result<Page<Appointment>, AppointmentError> {
        let matching = self.state()
            .appointments
            .values()
            .filter(move |a| a.practitioner_id == practitioner_id);
        Ok(Self::page_of(matching, page))
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
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
        if let Some(working) = this.working.take() {
            *this.guard = working;
            debug!("Committed in-memory unit of work");
        }
        this.committed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(hour, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_dropped_unit_of_work_rolls_back() {
        let db = InMemoryDatabase::new();
        let patient = db.add_patient("Ana").await;
        let practitioner = db.add_practitioner("Dr. Souza").await;

        {
            let mut uow = db.begin(TransactionMode::ReadWrite).await.unwrap();
            uow.appointments()
                .insert(NewAppointment::scheduled(patient, practitioner, at(10)))
                .await
                .unwrap();
        }

        assert_eq!(db.appointment_count().await, 0);
    }

    #[tokio::test]
    async fn test_commit_publishes_writes_and_assigns_sequential_ids() {
        let db = InMemoryDatabase::new();
        let patient = db.add_patient("Ana").await;
        let practitioner = db.add_practitioner("Dr. Souza").await;

        let mut uow = db.begin(TransactionMode::ReadWrite).await.unwrap();
        let first = uow.appointments()
            .insert(NewAppointment::scheduled(patient, practitioner, at(10)))
            .await
            .unwrap();
        let second = uow.appointments()
            .insert(NewAppointment::scheduled(patient, practitioner, at(11)))
            .await
            .unwrap();
        uow.commit().await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(db.appointment_count().await, 2);
    }

    #[tokio::test]
    async fn test_read_only_unit_of_work_rejects_writes() {
        let db = InMemoryDatabase::new();

        let mut uow = db.begin(TransactionMode::ReadOnly).await.unwrap();
        let result = uow.appointments()
            .insert(NewAppointment::scheduled(1, 1, at(10)))
            .await;

        assert_eq!(result.unwrap_err(), AppointmentError::ReadOnlyTransaction);
    }

    #[tokio::test]
    async fn test_insert_enforces_slot_constraint() {
        let db = InMemoryDatabase::new();

        let mut uow = db.begin(TransactionMode::ReadWrite).await.unwrap();
        uow.appointments().insert(NewAppointment::scheduled(1, 1, at(10))).await.unwrap();
        let duplicate = uow.appointments().insert(NewAppointment::scheduled(2, 1, at(10))).await;

        assert_eq!(duplicate.unwrap_err(), AppointmentError::ConflictDetected);
    }

    #[tokio::test]
    async fn test_cancelled_row_still_holds_slot() {
        let db = InMemoryDatabase::new();

        let mut uow = db.begin(TransactionMode::ReadWrite).await.unwrap();
        let mut first = uow.appointments().insert(NewAppointment::scheduled(1, 1, at(10))).await.unwrap();
        first.status = crate::models::AppointmentStatus::Cancelled;
        uow.appointments().update(&first).await.unwrap();

        assert!(uow.appointments().exists_at(1, at(10)).await.unwrap());
        let rebook = uow.appointments().insert(NewAppointment::scheduled(2, 1, at(10))).await;
        assert_eq!(rebook.unwrap_err(), AppointmentError::ConflictDetected);
    }

    #[tokio::test]
    async fn test_pages_report_total_and_slice() {
        let db = InMemoryDatabase::new();

        let mut uow = db.begin(TransactionMode::ReadWrite).await.unwrap();
        for hour in 8..13 {
            uow.appointments().insert(NewAppointment::scheduled(1, 1, at(hour))).await.unwrap();
        }
        uow.appointments().insert(NewAppointment::scheduled(1, 2, at(8))).await.unwrap();
        uow.commit().await.unwrap();

        let mut uow = db.begin(TransactionMode::ReadOnly).await.unwrap();
        let page = uow.appointments().find_by_practitioner(1, PageRequest::new(1, 2)).await.unwrap();

        assert_eq!(page.total, 5);
        assert_eq!(page.items.iter().map(|a| a.id).collect::<Vec<_>>(), vec![3, 4]);

        let all = uow.appointments().find_all(PageRequest::new(0, 10)).await.unwrap();
        assert_eq!(all.total, 6);
        assert_eq!(all.items.len(), 6);
    }
}
