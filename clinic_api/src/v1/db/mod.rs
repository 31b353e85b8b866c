pub mod queries;

use clinic_core::StoreError;
use clinic_core::facility::{Facility, FacilityRepository};
use clinic_core::scheduling::{
    Appointment, NewAppointment, Patient, ScheduledPatient, SchedulingStore,
};
use clinic_core::triage::{ConversationLog, LogEntry, NewLogEntry, NewPatient, PatientIntake};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

/// Postgres-backed implementation of every store the core services need.
#[derive(Clone)]
pub struct PgStore {
    pub pool: Pool<Postgres>,
}

impl PgStore {
    pub const fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

impl FacilityRepository for PgStore {
    async fn all_facilities(&self) -> Result<Vec<Facility>, StoreError> {
        Ok(queries::get_all_facilities(&self.pool).await?)
    }

    async fn facility(&self, id: i32) -> Result<Option<Facility>, StoreError> {
        Ok(queries::get_facility(&self.pool, id).await?)
    }
}

impl SchedulingStore for PgStore {
    async fn patient(&self, id: i32) -> Result<Option<Patient>, StoreError> {
        Ok(queries::get_patient(&self.pool, id).await?)
    }

    async fn pending_patients(&self) -> Result<Vec<Patient>, StoreError> {
        Ok(queries::get_pending_patients(&self.pool).await?)
    }

    async fn scheduled_patients(&self) -> Result<Vec<ScheduledPatient>, StoreError> {
        Ok(queries::get_scheduled_patients(&self.pool).await?)
    }

    async fn insert_appointment(&self, new: NewAppointment) -> Result<Appointment, StoreError> {
        Ok(queries::insert_appointment(
            &self.pool,
            new.patient_id,
            new.facility_id,
            new.scheduled_at,
            &new.urgency,
        )
        .await?)
    }

    async fn latest_appointment_at(
        &self,
        patient_id: i32,
        facility_id: i32,
    ) -> Result<Option<Appointment>, StoreError> {
        Ok(queries::get_latest_appointment(&self.pool, patient_id, Some(facility_id)).await?)
    }

    async fn latest_appointment(&self, patient_id: i32) -> Result<Option<Appointment>, StoreError> {
        Ok(queries::get_latest_appointment(&self.pool, patient_id, None).await?)
    }
}

impl ConversationLog for PgStore {
    async fn append(&self, entry: NewLogEntry) -> Result<LogEntry, StoreError> {
        Ok(queries::insert_log_entry(
            &self.pool,
            entry.conversation_id,
            entry.author.as_str(),
            &entry.message,
        )
        .await?)
    }

    async fn history(&self, conversation_id: Option<Uuid>) -> Result<Vec<LogEntry>, StoreError> {
        Ok(queries::get_log_entries(&self.pool, conversation_id).await?)
    }
}

impl PatientIntake for PgStore {
    async fn create_patient(&self, patient: NewPatient) -> Result<Patient, StoreError> {
        Ok(queries::insert_patient(
            &self.pool,
            &patient.name,
            &patient.age,
            &patient.address,
            patient.phone.as_deref(),
            patient.symptoms.as_deref(),
        )
        .await?)
    }
}
