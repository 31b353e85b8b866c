//! In-process store backed by vectors, for tests and local runs without Postgres.

use crate::error::StoreError;
use crate::facility::{Facility, FacilityRepository};
use crate::scheduling::{Appointment, NewAppointment, Patient, ScheduledPatient, SchedulingStore};
use crate::triage::{ConversationLog, LogEntry, NewLogEntry, NewPatient, PatientIntake};
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Tables {
    patients: Vec<Patient>,
    facilities: Vec<Facility>,
    appointments: Vec<Appointment>,
    log: Vec<LogEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_facilities(facilities: Vec<Facility>) -> Self {
        let store = Self::default();
        store.tables.lock().facilities = facilities;
        store
    }

    pub fn add_patient(&self, patient: NewPatient) -> Patient {
        let mut tables = self.tables.lock();
        let patient = Patient {
            id: next_id(tables.patients.iter().map(|p| p.id)),
            name: patient.name,
            age: patient.age,
            address: patient.address,
            phone: patient.phone,
            symptoms: patient.symptoms,
            registered_at: Utc::now(),
        };
        tables.patients.push(patient.clone());
        patient
    }

    pub fn appointments(&self) -> Vec<Appointment> {
        self.tables.lock().appointments.clone()
    }
}

fn next_id(ids: impl Iterator<Item = i32>) -> i32 {
    ids.max().unwrap_or(0) + 1
}

impl FacilityRepository for MemoryStore {
    async fn all_facilities(&self) -> Result<Vec<Facility>, StoreError> {
        Ok(self.tables.lock().facilities.clone())
    }

    async fn facility(&self, id: i32) -> Result<Option<Facility>, StoreError> {
        Ok(self
            .tables
            .lock()
            .facilities
            .iter()
            .find(|f| f.id == id)
            .cloned())
    }
}

impl SchedulingStore for MemoryStore {
    async fn patient(&self, id: i32) -> Result<Option<Patient>, StoreError> {
        Ok(self
            .tables
            .lock()
            .patients
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn pending_patients(&self) -> Result<Vec<Patient>, StoreError> {
        let tables = self.tables.lock();
        let mut pending: Vec<Patient> = tables
            .patients
            .iter()
            .filter(|p| !tables.appointments.iter().any(|a| a.patient_id == p.id))
            .cloned()
            .collect();
        pending.sort_by_key(|p| p.id);
        Ok(pending)
    }

    async fn scheduled_patients(&self) -> Result<Vec<ScheduledPatient>, StoreError> {
        let tables = self.tables.lock();
        let mut rows: Vec<ScheduledPatient> = tables
            .appointments
            .iter()
            .filter_map(|a| {
                let patient = tables.patients.iter().find(|p| p.id == a.patient_id)?;
                let facility = tables.facilities.iter().find(|f| f.id == a.facility_id)?;
                Some(ScheduledPatient {
                    patient: patient.clone(),
                    appointment_id: a.id,
                    scheduled_at: a.scheduled_at,
                    urgency: a.urgency.clone(),
                    facility_name: facility.name.clone(),
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            b.scheduled_at
                .cmp(&a.scheduled_at)
                .then(b.appointment_id.cmp(&a.appointment_id))
        });
        Ok(rows)
    }

    async fn insert_appointment(&self, new: NewAppointment) -> Result<Appointment, StoreError> {
        let mut tables = self.tables.lock();
        let appointment = Appointment {
            id: next_id(tables.appointments.iter().map(|a| a.id)),
            patient_id: new.patient_id,
            facility_id: new.facility_id,
            scheduled_at: new.scheduled_at,
            urgency: new.urgency,
            created_at: Utc::now(),
        };
        tables.appointments.push(appointment.clone());
        Ok(appointment)
    }

    async fn latest_appointment_at(
        &self,
        patient_id: i32,
        facility_id: i32,
    ) -> Result<Option<Appointment>, StoreError> {
        Ok(self
            .tables
            .lock()
            .appointments
            .iter()
            .filter(|a| a.patient_id == patient_id && a.facility_id == facility_id)
            .max_by_key(|a| (a.scheduled_at, a.id))
            .cloned())
    }

    async fn latest_appointment(&self, patient_id: i32) -> Result<Option<Appointment>, StoreError> {
        Ok(self
            .tables
            .lock()
            .appointments
            .iter()
            .filter(|a| a.patient_id == patient_id)
            .max_by_key(|a| (a.scheduled_at, a.id))
            .cloned())
    }
}

impl ConversationLog for MemoryStore {
    async fn append(&self, entry: NewLogEntry) -> Result<LogEntry, StoreError> {
        let mut tables = self.tables.lock();
        let entry = LogEntry {
            id: tables.log.last().map_or(1, |e| e.id + 1),
            conversation_id: entry.conversation_id,
            logged_at: Utc::now(),
            author: entry.author.as_str().to_string(),
            message: entry.message,
        };
        tables.log.push(entry.clone());
        Ok(entry)
    }

    async fn history(&self, conversation_id: Option<Uuid>) -> Result<Vec<LogEntry>, StoreError> {
        Ok(self
            .tables
            .lock()
            .log
            .iter()
            .filter(|e| conversation_id.is_none_or(|id| e.conversation_id == id))
            .cloned()
            .collect())
    }
}

impl PatientIntake for MemoryStore {
    async fn create_patient(&self, patient: NewPatient) -> Result<Patient, StoreError> {
        Ok(self.add_patient(patient))
    }
}
