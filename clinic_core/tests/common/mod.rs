#![allow(dead_code)]

use clinic_core::StoreError;
use clinic_core::facility::Facility;
use clinic_core::geo::Coordinate;
use clinic_core::geocoding::{GeocodeError, Geocoder};
use clinic_core::memory::MemoryStore;
use clinic_core::scheduling::Patient;
use clinic_core::triage::{
    ChatTurn, ConversationLog, LanguageModel, LanguageModelError, LogEntry, NewLogEntry,
    NewPatient, PatientIntake,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

pub const PATIENT_ORIGIN: Coordinate = Coordinate::new(-23.55, -46.63);

/// Kilometres per degree of latitude around São Paulo.
const KM_PER_LAT_DEGREE: f64 = 110.79;

pub fn facility_north_of_origin(id: i32, name: &str, address: &str, km: f64) -> Facility {
    Facility {
        id,
        name: name.to_string(),
        address: address.to_string(),
        latitude: format!("{}", PATIENT_ORIGIN.latitude + km / KM_PER_LAT_DEGREE),
        longitude: format!("{}", PATIENT_ORIGIN.longitude),
    }
}

#[derive(Clone, Default)]
pub struct StubGeocoder {
    known: HashMap<String, Coordinate>,
    fail: bool,
}

impl StubGeocoder {
    pub fn knowing(address: &str, coordinate: Coordinate) -> Self {
        let mut known = HashMap::new();
        known.insert(address.to_string(), coordinate);
        Self { known, fail: false }
    }

    pub fn timing_out() -> Self {
        Self {
            known: HashMap::new(),
            fail: true,
        }
    }
}

impl Geocoder for StubGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinate>, GeocodeError> {
        if self.fail {
            return Err(GeocodeError::Timeout);
        }
        Ok(self.known.get(address).copied())
    }
}

/// Replies with a canned string and remembers the transcripts it was given.
#[derive(Clone, Default)]
pub struct ScriptedModel {
    pub reply: String,
    pub fail: bool,
    pub calls: Arc<Mutex<Vec<Vec<ChatTurn>>>>,
}

impl ScriptedModel {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            ..Self::default()
        }
    }
}

impl LanguageModel for ScriptedModel {
    async fn reply(
        &self,
        _system_prompt: &str,
        transcript: &[ChatTurn],
    ) -> Result<String, LanguageModelError> {
        self.calls.lock().push(transcript.to_vec());
        if self.fail {
            return Err(LanguageModelError::Unavailable("scripted failure".to_string()));
        }
        Ok(self.reply.clone())
    }
}

/// A [`MemoryStore`] whose next patient write can be made to fail.
#[derive(Clone, Default)]
pub struct FlakyIntake {
    pub store: MemoryStore,
    pub fail_next: Arc<AtomicBool>,
}

impl ConversationLog for FlakyIntake {
    async fn append(&self, entry: NewLogEntry) -> Result<LogEntry, StoreError> {
        self.store.append(entry).await
    }

    async fn history(&self, conversation_id: Option<Uuid>) -> Result<Vec<LogEntry>, StoreError> {
        self.store.history(conversation_id).await
    }
}

impl PatientIntake for FlakyIntake {
    async fn create_patient(&self, patient: NewPatient) -> Result<Patient, StoreError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unavailable("database went away".to_string()));
        }
        self.store.create_patient(patient).await
    }
}
