use crate::error::StoreError;
use crate::facility::{Facility, FacilityRepository};
use crate::locator::NearbyFacilities;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::future::Future;
use thiserror::Error;
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: i32,
    pub name: String,
    pub age: String,
    pub address: String,
    pub phone: Option<String>,
    pub symptoms: Option<String>,
    pub registered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: i32,
    pub patient_id: i32,
    pub facility_id: i32,
    /// Clinic wall-clock time chosen by the doctor.
    pub scheduled_at: NaiveDateTime,
    pub urgency: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAppointment {
    pub patient_id: i32,
    pub facility_id: i32,
    pub scheduled_at: NaiveDateTime,
    pub urgency: String,
}

/// One row per appointment, as shown in the "scheduled" listing.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledPatient {
    #[sqlx(flatten)]
    pub patient: Patient,
    pub appointment_id: i32,
    pub scheduled_at: NaiveDateTime,
    pub urgency: String,
    pub facility_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Confirmation {
    pub patient: Patient,
    pub facility: Facility,
    pub appointment: Appointment,
}

/// Raw scheduling form. Every field is optional so that missing input is
/// reported as a validation failure rather than a deserialization error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRequest {
    #[serde(default, alias = "ubs", deserialize_with = "text_or_number")]
    pub facility_id: Option<String>,
    #[serde(alias = "data")]
    pub date: Option<String>,
    #[serde(alias = "hora")]
    pub time: Option<String>,
    #[serde(alias = "urgencia")]
    pub urgency: Option<String>,
}

/// JSON clients send ids as numbers, HTML forms as text.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawId>::deserialize(deserializer)?.map(|raw| match raw {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    }))
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("select a health unit to schedule the appointment")]
    MissingFacility,
    #[error("health unit id {0:?} is not valid")]
    InvalidFacility(String),
    #[error("health unit {0} is not among the nearby units for this patient")]
    FacilityNotNearby(i32),
    #[error("an appointment date is required")]
    MissingDate,
    #[error("an appointment time is required")]
    MissingTime,
    #[error("date {0:?} is not valid, use YYYY-MM-DD or DD/MM/YYYY")]
    InvalidDate(String),
    #[error("time {0:?} is not valid, use HH:MM")]
    InvalidTime(String),
}

#[derive(Debug, Error)]
pub enum SchedulingError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("patient {0} not found")]
    PatientNotFound(i32),
    #[error("no appointment for patient {patient_id} at health unit {facility_id}")]
    ConfirmationNotFound { patient_id: i32, facility_id: i32 },
    #[error("patient {0} has no appointment")]
    AppointmentNotFound(i32),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Persistence needed by [`SchedulingService`].
pub trait SchedulingStore: Send + Sync {
    fn patient(&self, id: i32) -> impl Future<Output = Result<Option<Patient>, StoreError>> + Send;

    /// Patients without appointments, by id ascending.
    fn pending_patients(&self) -> impl Future<Output = Result<Vec<Patient>, StoreError>> + Send;

    /// Every appointment joined with its patient and facility name, newest first.
    fn scheduled_patients(
        &self,
    ) -> impl Future<Output = Result<Vec<ScheduledPatient>, StoreError>> + Send;

    fn insert_appointment(
        &self,
        appointment: NewAppointment,
    ) -> impl Future<Output = Result<Appointment, StoreError>> + Send;

    fn latest_appointment_at(
        &self,
        patient_id: i32,
        facility_id: i32,
    ) -> impl Future<Output = Result<Option<Appointment>, StoreError>> + Send;

    fn latest_appointment(
        &self,
        patient_id: i32,
    ) -> impl Future<Output = Result<Option<Appointment>, StoreError>> + Send;
}

/// A scheduling form whose fields all parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    pub facility_id: i32,
    pub scheduled_at: NaiveDateTime,
    pub urgency: String,
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn parse_date(value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%d/%m/%Y"))
        .map_err(|_| ValidationError::InvalidDate(value.to_string()))
}

fn parse_time(value: &str) -> Result<NaiveTime, ValidationError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| ValidationError::InvalidTime(value.to_string()))
}

impl ScheduleRequest {
    /// Checks the form on its own, without touching the store or the geocoder.
    pub fn validate(&self) -> Result<ValidatedRequest, ValidationError> {
        let facility = non_blank(self.facility_id.as_ref()).ok_or(ValidationError::MissingFacility)?;
        let facility_id = facility
            .parse::<i32>()
            .map_err(|_| ValidationError::InvalidFacility(facility.to_string()))?;

        let date = non_blank(self.date.as_ref()).ok_or(ValidationError::MissingDate)?;
        let time = non_blank(self.time.as_ref()).ok_or(ValidationError::MissingTime)?;
        let scheduled_at = parse_date(date)?.and_time(parse_time(time)?);

        Ok(ValidatedRequest {
            facility_id,
            scheduled_at,
            urgency: non_blank(self.urgency.as_ref()).unwrap_or_default().to_string(),
        })
    }
}

pub struct SchedulingService<S> {
    store: S,
}

impl<S> SchedulingService<S>
where
    S: SchedulingStore + FacilityRepository,
{
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn patient(&self, id: i32) -> Result<Patient, SchedulingError> {
        self.store
            .patient(id)
            .await?
            .ok_or(SchedulingError::PatientNotFound(id))
    }

    pub async fn list_pending(&self) -> Result<Vec<Patient>, SchedulingError> {
        Ok(self.store.pending_patients().await?)
    }

    pub async fn list_scheduled(&self) -> Result<Vec<ScheduledPatient>, SchedulingError> {
        Ok(self.store.scheduled_patients().await?)
    }

    /// Validates the form against the nearby candidates of the patient and
    /// writes one appointment. Nothing is written when validation fails.
    ///
    /// Two concurrent requests for the same patient both succeed; appointments
    /// are not deduplicated.
    #[instrument(skip(self, request, nearby))]
    pub async fn schedule_appointment(
        &self,
        patient_id: i32,
        request: &ScheduleRequest,
        nearby: &NearbyFacilities,
    ) -> Result<Appointment, SchedulingError> {
        let validated = request.validate()?;

        if self.store.patient(patient_id).await?.is_none() {
            return Err(SchedulingError::PatientNotFound(patient_id));
        }

        if !nearby.contains(validated.facility_id) {
            return Err(ValidationError::FacilityNotNearby(validated.facility_id).into());
        }

        let appointment = self
            .store
            .insert_appointment(NewAppointment {
                patient_id,
                facility_id: validated.facility_id,
                scheduled_at: validated.scheduled_at,
                urgency: validated.urgency,
            })
            .await?;

        info!(
            name: "appointment.created",
            appointment_id = appointment.id,
            facility_id = appointment.facility_id,
            scheduled_at = %appointment.scheduled_at,
            "appointment scheduled"
        );

        Ok(appointment)
    }

    pub async fn latest_confirmation(
        &self,
        patient_id: i32,
        facility_id: i32,
    ) -> Result<Confirmation, SchedulingError> {
        let not_found = || SchedulingError::ConfirmationNotFound {
            patient_id,
            facility_id,
        };

        let appointment = self
            .store
            .latest_appointment_at(patient_id, facility_id)
            .await?
            .ok_or_else(not_found)?;
        let patient = self.patient(patient_id).await?;
        let facility = self
            .store
            .facility(facility_id)
            .await?
            .ok_or_else(not_found)?;

        Ok(Confirmation {
            patient,
            facility,
            appointment,
        })
    }

    /// Newest appointment of a patient at any facility, with that facility.
    pub async fn latest_appointment(
        &self,
        patient_id: i32,
    ) -> Result<(Appointment, Facility), SchedulingError> {
        let appointment = self
            .store
            .latest_appointment(patient_id)
            .await?
            .ok_or(SchedulingError::AppointmentNotFound(patient_id))?;
        let facility = self
            .store
            .facility(appointment.facility_id)
            .await?
            .ok_or(SchedulingError::AppointmentNotFound(patient_id))?;
        Ok((appointment, facility))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(facility: Option<&str>, date: Option<&str>, time: Option<&str>) -> ScheduleRequest {
        ScheduleRequest {
            facility_id: facility.map(str::to_string),
            date: date.map(str::to_string),
            time: time.map(str::to_string),
            urgency: Some(" alta ".to_string()),
        }
    }

    #[test]
    fn valid_request_combines_date_and_time() {
        let validated = request(Some("12"), Some("2026-10-20"), Some("14:30"))
            .validate()
            .unwrap();
        assert_eq!(validated.facility_id, 12);
        assert_eq!(
            validated.scheduled_at,
            NaiveDate::from_ymd_opt(2026, 10, 20)
                .unwrap()
                .and_hms_opt(14, 30, 0)
                .unwrap()
        );
        assert_eq!(validated.urgency, "alta");
    }

    #[test]
    fn brazilian_date_format_is_accepted() {
        let validated = request(Some("1"), Some("20/10/2026"), Some("08:00:00"))
            .validate()
            .unwrap();
        assert_eq!(validated.scheduled_at.to_string(), "2026-10-20 08:00:00");
    }

    #[test]
    fn missing_or_blank_facility_is_rejected() {
        for facility in [None, Some(""), Some("   ")] {
            assert_eq!(
                request(facility, Some("2026-10-20"), Some("14:30")).validate(),
                Err(ValidationError::MissingFacility)
            );
        }
        assert_eq!(
            request(Some("abc"), Some("2026-10-20"), Some("14:30")).validate(),
            Err(ValidationError::InvalidFacility("abc".to_string()))
        );
    }

    #[test]
    fn date_and_time_are_required() {
        assert_eq!(
            request(Some("1"), None, Some("14:30")).validate(),
            Err(ValidationError::MissingDate)
        );
        assert_eq!(
            request(Some("1"), Some("2026-10-20"), Some(" ")).validate(),
            Err(ValidationError::MissingTime)
        );
        assert_eq!(
            request(Some("1"), Some("2026-02-30"), Some("14:30")).validate(),
            Err(ValidationError::InvalidDate("2026-02-30".to_string()))
        );
        assert_eq!(
            request(Some("1"), Some("2026-10-20"), Some("25:00")).validate(),
            Err(ValidationError::InvalidTime("25:00".to_string()))
        );
    }

    #[test]
    fn missing_urgency_defaults_to_empty() {
        let mut req = request(Some("1"), Some("2026-10-20"), Some("14:30"));
        req.urgency = None;
        assert_eq!(req.validate().unwrap().urgency, "");
    }

    #[test]
    fn legacy_form_field_names_are_accepted() {
        let req: ScheduleRequest = serde_json::from_str(
            r#"{"ubs": "4", "data": "20/10/2026", "hora": "10:15", "urgencia": "baixa"}"#,
        )
        .unwrap();
        let validated = req.validate().unwrap();
        assert_eq!(validated.facility_id, 4);
        assert_eq!(validated.scheduled_at.to_string(), "2026-10-20 10:15:00");
        assert_eq!(validated.urgency, "baixa");
    }

    #[test]
    fn numeric_facility_id_from_json_is_accepted() {
        let req: ScheduleRequest = serde_json::from_str(
            r#"{"facilityId": 1, "date": "2026-10-20", "time": "09:30"}"#,
        )
        .unwrap();
        assert_eq!(req.facility_id.as_deref(), Some("1"));
        assert_eq!(req.validate().unwrap().facility_id, 1);
    }

    #[test]
    fn null_or_absent_facility_id_reaches_validation() {
        for body in [
            r#"{"facilityId": null, "date": "2026-10-20", "time": "09:30"}"#,
            r#"{"date": "2026-10-20", "time": "09:30"}"#,
        ] {
            let req: ScheduleRequest = serde_json::from_str(body).unwrap();
            assert_eq!(req.validate(), Err(ValidationError::MissingFacility));
        }
    }
}
