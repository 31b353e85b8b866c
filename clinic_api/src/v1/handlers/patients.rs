use crate::state::{Locator, Scheduling};
use crate::v1::error::ApiError;
use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use clinic_core::locator::NearbyFacilities;
use clinic_core::scheduling::{Patient, ScheduledPatient};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PatientsResponse {
    pending: Vec<Patient>,
    scheduled: Vec<ScheduledPatient>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PatientDetailResponse {
    patient: Patient,
    #[serde(flatten)]
    nearby: NearbyFacilities,
}

/// Patients still waiting for an appointment, and every booked appointment.
pub async fn list_patients(
    State(scheduling): State<Arc<Scheduling>>,
) -> Result<impl IntoResponse, ApiError> {
    let pending = scheduling.list_pending().await?;
    let scheduled = scheduling.list_scheduled().await?;
    Ok(Json(PatientsResponse { pending, scheduled }))
}

/// The patient together with the eligible health units around their address.
pub async fn get_patient(
    State(scheduling): State<Arc<Scheduling>>,
    State(locator): State<Arc<Locator>>,
    Path(patient_id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let patient = scheduling.patient(patient_id).await?;
    let nearby = locator.nearby(&patient.address).await?;
    Ok(Json(PatientDetailResponse { patient, nearby }))
}
