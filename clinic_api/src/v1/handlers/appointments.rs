use crate::state::{Locator, Scheduling};
use crate::v1::error::ApiError;
use crate::v1::extractors::form_or_json::FormOrJson;
use axum::Json;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect};
use clinic_core::facility::FacilityRepository;
use clinic_core::geo::Coordinate;
use clinic_core::geocoding::Geocoder;
use clinic_core::locator::FacilityLocator;
use clinic_core::scheduling::{
    Confirmation, ScheduleRequest, SchedulingError, SchedulingService, SchedulingStore,
};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfirmationResponse {
    #[serde(flatten)]
    confirmation: Confirmation,
    patient_coordinate: Option<Coordinate>,
}

pub fn confirmation_path(patient_id: i32, facility_id: i32) -> String {
    format!("/v1/confirmations/{patient_id}/{facility_id}")
}

/// Books an appointment at one of the patient's nearby units, then redirects
/// to its confirmation.
pub async fn schedule_appointment(
    State(scheduling): State<Arc<Scheduling>>,
    State(locator): State<Arc<Locator>>,
    Path(patient_id): Path<i32>,
    FormOrJson(request): FormOrJson<ScheduleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    book(&scheduling, &locator, patient_id, &request).await
}

/// The form is checked before the patient's address is geocoded.
async fn book<S, G>(
    scheduling: &SchedulingService<S>,
    locator: &FacilityLocator<G, S>,
    patient_id: i32,
    request: &ScheduleRequest,
) -> Result<Redirect, ApiError>
where
    S: SchedulingStore + FacilityRepository,
    G: Geocoder,
{
    request.validate().map_err(SchedulingError::from)?;
    let patient = scheduling.patient(patient_id).await?;
    let nearby = locator.nearby(&patient.address).await?;
    let appointment = scheduling
        .schedule_appointment(patient_id, request, &nearby)
        .await?;

    Ok(Redirect::to(&confirmation_path(
        patient_id,
        appointment.facility_id,
    )))
}

pub async fn get_confirmation(
    State(scheduling): State<Arc<Scheduling>>,
    State(locator): State<Arc<Locator>>,
    Path((patient_id, facility_id)): Path<(i32, i32)>,
) -> Result<impl IntoResponse, ApiError> {
    let confirmation = scheduling
        .latest_confirmation(patient_id, facility_id)
        .await?;
    let patient_coordinate = locator.locate_address(&confirmation.patient.address).await;

    Ok(Json(ConfirmationResponse {
        confirmation,
        patient_coordinate,
    }))
}
