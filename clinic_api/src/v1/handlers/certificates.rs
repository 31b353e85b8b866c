use crate::state::Scheduling;
use crate::v1::error::ApiError;
use crate::v1::extractors::form_or_json::FormOrJson;
use crate::v1::session::AuthDoctor;
use axum::Extension;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use clinic_core::certificate::{CertificateRequest, render_certificate};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

#[derive(Deserialize)]
pub struct CertificateForm {
    #[serde(default, alias = "descricao")]
    description: String,
}

/// Renders a PDF certificate for the patient's latest appointment, signed by
/// the doctor of the current session.
pub async fn issue_certificate(
    State(scheduling): State<Arc<Scheduling>>,
    Extension(doctor): Extension<AuthDoctor>,
    Path(patient_id): Path<i32>,
    FormOrJson(form): FormOrJson<CertificateForm>,
) -> Result<impl IntoResponse, ApiError> {
    let patient = scheduling.patient(patient_id).await?;
    let (appointment, facility) = scheduling.latest_appointment(patient_id).await?;

    let pdf = render_certificate(&CertificateRequest {
        patient: &patient,
        appointment: &appointment,
        facility_name: &facility.name,
        description: &form.description,
        signer: &doctor.display_name,
    })?;
    info!(name: "certificate.issued", patient_id, doctor_id = doctor.id, "certificate issued");

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"atestado_{patient_id}.pdf\""),
            ),
        ],
        pdf,
    ))
}
