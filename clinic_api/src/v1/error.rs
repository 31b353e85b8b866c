use crate::v1::session::constants::LOGIN_PATH;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use clinic_core::StoreError;
use clinic_core::certificate::CertificateError;
use clinic_core::scheduling::SchedulingError;
use clinic_core::triage::TriageError;
use serde::{Serialize, Serializer};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorMessage {
    #[serde(serialize_with = "serialize_status")]
    pub status_code: StatusCode,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Session(#[from] tower_sessions::session::Error),
    #[error("authentication required")]
    AuthRequired,
    #[error("invalid login or password")]
    InvalidCredentials,
    #[error(transparent)]
    Scheduling(#[from] SchedulingError),
    #[error(transparent)]
    Triage(#[from] TriageError),
    #[error(transparent)]
    Certificate(#[from] CertificateError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Sql(#[from] sqlx::Error),
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

fn internal_error() -> Response {
    ErrorMessage::from((StatusCode::INTERNAL_SERVER_ERROR, "internal server error")).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Session(e) => {
                warn!(error = ?e, "session error");
                internal_error()
            }
            ApiError::AuthRequired => Redirect::to(LOGIN_PATH).into_response(),
            ApiError::InvalidCredentials => {
                warn!(name: "auth.login.rejected", "invalid login attempt");
                ErrorMessage::from((StatusCode::UNAUTHORIZED, "invalid login or password"))
                    .into_response()
            }
            ApiError::Scheduling(e) => match e {
                SchedulingError::Validation(e) => {
                    ErrorMessage::from((StatusCode::BAD_REQUEST, e.to_string())).into_response()
                }
                SchedulingError::PatientNotFound(_)
                | SchedulingError::ConfirmationNotFound { .. }
                | SchedulingError::AppointmentNotFound(_) => {
                    ErrorMessage::from((StatusCode::NOT_FOUND, e.to_string())).into_response()
                }
                SchedulingError::Store(e) => {
                    warn!(error = ?e, "store error while scheduling");
                    internal_error()
                }
            },
            ApiError::Triage(e) => match e {
                TriageError::EmptyMessage => {
                    ErrorMessage::from((StatusCode::BAD_REQUEST, e.to_string())).into_response()
                }
                TriageError::ConversationNotFound(_) => {
                    ErrorMessage::from((StatusCode::NOT_FOUND, e.to_string())).into_response()
                }
                TriageError::LanguageModel(e) => {
                    warn!(error = ?e, "language model request failed");
                    ErrorMessage::from((
                        StatusCode::BAD_GATEWAY,
                        "the assistant could not answer, please try again",
                    ))
                    .into_response()
                }
                TriageError::Store(e) => {
                    warn!(error = ?e, "store error during triage");
                    internal_error()
                }
            },
            ApiError::Certificate(e) => match e {
                CertificateError::EmptyDescription => {
                    ErrorMessage::from((StatusCode::BAD_REQUEST, e.to_string())).into_response()
                }
                CertificateError::Render(e) => {
                    warn!(error = e, "certificate rendering failed");
                    internal_error()
                }
            },
            ApiError::Store(e) => {
                warn!(error = ?e, "store error");
                internal_error()
            }
            ApiError::Sql(e) => {
                warn!(error = ?e, "sql error");
                internal_error()
            }
            ApiError::ServiceUnavailable(e) => {
                warn!(error = e, "service unavailable");
                ErrorMessage::from((StatusCode::SERVICE_UNAVAILABLE, e)).into_response()
            }
        }
    }
}

fn serialize_status<S>(value: &StatusCode, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u16(value.as_u16())
}

impl From<(StatusCode, String)> for ErrorMessage {
    fn from((status_code, message): (StatusCode, String)) -> Self {
        Self {
            status_code,
            message,
        }
    }
}

impl From<(StatusCode, &str)> for ErrorMessage {
    fn from((status_code, message): (StatusCode, &str)) -> Self {
        Self {
            status_code,
            message: message.into(),
        }
    }
}

impl IntoResponse for ErrorMessage {
    fn into_response(self) -> Response {
        (self.status_code, Json(self)).into_response()
    }
}
