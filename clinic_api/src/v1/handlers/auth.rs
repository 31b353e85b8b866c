use crate::v1::db::PgStore;
use crate::v1::db::queries;
use crate::v1::error::ApiError;
use crate::v1::extractors::form_or_json::FormOrJson;
use crate::v1::password::verify_password;
use crate::v1::session::constants::{LOGIN_PATH, SESSION_DOCTOR_KEY};
use crate::v1::session::{self, AuthDoctor};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::info;

pub const AFTER_LOGIN_PATH: &str = "/v1/patients";

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(alias = "usuario")]
    login: String,
    #[serde(alias = "senha")]
    password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginDescription {
    method: &'static str,
    action: &'static str,
    fields: [&'static str; 2],
}

/// Describes the form `POST /auth/login` expects.
pub async fn login_form() -> impl IntoResponse {
    Json(LoginDescription {
        method: "POST",
        action: LOGIN_PATH,
        fields: ["login", "password"],
    })
}

pub async fn login(
    State(db): State<PgStore>,
    session: Session,
    FormOrJson(form): FormOrJson<LoginForm>,
) -> Result<impl IntoResponse, ApiError> {
    let record = queries::get_doctor_by_login(&db.pool, form.login.trim()).await?;
    let Some(record) = record else {
        return Err(ApiError::InvalidCredentials);
    };
    if !verify_password(&form.password, &record.password_salt, &record.password_hash) {
        return Err(ApiError::InvalidCredentials);
    }

    session.cycle_id().await?;
    session
        .insert(
            SESSION_DOCTOR_KEY,
            AuthDoctor {
                id: record.id,
                login: record.login,
                display_name: record.display_name,
            },
        )
        .await?;
    info!(name: "auth.login", doctor_id = record.id, "doctor signed in");

    Ok(Redirect::to(AFTER_LOGIN_PATH))
}

pub async fn logout(session: Session) -> Result<impl IntoResponse, ApiError> {
    session.delete().await?;
    Ok(Redirect::to(LOGIN_PATH))
}

pub async fn me(session: Session) -> Result<impl IntoResponse, ApiError> {
    Ok(match session::get_doctor(&session).await? {
        Some(doctor) => (StatusCode::OK, Json(Some(doctor))).into_response(),
        None => (StatusCode::UNAUTHORIZED, Json(None::<AuthDoctor>)).into_response(),
    })
}
