use crate::state::AppState;
use crate::v1::handlers::appointments::{get_confirmation, schedule_appointment};
use crate::v1::handlers::auth::{login, login_form, logout, me};
use crate::v1::handlers::certificates::issue_certificate;
use crate::v1::handlers::patients::{get_patient, list_patients};
use crate::v1::handlers::triage::{get_history, send_message, start_conversation};
use crate::v1::middleware::auth::require_auth;
use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};

pub fn router(state: AppState) -> Router<AppState> {
    Router::<AppState>::new()
        .route("/auth/login", get(login_form).post(login))
        .route("/auth/logout", get(logout))
        .route("/auth/me", get(me))
        .route("/triage/conversations", post(start_conversation))
        .route("/triage/conversations/{id}/messages", post(send_message))
        .merge(protected_routes(&state))
}

pub fn protected_routes(state: &AppState) -> Router<AppState> {
    Router::<AppState>::new()
        .route("/patients", get(list_patients))
        .route("/patients/{id}", get(get_patient))
        .route("/patients/{id}/appointments", post(schedule_appointment))
        .route("/patients/{id}/certificate", post(issue_certificate))
        .route(
            "/confirmations/{patient_id}/{facility_id}",
            get(get_confirmation),
        )
        .route("/triage/history", get(get_history))
        .route_layer(from_fn_with_state(state.clone(), require_auth))
}
