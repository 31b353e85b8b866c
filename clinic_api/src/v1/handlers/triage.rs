use crate::state::Triage;
use crate::v1::error::ApiError;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct MessageBody {
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
pub struct HistoryParams {
    conversation: Option<Uuid>,
}

fn configured(triage: Option<Arc<Triage>>) -> Result<Arc<Triage>, ApiError> {
    triage.ok_or_else(|| ApiError::ServiceUnavailable("triage assistant is not configured".into()))
}

pub async fn start_conversation(
    State(triage): State<Option<Arc<Triage>>>,
) -> Result<impl IntoResponse, ApiError> {
    let started = configured(triage)?.start().await?;
    Ok((StatusCode::CREATED, Json(started)))
}

pub async fn send_message(
    State(triage): State<Option<Arc<Triage>>>,
    Path(conversation_id): Path<Uuid>,
    Json(body): Json<MessageBody>,
) -> Result<impl IntoResponse, ApiError> {
    let reply = configured(triage)?
        .send(conversation_id, &body.message)
        .await?;
    Ok(Json(reply))
}

pub async fn get_history(
    State(triage): State<Option<Arc<Triage>>>,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, ApiError> {
    let entries = configured(triage)?.history(params.conversation).await?;
    Ok(Json(entries))
}
