use axum::extract::Request;
use axum::{middleware::Next, response::IntoResponse};
use tower_sessions::Session;

use crate::v1::error::ApiError;
use crate::v1::session;

pub async fn require_auth(
    session: Session,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    let Some(doctor) = session::get_doctor(&session).await? else {
        return Err(ApiError::AuthRequired);
    };

    req.extensions_mut().insert(doctor);
    Ok(next.run(req).await)
}
