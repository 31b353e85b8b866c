use serde::{Deserialize, Serialize};
use tower_sessions::Session;

pub mod constants {
    // The key used in the session to store the signed-in doctor
    pub const SESSION_DOCTOR_KEY: &str = "doctor";
    pub const LOGIN_PATH: &str = "/v1/auth/login";
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthDoctor {
    pub id: i32,
    pub login: String,
    pub display_name: String,
}

pub async fn get_doctor(session: &Session) -> Result<Option<AuthDoctor>, tower_sessions::session::Error> {
    session.get(constants::SESSION_DOCTOR_KEY).await
}
