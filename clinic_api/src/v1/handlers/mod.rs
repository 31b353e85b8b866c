pub mod appointments;
pub mod auth;
pub mod certificates;
pub mod patients;
pub mod triage;
