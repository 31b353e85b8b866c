use chrono::NaiveDateTime;
use clinic_core::facility::Facility;
use clinic_core::scheduling::{Appointment, Patient, ScheduledPatient};
use clinic_core::triage::LogEntry;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

#[derive(sqlx::FromRow)]
pub struct DoctorRecord {
    pub id: i32,
    pub login: String,
    pub display_name: String,
    pub password_salt: Vec<u8>,
    pub password_hash: Vec<u8>,
}

pub async fn get_all_facilities(pool: &Pool<Postgres>) -> Result<Vec<Facility>, sqlx::Error> {
    sqlx::query_as::<_, Facility>(
        r"
        SELECT id, name, address, latitude, longitude
        FROM facilities
        ORDER BY id
        ",
    )
    .fetch_all(pool)
    .await
}

pub async fn get_facility(pool: &Pool<Postgres>, id: i32) -> Result<Option<Facility>, sqlx::Error> {
    sqlx::query_as::<_, Facility>(
        r"
        SELECT id, name, address, latitude, longitude
        FROM facilities
        WHERE id = $1
        ",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn get_patient(pool: &Pool<Postgres>, id: i32) -> Result<Option<Patient>, sqlx::Error> {
    sqlx::query_as::<_, Patient>(
        r"
        SELECT id, name, age, address, phone, symptoms, registered_at
        FROM patients
        WHERE id = $1
        ",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn get_pending_patients(pool: &Pool<Postgres>) -> Result<Vec<Patient>, sqlx::Error> {
    sqlx::query_as::<_, Patient>(
        r"
        SELECT p.id, p.name, p.age, p.address, p.phone, p.symptoms, p.registered_at
        FROM patients p
        WHERE NOT EXISTS (SELECT 1 FROM appointments a WHERE a.patient_id = p.id)
        ORDER BY p.id
        ",
    )
    .fetch_all(pool)
    .await
}

pub async fn get_scheduled_patients(
    pool: &Pool<Postgres>,
) -> Result<Vec<ScheduledPatient>, sqlx::Error> {
    sqlx::query_as::<_, ScheduledPatient>(
        r"
        SELECT
            p.id, p.name, p.age, p.address, p.phone, p.symptoms, p.registered_at,
            a.id AS appointment_id,
            a.scheduled_at,
            a.urgency,
            f.name AS facility_name
        FROM appointments a
        JOIN patients p ON p.id = a.patient_id
        JOIN facilities f ON f.id = a.facility_id
        ORDER BY a.scheduled_at DESC, a.id DESC
        ",
    )
    .fetch_all(pool)
    .await
}

pub async fn insert_appointment(
    pool: &Pool<Postgres>,
    patient_id: i32,
    facility_id: i32,
    scheduled_at: NaiveDateTime,
    urgency: &str,
) -> Result<Appointment, sqlx::Error> {
    sqlx::query_as::<_, Appointment>(
        r"
        INSERT INTO appointments (patient_id, facility_id, scheduled_at, urgency)
        VALUES ($1, $2, $3, $4)
        RETURNING id, patient_id, facility_id, scheduled_at, urgency, created_at
        ",
    )
    .bind(patient_id)
    .bind(facility_id)
    .bind(scheduled_at)
    .bind(urgency)
    .fetch_one(pool)
    .await
}

/// Most recent appointment by scheduled time; a `None` facility matches any.
pub async fn get_latest_appointment(
    pool: &Pool<Postgres>,
    patient_id: i32,
    facility_id: Option<i32>,
) -> Result<Option<Appointment>, sqlx::Error> {
    sqlx::query_as::<_, Appointment>(
        r"
        SELECT id, patient_id, facility_id, scheduled_at, urgency, created_at
        FROM appointments
        WHERE patient_id = $1
          AND ($2::INT IS NULL OR facility_id = $2)
        ORDER BY scheduled_at DESC, id DESC
        LIMIT 1
        ",
    )
    .bind(patient_id)
    .bind(facility_id)
    .fetch_optional(pool)
    .await
}

pub async fn insert_patient(
    pool: &Pool<Postgres>,
    name: &str,
    age: &str,
    address: &str,
    phone: Option<&str>,
    symptoms: Option<&str>,
) -> Result<Patient, sqlx::Error> {
    sqlx::query_as::<_, Patient>(
        r"
        INSERT INTO patients (name, age, address, phone, symptoms)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, name, age, address, phone, symptoms, registered_at
        ",
    )
    .bind(name)
    .bind(age)
    .bind(address)
    .bind(phone)
    .bind(symptoms)
    .fetch_one(pool)
    .await
}

pub async fn insert_log_entry(
    pool: &Pool<Postgres>,
    conversation_id: Uuid,
    author: &str,
    message: &str,
) -> Result<LogEntry, sqlx::Error> {
    sqlx::query_as::<_, LogEntry>(
        r"
        INSERT INTO conversation_log (conversation_id, author, message)
        VALUES ($1, $2, $3)
        RETURNING id, conversation_id, logged_at, author, message
        ",
    )
    .bind(conversation_id)
    .bind(author)
    .bind(message)
    .fetch_one(pool)
    .await
}

pub async fn get_log_entries(
    pool: &Pool<Postgres>,
    conversation_id: Option<Uuid>,
) -> Result<Vec<LogEntry>, sqlx::Error> {
    sqlx::query_as::<_, LogEntry>(
        r"
        SELECT id, conversation_id, logged_at, author, message
        FROM conversation_log
        WHERE $1::UUID IS NULL OR conversation_id = $1
        ORDER BY id
        ",
    )
    .bind(conversation_id)
    .fetch_all(pool)
    .await
}

pub async fn get_doctor_by_login(
    pool: &Pool<Postgres>,
    login: &str,
) -> Result<Option<DoctorRecord>, sqlx::Error> {
    sqlx::query_as::<_, DoctorRecord>(
        r"
        SELECT id, login, display_name, password_salt, password_hash
        FROM doctors
        WHERE login = $1
        ",
    )
    .bind(login)
    .fetch_optional(pool)
    .await
}

/// Creates the doctor or replaces the name and password of an existing login.
pub async fn upsert_doctor(
    pool: &Pool<Postgres>,
    login: &str,
    display_name: &str,
    password_salt: &[u8],
    password_hash: &[u8],
) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar::<_, i32>(
        r"
        INSERT INTO doctors (login, display_name, password_salt, password_hash)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (login) DO UPDATE
        SET display_name = EXCLUDED.display_name,
            password_salt = EXCLUDED.password_salt,
            password_hash = EXCLUDED.password_hash
        RETURNING id
        ",
    )
    .bind(login)
    .bind(display_name)
    .bind(password_salt)
    .bind(password_hash)
    .fetch_one(pool)
    .await
}
