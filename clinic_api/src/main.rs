mod state;
mod v1;

use crate::state::AppState;
use crate::v1::db::{PgStore, queries};
use axum::http::StatusCode;
use axum::{Router, routing::get};
use clinic_core::facility::EligibilityRules;
use clinic_core::locator::FacilityLocator;
use clinic_core::ranking::ProximityRanker;
use clinic_core::scheduling::SchedulingService;
use clinic_core::triage::{DEFAULT_SYSTEM_PROMPT, TriageService};
use shared::gemini::GeminiClient;
use shared::nominatim::NominatimClient;
use shared::{Config, init_tracing, initialize_db, load_config};
use sqlx::{Pool, Postgres};
use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_sessions::cookie::time;
use tower_sessions::{ExpiredDeletion, Expiry, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::PostgresStore;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const DOCTOR_PASSWORD_ENV: &str = "CLINIC_DOCTOR_PASSWORD";
const LANGUAGE_MODEL_TIMEOUT: Duration = Duration::from_secs(30);
const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    init_tracing(&config.logging)?;

    let pool = initialize_db(&config.postgres, true).await?;

    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        None => serve(config, pool).await,
        Some("add-doctor") => {
            let (Some(login), display_name) = (args.next(), args.collect::<Vec<_>>().join(" "))
            else {
                return Err("usage: clinic_api add-doctor <login> <display name>".into());
            };
            add_doctor(&pool, &login, &display_name).await
        }
        Some(other) => Err(format!("unknown command {other:?}").into()),
    }
}

async fn add_doctor(
    pool: &Pool<Postgres>,
    login: &str,
    display_name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let password = std::env::var(DOCTOR_PASSWORD_ENV)
        .map_err(|_| format!("{DOCTOR_PASSWORD_ENV} must hold the new doctor's password"))?;
    if password.is_empty() || display_name.trim().is_empty() {
        return Err("password and display name must not be empty".into());
    }

    let hashed = v1::password::hash_password(&password);
    let id = queries::upsert_doctor(pool, login, display_name.trim(), &hashed.salt, &hashed.hash)
        .await?;
    info!(name: "doctor.saved", doctor_id = id, login, "doctor account saved");
    Ok(())
}

fn build_state(config: &Config, pool: Pool<Postgres>) -> Result<AppState, Box<dyn std::error::Error>> {
    let store = PgStore::new(pool);

    let geocoder = NominatimClient::new(
        &config.geocoding.base_url,
        &config.geocoding.user_agent,
        Duration::from_secs(config.geocoding.timeout_seconds),
    )?;
    let locator = FacilityLocator::new(
        geocoder,
        store.clone(),
        EligibilityRules::new(&config.proximity.markers),
        ProximityRanker::new(config.proximity.radius_km),
    );

    let triage = match &config.triage {
        Some(triage_config) => {
            let client = reqwest::Client::builder()
                .timeout(LANGUAGE_MODEL_TIMEOUT)
                .build()?;
            let model = GeminiClient::new_with_client(
                client,
                &triage_config.base_url,
                &triage_config.model,
                &triage_config.api_key,
            );
            let max_idle = humantime::parse_duration(&triage_config.max_idle)?;
            info!(
                name: "triage.enabled",
                model = model.model(),
                max_idle = %humantime::format_duration(max_idle),
                "triage assistant enabled"
            );
            let system_prompt = triage_config
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());
            Some(Arc::new(TriageService::new(
                model,
                store.clone(),
                system_prompt,
                max_idle,
            )))
        }
        None => {
            warn!(name: "triage.disabled", "no [triage] configuration, triage routes will answer 503");
            None
        }
    };

    Ok(AppState {
        db: store.clone(),
        locator: Arc::new(locator),
        scheduling: Arc::new(SchedulingService::new(store)),
        triage,
    })
}

fn app<S>(state: AppState, session_layer: SessionManagerLayer<S>) -> Router
where
    S: SessionStore + Clone,
{
    Router::new()
        .route("/health", get(|| async { StatusCode::OK }))
        .nest("/v1", v1::router(state.clone()))
        .with_state(state)
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

async fn serve(config: Config, pool: Pool<Postgres>) -> Result<(), Box<dyn std::error::Error>> {
    let session_store = PostgresStore::new(pool.clone());
    session_store.migrate().await?;
    let shutdown = CancellationToken::new();
    let cleanup_task = tokio::task::spawn(run_session_cleanup(
        session_store
            .clone()
            .continuously_delete_expired(SESSION_CLEANUP_INTERVAL),
        shutdown.clone(),
    ));
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_expiry(Expiry::OnInactivity(time::Duration::hours(8)));

    let state = build_state(&config, pool)?;

    let router = app(state, session_layer);

    let listen_addr = &config.server.listen_addr;
    info!(name: "server.starting", "starting server at {listen_addr}");
    let listener = tokio::net::TcpListener::bind(listen_addr.as_str()).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shared::shutdown_listener(Some(shutdown)))
        .await?;

    cleanup_task.await?;
    Ok(())
}

/// Drives the expired-session sweep until `shutdown` is cancelled.
async fn run_session_cleanup<F, E>(cleanup: F, shutdown: CancellationToken)
where
    F: Future<Output = Result<(), E>>,
    E: Debug,
{
    match shutdown.run_until_cancelled(cleanup).await {
        None => info!(name: "sessions.cleanup.stopped", "session cleanup stopped"),
        Some(Ok(())) => {}
        Some(Err(e)) => warn!(name: "sessions.cleanup.failed", error = ?e, "session cleanup failed"),
    }
}
