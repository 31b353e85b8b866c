use crate::v1::db::PgStore;
use axum::extract::FromRef;
use clinic_core::locator::FacilityLocator;
use clinic_core::scheduling::SchedulingService;
use clinic_core::triage::TriageService;
use shared::gemini::GeminiClient;
use shared::nominatim::NominatimClient;
use std::sync::Arc;

pub type Locator = FacilityLocator<NominatimClient, PgStore>;
pub type Scheduling = SchedulingService<PgStore>;
pub type Triage = TriageService<GeminiClient, PgStore>;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db: PgStore,
    pub locator: Arc<Locator>,
    pub scheduling: Arc<Scheduling>,
    /// `None` when no language model is configured.
    pub triage: Option<Arc<Triage>>,
}
