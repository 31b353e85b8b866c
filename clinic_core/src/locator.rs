use crate::error::StoreError;
use crate::facility::{EligibilityRules, FacilityRepository};
use crate::geo::Coordinate;
use crate::geocoding::Geocoder;
use crate::ranking::{ProximityRanker, RankedFacility};
use serde::Serialize;
use tracing::{info, instrument, warn};

pub const ADDRESS_NOT_FOUND_NOTICE: &str = "could not locate the patient's address";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyFacilities {
    pub patient_coordinate: Option<Coordinate>,
    pub candidates: Vec<RankedFacility>,
    pub notice: Option<String>,
}

impl NearbyFacilities {
    fn address_not_found() -> Self {
        Self {
            patient_coordinate: None,
            candidates: Vec::new(),
            notice: Some(ADDRESS_NOT_FOUND_NOTICE.to_string()),
        }
    }

    pub fn contains(&self, facility_id: i32) -> bool {
        self.candidates.iter().any(|c| c.facility.id == facility_id)
    }
}

/// Geocodes an address and ranks the eligible facilities around it.
pub struct FacilityLocator<G, R> {
    geocoder: G,
    facilities: R,
    rules: EligibilityRules,
    ranker: ProximityRanker,
}

impl<G, R> FacilityLocator<G, R>
where
    G: Geocoder,
    R: FacilityRepository,
{
    pub fn new(geocoder: G, facilities: R, rules: EligibilityRules, ranker: ProximityRanker) -> Self {
        Self {
            geocoder,
            facilities,
            rules,
            ranker,
        }
    }

    /// Resolves `address` to a coordinate. Geocoder failures, timeouts included,
    /// are logged and reported as "not found".
    pub async fn locate_address(&self, address: &str) -> Option<Coordinate> {
        match self.geocoder.geocode(address).await {
            Ok(coordinate) => coordinate,
            Err(e) => {
                warn!(name: "geocode.failed", error = ?e, "geocoding failed, treating address as not found");
                None
            }
        }
    }

    #[instrument(skip_all)]
    pub async fn nearby(&self, address: &str) -> Result<NearbyFacilities, StoreError> {
        let Some(origin) = self.locate_address(address).await else {
            info!(name: "geocode.not_found", "address could not be located");
            return Ok(NearbyFacilities::address_not_found());
        };

        let facilities = self.facilities.all_facilities().await?;
        let total = facilities.len();
        let eligible = self.rules.select_eligible(facilities);
        let eligible_count = eligible.len();
        let candidates = self.ranker.rank(origin, eligible);

        info!(
            name: "facilities.ranked",
            total,
            eligible = eligible_count,
            in_range = candidates.len(),
            radius_km = self.ranker.radius_km(),
            "ranked nearby facilities"
        );

        Ok(NearbyFacilities {
            patient_coordinate: Some(origin),
            candidates,
            notice: None,
        })
    }
}
