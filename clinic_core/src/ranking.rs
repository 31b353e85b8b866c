use crate::facility::Facility;
use crate::geo::{Coordinate, distance_km};
use serde::Serialize;
use tracing::debug;

pub const DEFAULT_RADIUS_KM: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedFacility {
    pub facility: Facility,
    pub distance_km: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityRanker {
    radius_km: f64,
}

impl Default for ProximityRanker {
    fn default() -> Self {
        Self::new(DEFAULT_RADIUS_KM)
    }
}

impl ProximityRanker {
    pub const fn new(radius_km: f64) -> Self {
        Self { radius_km }
    }

    pub const fn radius_km(&self) -> f64 {
        self.radius_km
    }

    /// Facilities within the radius of `origin`, nearest first. Ties are broken by id.
    /// Facilities whose stored coordinates do not parse are skipped.
    pub fn rank<I>(&self, origin: Coordinate, facilities: I) -> Vec<RankedFacility>
    where
        I: IntoIterator<Item = Facility>,
    {
        let mut ranked: Vec<RankedFacility> = facilities
            .into_iter()
            .filter_map(|facility| {
                let Some(coordinate) = facility.coordinate() else {
                    debug!(
                        facility_id = facility.id,
                        latitude = facility.latitude,
                        longitude = facility.longitude,
                        "skipping facility with malformed coordinates"
                    );
                    return None;
                };
                let distance_km = distance_km(origin, coordinate);
                (distance_km <= self.radius_km).then_some(RankedFacility {
                    facility,
                    distance_km,
                })
            })
            .collect();

        ranked.sort_by(|a, b| {
            a.distance_km
                .total_cmp(&b.distance_km)
                .then(a.facility.id.cmp(&b.facility.id))
        });
        ranked
    }
}
