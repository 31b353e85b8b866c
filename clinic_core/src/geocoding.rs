use crate::geo::Coordinate;
use shared::nominatim::NominatimClient;
use std::future::Future;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("geocoding request timed out")]
    Timeout,
    #[error(transparent)]
    Http(reqwest::Error),
    #[error("geocoder returned unparseable coordinates ({latitude}, {longitude})")]
    InvalidCoordinates { latitude: String, longitude: String },
}

impl From<reqwest::Error> for GeocodeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(e)
        }
    }
}

/// Resolves a free-text address. `Ok(None)` means the service found nothing,
/// which callers must treat as a normal outcome.
pub trait Geocoder: Send + Sync {
    fn geocode(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<Option<Coordinate>, GeocodeError>> + Send;
}

impl Geocoder for NominatimClient {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinate>, GeocodeError> {
        let address = address.trim();
        if address.is_empty() {
            return Ok(None);
        }

        let Some(place) = self.search(address).await? else {
            return Ok(None);
        };

        Coordinate::parse(&place.lat, &place.lon)
            .map(Some)
            .ok_or(GeocodeError::InvalidCoordinates {
                latitude: place.lat,
                longitude: place.lon,
            })
    }
}
