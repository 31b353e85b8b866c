use crate::error::StoreError;
use crate::geo::Coordinate;
use serde::Serialize;
use std::collections::HashSet;
use std::future::Future;

/// A public health unit as stored in the reference table.
///
/// Coordinates are kept verbatim because the imported data is not clean;
/// use [`Facility::coordinate`] to get a parsed value.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Facility {
    pub id: i32,
    pub name: String,
    pub address: String,
    pub latitude: String,
    pub longitude: String,
}

impl Facility {
    pub fn coordinate(&self) -> Option<Coordinate> {
        Coordinate::parse(&self.latitude, &self.longitude)
    }
}

/// Read-only access to the facility reference data.
pub trait FacilityRepository: Send + Sync {
    fn all_facilities(&self) -> impl Future<Output = Result<Vec<Facility>, StoreError>> + Send;

    fn facility(&self, id: i32)
    -> impl Future<Output = Result<Option<Facility>, StoreError>> + Send;
}

/// Ordered list of name markers that make a facility eligible, e.g. `UBS`, `AMA`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibilityRules {
    markers: Vec<String>,
}

impl Default for EligibilityRules {
    fn default() -> Self {
        Self::new(["UBS", "AMA"])
    }
}

impl EligibilityRules {
    /// Blank markers are dropped; matching is case-insensitive.
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            markers: markers
                .into_iter()
                .map(|m| m.as_ref().trim().to_uppercase())
                .filter(|m| !m.is_empty())
                .collect(),
        }
    }

    pub fn markers(&self) -> &[String] {
        &self.markers
    }

    pub fn matches(&self, name: &str) -> bool {
        let name = name.to_uppercase();
        self.markers.iter().any(|m| name.contains(m.as_str()))
    }

    /// Keeps facilities whose name carries a marker, dropping later entries that
    /// repeat an already seen `(name, address)` pair. Input order is preserved.
    pub fn select_eligible<I>(&self, facilities: I) -> Vec<Facility>
    where
        I: IntoIterator<Item = Facility>,
    {
        let mut seen: HashSet<(String, String)> = HashSet::new();
        facilities
            .into_iter()
            .filter(|f| self.matches(&f.name))
            .filter(|f| seen.insert((f.name.clone(), f.address.clone())))
            .collect()
    }
}
