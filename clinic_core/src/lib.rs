pub mod certificate;
pub mod error;
pub mod facility;
pub mod geo;
pub mod geocoding;
pub mod locator;
pub mod memory;
pub mod ranking;
pub mod scheduling;
pub mod triage;

pub use error::StoreError;
