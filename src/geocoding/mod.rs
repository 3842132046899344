mod cache;
mod debounce;
#[cfg(test)]
mod fake;
mod nominatim;
mod resolver;

pub use cache::{AddressCache, ResolvedAddress};
pub use debounce::DebouncedAddressResolver;
pub use nominatim::NominatimClient;
pub use resolver::AddressResolver;

use crate::domain::{GeoPoint, Place};
use async_trait::async_trait;
use std::fmt::Debug;
use thiserror::Error;

/// A geocoding service that resolves coordinates to addresses and vice versa.
#[async_trait]
pub trait Geocoder: Debug + Send + Sync {
    /// Reverse geocode: resolve a coordinate to a display name.
    async fn reverse(&self, point: GeoPoint) -> Result<String, GeocodingError>;

    /// Forward geocode: resolve a free text query to candidate places.
    async fn search(&self, query: &str) -> Result<Vec<Place>, GeocodingError>;
}

#[derive(Error, Debug)]
pub enum GeocodingError {
    #[error("request error: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("no address found for {0}")]
    NoAddress(GeoPoint),
}
