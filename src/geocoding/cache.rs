use crate::domain::GeoPoint;
use crate::geocoding::GeocodingError;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Decimal places kept in a cache key, about 11 meters at the equator.
const KEY_PRECISION: f64 = 1e4;

/// A coordinate rounded to 4 decimals, stored as scaled integers so it can be hashed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CoordinateKey {
    latitude: i64,
    longitude: i64,
}

impl From<GeoPoint> for CoordinateKey {
    fn from(point: GeoPoint) -> Self {
        CoordinateKey {
            latitude: (point.latitude * KEY_PRECISION).round() as i64,
            longitude: (point.longitude * KEY_PRECISION).round() as i64,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressSource {
    Cache,
    Geocoder,
    /// The lookup failed, the text only shows the coordinates.
    Fallback,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedAddress {
    pub text: String,
    pub source: AddressSource,
}

impl ResolvedAddress {
    pub fn fallback(point: GeoPoint) -> Self {
        ResolvedAddress {
            text: format!("Location: {}", point),
            source: AddressSource::Fallback,
        }
    }
}

/// Session scoped reverse geocoding results. Entries are never evicted.
#[derive(Debug, Default)]
pub struct AddressCache {
    entries: HashMap<CoordinateKey, String>,
}

impl AddressCache {
    pub fn new() -> Self {
        AddressCache::default()
    }

    pub fn lookup(&self, point: GeoPoint) -> Option<ResolvedAddress> {
        self.entries.get(&CoordinateKey::from(point)).map(|text| ResolvedAddress {
            text: text.clone(),
            source: AddressSource::Cache,
        })
    }

    /// Turns a lookup result into an address. Only successful lookups are cached.
    pub fn settle(&mut self, point: GeoPoint, result: Result<String, GeocodingError>) -> ResolvedAddress {
        match result {
            Ok(text) => {
                debug!(%point, "🗺️ Caching address '{}'", text);
                self.entries.insert(CoordinateKey::from(point), text.clone());
                ResolvedAddress {
                    text,
                    source: AddressSource::Geocoder,
                }
            }
            Err(e) => {
                warn!(%point, "🗺️ Reverse geocoding failed, falling back to coordinates: {}", e);
                ResolvedAddress::fallback(point)
            }
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
