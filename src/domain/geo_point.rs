use std::fmt;
use thiserror::Error;

/// A WGS84 coordinate in decimal degrees.
#[derive(Clone, Copy, Default, Debug, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        GeoPoint { latitude, longitude }
    }

    /// Returns a point after checking that both coordinates lie in their valid range.
    pub fn try_new(latitude: f64, longitude: f64) -> Result<Self, InvalidGeoPoint> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(InvalidGeoPoint::Latitude(latitude));
        }

        if !(-180.0..=180.0).contains(&longitude) {
            return Err(InvalidGeoPoint::Longitude(longitude));
        }

        Ok(GeoPoint { latitude, longitude })
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.latitude, self.longitude)
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum InvalidGeoPoint {
    #[error("invalid latitude: {0}, must be between -90 and 90")]
    Latitude(f64),
    #[error("invalid longitude: {0}, must be between -180 and 180")]
    Longitude(f64),
}
