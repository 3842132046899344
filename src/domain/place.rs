use crate::domain::GeoPoint;

/// A candidate returned by a forward geocoding search.
#[derive(Clone, Debug, PartialEq)]
pub struct Place {
    pub point: GeoPoint,
    pub display_name: String,
}
