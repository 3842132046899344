use crate::domain::GeoPoint;
use crate::polyline::{self, PolylineError};
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct DirectionsResponse {
    pub routes: Vec<Route>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Route {
    pub summary: Summary,
    /// Encoded polyline, precision 1e5.
    pub geometry: String,
    #[serde(default)]
    pub segments: Vec<Segment>,
}

impl Route {
    /// Decodes the route geometry into its points.
    pub fn points(&self) -> Result<Vec<GeoPoint>, PolylineError> {
        polyline::decode(&self.geometry)
    }

    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.segments.iter().flat_map(|segment| segment.steps.iter())
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Summary {
    /// In meters, or in the configured units.
    #[serde(default)]
    pub distance: f64,
    /// In seconds.
    #[serde(default)]
    pub duration: f64,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Segment {
    pub distance: f64,
    pub duration: f64,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Step {
    pub instruction: String,
    pub distance: f64,
    pub duration: f64,
}
