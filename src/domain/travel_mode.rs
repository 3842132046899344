use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub enum TravelMode {
    #[default]
    Walking,
    Cycling,
    Driving,
}

impl TravelMode {
    /// The OpenRouteService profile used to route this mode.
    pub fn profile(&self) -> &'static str {
        match self {
            TravelMode::Walking => "foot-walking",
            TravelMode::Cycling => "cycling-regular",
            TravelMode::Driving => "driving-car",
        }
    }
}

impl FromStr for TravelMode {
    type Err = std::convert::Infallible;

    // Unknown modes fall back to walking.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "cycling" => TravelMode::Cycling,
            "driving" => TravelMode::Driving,
            _ => TravelMode::Walking,
        })
    }
}

impl fmt::Display for TravelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TravelMode::Walking => "walking",
            TravelMode::Cycling => "cycling",
            TravelMode::Driving => "driving",
        };
        write!(f, "{}", name)
    }
}
