mod geo_point;
mod geo_point_deserializer;
mod place;
pub mod route;
mod travel_mode;

pub use geo_point::GeoPoint;
pub use place::Place;
pub use travel_mode::TravelMode;
