use super::{ASCII_OFFSET, CHUNK_MASK, CONTINUATION_BIT, PRECISION};
use crate::domain::GeoPoint;

/// Encodes points into a polyline, rounding each coordinate to 1e-5 degrees.
pub fn encode(points: &[GeoPoint]) -> String {
    let mut encoded = String::with_capacity(points.len() * 8);
    let mut previous = (0_i64, 0_i64);

    for point in points {
        let latitude = (point.latitude * PRECISION).round() as i64;
        let longitude = (point.longitude * PRECISION).round() as i64;

        push_value(&mut encoded, latitude - previous.0);
        push_value(&mut encoded, longitude - previous.1);
        previous = (latitude, longitude);
    }

    encoded
}

fn push_value(encoded: &mut String, delta: i64) {
    let mut value = (if delta < 0 { !(delta << 1) } else { delta << 1 }) as u64;

    while value >= CONTINUATION_BIT {
        encoded.push(((CONTINUATION_BIT | (value & CHUNK_MASK)) as u8 + ASCII_OFFSET) as char);
        value >>= 5;
    }
    encoded.push((value as u8 + ASCII_OFFSET) as char);
}
