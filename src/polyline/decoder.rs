use super::{ASCII_OFFSET, CHUNK_MASK, CONTINUATION_BIT, PRECISION};
use crate::domain::GeoPoint;
use thiserror::Error;

/// A value never needs more than 7 groups (35 bits) for valid coordinates.
const MAX_CHUNKS: u32 = 7;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PolylineError {
    #[error("polyline ends in the middle of a coordinate at position {position}")]
    Truncated { position: usize },
    #[error("invalid character '{character}' at position {position}")]
    InvalidCharacter { position: usize, character: char },
    #[error("value starting at position {position} does not fit in a coordinate")]
    Overflow { position: usize },
}

/// Decodes an encoded polyline into its points.
///
/// Stops at the first malformed value instead of returning a truncated route.
pub fn decode(encoded: &str) -> Result<Vec<GeoPoint>, PolylineError> {
    Decoder::new(encoded).collect()
}

/// Lazily decodes the points of an encoded polyline.
///
/// The decoder is a cheap view over the input, create a new one for another pass.
#[derive(Debug, Clone)]
pub struct Decoder<'a> {
    bytes: &'a [u8],
    position: usize,
    latitude: i64,
    longitude: i64,
    failed: bool,
}

impl<'a> Decoder<'a> {
    pub fn new(encoded: &'a str) -> Self {
        Decoder {
            bytes: encoded.as_bytes(),
            position: 0,
            latitude: 0,
            longitude: 0,
            failed: false,
        }
    }

    fn next_value(&mut self) -> Result<i64, PolylineError> {
        let start = self.position;
        let mut result: u64 = 0;
        let mut chunks = 0;

        loop {
            let Some(&byte) = self.bytes.get(self.position) else {
                return Err(PolylineError::Truncated { position: self.position });
            };

            if !(ASCII_OFFSET..=b'~').contains(&byte) {
                return Err(PolylineError::InvalidCharacter {
                    position: self.position,
                    character: byte as char,
                });
            }

            if chunks == MAX_CHUNKS {
                return Err(PolylineError::Overflow { position: start });
            }

            let chunk = u64::from(byte - ASCII_OFFSET);
            result |= (chunk & CHUNK_MASK) << (5 * chunks);
            chunks += 1;
            self.position += 1;

            if chunk & CONTINUATION_BIT == 0 {
                break;
            }
        }

        // Undo the zig-zag encoding, odd values are negative.
        let magnitude = (result >> 1) as i64;
        Ok(if result & 1 == 1 { !magnitude } else { magnitude })
    }

    fn next_point(&mut self) -> Result<GeoPoint, PolylineError> {
        self.latitude += self.next_value()?;
        self.longitude += self.next_value()?;

        Ok(GeoPoint::new(self.latitude as f64 / PRECISION, self.longitude as f64 / PRECISION))
    }
}

impl Iterator for Decoder<'_> {
    type Item = Result<GeoPoint, PolylineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.position >= self.bytes.len() {
            return None;
        }

        let point = self.next_point();
        self.failed = point.is_err();
        Some(point)
    }
}
