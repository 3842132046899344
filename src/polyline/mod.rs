//! Google encoded polyline format, precision 1e5.
//!
//! Each coordinate is stored as the signed difference to the previous one,
//! zig-zag encoded and split into 5-bit groups, least significant first.
//! Every group is offset by 63 to land in printable ASCII, and all but the
//! last group of a value carry the 0x20 continuation bit.
mod decoder;
mod encoder;

pub use decoder::{PolylineError, decode};
pub use encoder::encode;

const PRECISION: f64 = 1e5;
const ASCII_OFFSET: u8 = 63;
const CONTINUATION_BIT: u64 = 0x20;
const CHUNK_MASK: u64 = 0x1f;
