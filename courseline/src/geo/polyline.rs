//! Encoded polyline codec (1e-5 precision).
//!
//! Routing providers ship route geometry as an encoded polyline string: each
//! coordinate is stored as a zig-zag encoded delta from the previous one,
//! split into 5-bit chunks offset into printable ASCII.

use thiserror::Error;

use super::GeoPoint;

/// Coordinate scale factor for 5-digit precision.
const PRECISION: f64 = 1e5;

/// Printable ASCII offset applied to each chunk.
const CHUNK_OFFSET: u8 = 63;

/// Continuation bit within a chunk.
const CONTINUATION: i64 = 0x20;

/// Longest shift a 64-bit value can take before overflowing.
const MAX_SHIFT: u32 = 60;

/// Errors produced while decoding a polyline string.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PolylineError {
    /// Input ended in the middle of a value.
    #[error("polyline truncated at byte {0}")]
    Truncated(usize),

    /// A byte outside the encoding alphabet.
    #[error("invalid polyline character {character:?} at byte {position}")]
    InvalidCharacter { position: usize, character: char },

    /// A value did not terminate within 64 bits, or the running
    /// coordinate sum overflowed.
    #[error("polyline value overflows at byte {0}")]
    Overflow(usize),

    /// A decoded point lies outside ±90° latitude or ±180° longitude.
    #[error("polyline point {index} out of range ({latitude}, {longitude})")]
    OutOfRange {
        index: usize,
        latitude: f64,
        longitude: f64,
    },
}

/// Decode an encoded polyline into points.
pub fn decode(encoded: &str) -> Result<Vec<GeoPoint>, PolylineError> {
    let bytes = encoded.as_bytes();
    let mut index = 0;
    let mut lat: i64 = 0;
    let mut lon: i64 = 0;
    let mut points = Vec::new();

    while index < bytes.len() {
        lat = lat
            .checked_add(decode_value(bytes, &mut index)?)
            .ok_or(PolylineError::Overflow(index))?;
        lon = lon
            .checked_add(decode_value(bytes, &mut index)?)
            .ok_or(PolylineError::Overflow(index))?;

        let latitude = lat as f64 / PRECISION;
        let longitude = lon as f64 / PRECISION;
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(PolylineError::OutOfRange {
                index: points.len(),
                latitude,
                longitude,
            });
        }
        points.push(GeoPoint::new(latitude, longitude));
    }

    Ok(points)
}

fn decode_value(bytes: &[u8], index: &mut usize) -> Result<i64, PolylineError> {
    let mut result: i64 = 0;
    let mut shift: u32 = 0;

    loop {
        let byte = *bytes.get(*index).ok_or(PolylineError::Truncated(*index))?;
        if !(CHUNK_OFFSET..=126).contains(&byte) {
            return Err(PolylineError::InvalidCharacter {
                position: *index,
                character: byte as char,
            });
        }
        if shift > MAX_SHIFT {
            return Err(PolylineError::Overflow(*index));
        }

        let chunk = i64::from(byte - CHUNK_OFFSET);
        *index += 1;
        result |= (chunk & 0x1f) << shift;
        shift += 5;

        if chunk < CONTINUATION {
            break;
        }
    }

    Ok(if result & 1 != 0 {
        !(result >> 1)
    } else {
        result >> 1
    })
}

/// Encode points as a polyline string.
pub fn encode(points: &[GeoPoint]) -> String {
    let mut out = String::with_capacity(points.len() * 8);
    let mut prev_lat: i64 = 0;
    let mut prev_lon: i64 = 0;

    for point in points {
        let lat = (point.latitude * PRECISION).round() as i64;
        let lon = (point.longitude * PRECISION).round() as i64;
        encode_value(lat - prev_lat, &mut out);
        encode_value(lon - prev_lon, &mut out);
        prev_lat = lat;
        prev_lon = lon;
    }

    out
}

fn encode_value(value: i64, out: &mut String) {
    let mut v = if value < 0 { !(value << 1) } else { value << 1 };
    while v >= CONTINUATION {
        out.push(char::from((((v & 0x1f) | CONTINUATION) as u8) + CHUNK_OFFSET));
        v >>= 5;
    }
    out.push(char::from(v as u8 + CHUNK_OFFSET));
}
