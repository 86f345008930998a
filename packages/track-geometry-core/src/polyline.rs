//! Encoded polyline support.
//!
//! Tracks arrive from the mobile app and from Strava as polylines in the
//! standard encoding (precision 1e-5). They are decoded once at the
//! boundary into a [`Polyline`] and never re-encoded except for the
//! elevation request, which accepts `enc:` locations.

use geo_types::{Coord, LineString};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackError};

const PRECISION: f64 = 1e5;
const CHUNK_BITS: u32 = 5;
const CHUNK_MASK: i64 = 0x1f;
const CONTINUATION_BIT: i64 = 0x20;
const ASCII_OFFSET: u8 = 63;
// Anything wider would not fit a degree value at 1e-5 precision
const MAX_SHIFT: u32 = 60;
const MAX_LAT: f64 = 90.0;
const MAX_LNG: f64 = 180.0;

/// An ordered, immutable sequence of (lat, lng) points.
///
/// Stored as a `LineString` with `x = lng` and `y = lat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    line: LineString<f64>,
}

impl Polyline {
    pub fn from_lat_lngs<I>(points: I) -> Self
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let coords: Vec<Coord<f64>> = points
            .into_iter()
            .map(|(lat, lng)| Coord { x: lng, y: lat })
            .collect();
        Self {
            line: LineString::new(coords),
        }
    }

    pub fn lat_lngs(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.line.0.iter().map(|c| (c.y, c.x))
    }

    pub fn coords(&self) -> &[Coord<f64>] {
        &self.line.0
    }

    pub fn line_string(&self) -> &LineString<f64> {
        &self.line
    }

    pub fn len(&self) -> usize {
        self.line.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.line.0.is_empty()
    }
}

/// Decode a polyline string into (lat, lng) points.
pub fn decode_polyline(encoded: &str) -> Result<Polyline> {
    let bytes = encoded.as_bytes();
    let mut index = 0;
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;
    let mut points = Vec::new();

    while index < bytes.len() {
        let (lat_delta, next) = decode_value(bytes, index)?;
        if next >= bytes.len() {
            return Err(TrackError::validation(format!(
                "polyline ends after a latitude at byte {}",
                next
            )));
        }
        let (lng_delta, next) = decode_value(bytes, next)?;
        index = next;

        lat = lat.checked_add(lat_delta).ok_or_else(|| coordinate_overflow(index))?;
        lng = lng.checked_add(lng_delta).ok_or_else(|| coordinate_overflow(index))?;

        let point = (lat as f64 / PRECISION, lng as f64 / PRECISION);
        check_lat_lng(point.0, point.1)?;
        points.push(point);
    }

    Ok(Polyline::from_lat_lngs(points))
}

fn coordinate_overflow(index: usize) -> TrackError {
    TrackError::validation(format!("polyline coordinate overflows at byte {}", index))
}

/// Reject anything that is not a finite point on the globe.
pub(crate) fn check_lat_lng(lat: f64, lng: f64) -> Result<()> {
    if lat.abs() <= MAX_LAT && lng.abs() <= MAX_LNG {
        return Ok(());
    }
    Err(TrackError::validation(format!(
        "coordinate ({}, {}) is outside lat ±{} / lng ±{}",
        lat, lng, MAX_LAT, MAX_LNG
    )))
}

fn decode_value(bytes: &[u8], start: usize) -> Result<(i64, usize)> {
    let mut result: i64 = 0;
    let mut shift: u32 = 0;
    let mut index = start;

    loop {
        let byte = *bytes.get(index).ok_or_else(|| {
            TrackError::validation(format!("truncated polyline value starting at byte {}", start))
        })?;
        if !(ASCII_OFFSET..=b'~').contains(&byte) {
            return Err(TrackError::validation(format!(
                "invalid polyline character {:?} at byte {}",
                byte as char, index
            )));
        }
        if shift > MAX_SHIFT {
            return Err(TrackError::validation(format!(
                "polyline value starting at byte {} overflows",
                start
            )));
        }

        let chunk = (byte - ASCII_OFFSET) as i64;
        result |= (chunk & CHUNK_MASK) << shift;
        shift += CHUNK_BITS;
        index += 1;

        if chunk < CONTINUATION_BIT {
            break;
        }
    }

    let value = if result & 1 == 1 { !(result >> 1) } else { result >> 1 };
    Ok((value, index))
}

/// Encode points back into the compact polyline form.
///
/// Points are expected to lie within lat ±90 / lng ±180.
pub fn encode_polyline(polyline: &Polyline) -> String {
    let mut out = String::new();
    let mut prev_lat: i64 = 0;
    let mut prev_lng: i64 = 0;

    for (lat, lng) in polyline.lat_lngs() {
        let lat = (lat * PRECISION).round() as i64;
        let lng = (lng * PRECISION).round() as i64;
        encode_value(lat - prev_lat, &mut out);
        encode_value(lng - prev_lng, &mut out);
        prev_lat = lat;
        prev_lng = lng;
    }

    out
}

fn encode_value(delta: i64, out: &mut String) {
    let mut value = if delta < 0 { !(delta << 1) } else { delta << 1 };
    while value >= CONTINUATION_BIT {
        out.push(((CONTINUATION_BIT | (value & CHUNK_MASK)) as u8 + ASCII_OFFSET) as char);
        value >>= CHUNK_BITS;
    }
    out.push((value as u8 + ASCII_OFFSET) as char);
}
