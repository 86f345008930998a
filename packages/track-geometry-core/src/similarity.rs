// Route similarity via the symmetric Hausdorff distance between point sets
use geo::{BoundingRect, HausdorffDistance};
use geo_types::{Coord, LineString};

use crate::config::CompareConfig;
use crate::console_log;
use crate::error::{Result, TrackError};
use crate::polyline::Polyline;

/// Symmetric Hausdorff distance between the vertex sets of two tracks.
pub fn hausdorff_distance(a: &Polyline, b: &Polyline) -> f64 {
    a.line_string().hausdorff_distance(b.line_string())
}

/// Diagonal of the bounding box around both point sets, `None` when both
/// are empty.
pub fn bounding_diagonal(a: &[Coord<f64>], b: &[Coord<f64>]) -> Option<f64> {
    let union: LineString<f64> = a.iter().chain(b.iter()).copied().collect();
    union
        .bounding_rect()
        .map(|rect| rect.width().hypot(rect.height()))
}

/// Decide whether two tracks follow the same route.
///
/// True when the Hausdorff distance is strictly below `threshold_ratio` of
/// the bounding-box diagonal. Tracks whose points all coincide have no
/// extent to measure against and are never considered similar.
pub fn compare_polylines(a: &Polyline, b: &Polyline, config: &CompareConfig) -> Result<bool> {
    config.validate()?;

    if a.is_empty() || b.is_empty() {
        return Err(TrackError::validation(format!(
            "Cannot compare empty polylines ({} and {} points)",
            a.len(),
            b.len()
        )));
    }

    let diagonal = match bounding_diagonal(a.coords(), b.coords()) {
        Some(d) if d > 0.0 => d,
        _ => {
            console_log!("Degenerate bounding box, tracks treated as different");
            return Ok(false);
        }
    };

    let distance = hausdorff_distance(a, b);
    let ratio = distance / diagonal;
    Ok(ratio < config.threshold_ratio)
}
