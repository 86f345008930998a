// Coordinate normalization: recentre and exaggerate a track for display
use std::f64::consts::PI;

use nalgebra::{Vector2, Vector3};

use crate::config::NormalizeConfig;
use crate::error::{Result, TrackError};

/// Below this elevation range a track counts as flat.
pub const FLAT_Z_RANGE: f64 = 0.001;
const FLAT_WAVE_AMPLITUDE: f64 = 0.5;
const FLAT_WAVE_PERIODS: f64 = 5.0;
const INDEX_WAVE_STEP: f64 = 0.5;

/// Normalize a track of `(x, y, z)` points.
///
/// XY is recentred on its centroid and scaled so the farthest point sits at
/// `target_size * xy_exaggeration`. Z is recentred on its mean and scaled by
/// `z_exaggeration`, with a zero-mean index wave added on top. Flat tracks
/// get a synthetic sine profile first so the result never collapses to a
/// plane.
pub fn normalize_and_scale(
    points: &[Vector3<f64>],
    config: &NormalizeConfig,
) -> Result<Vec<Vector3<f64>>> {
    config.validate()?;

    if points.len() < 2 {
        return Err(TrackError::validation(format!(
            "Need at least 2 points to process coordinates, got {}",
            points.len()
        )));
    }
    if let Some(bad) = points.iter().position(|p| !p.iter().all(|c| c.is_finite())) {
        return Err(TrackError::validation(format!(
            "Point {} has a non-finite coordinate",
            bad
        )));
    }

    let n = points.len();
    let count = n as f64;

    // XY
    let centroid = points
        .iter()
        .fold(Vector2::<f64>::zeros(), |acc, p| acc + p.xy())
        / count;
    let centred: Vec<Vector2<f64>> = points.iter().map(|p| p.xy() - centroid).collect();
    let max_norm = centred.iter().map(|v| v.norm()).fold(0.0_f64, f64::max);
    if max_norm <= 0.0 {
        return Err(TrackError::validation(
            "All points share the same position; need at least one non-zero distance",
        ));
    }
    let xy_scale = config.target_size * config.xy_exaggeration / max_norm;

    // Z
    let mut z: Vec<f64> = points.iter().map(|p| p.z).collect();
    let z_min = z.iter().copied().fold(f64::INFINITY, f64::min);
    let z_max = z.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if z_max - z_min < FLAT_Z_RANGE {
        add_flat_profile(&mut z);
    }
    let z_mean = z.iter().sum::<f64>() / count;

    let waves: Vec<f64> = (0..n).map(|i| (i as f64 * INDEX_WAVE_STEP).sin()).collect();
    let wave_mean = waves.iter().sum::<f64>() / count;
    let wave_scale = config.z_exaggeration * config.z_wave_amplitude;

    let normalized = centred
        .iter()
        .zip(z.iter())
        .zip(waves.iter())
        .map(|((xy, &z), &wave)| {
            let xy = *xy * xy_scale;
            let z = (z - z_mean) * config.z_exaggeration + (wave - wave_mean) * wave_scale;
            Vector3::new(xy.x, xy.y, z)
        })
        .collect();

    Ok(normalized)
}

// sin over linspace(0, 10π, n), half a unit high
fn add_flat_profile(z: &mut [f64]) {
    let steps = (z.len() - 1).max(1) as f64;
    let end = FLAT_WAVE_PERIODS * 2.0 * PI;
    for (i, value) in z.iter_mut().enumerate() {
        let t = end * i as f64 / steps;
        *value += t.sin() * FLAT_WAVE_AMPLITUDE;
    }
}
