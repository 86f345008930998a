// Per-call configuration, deserialized from the host's input JSON.
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackError};

pub const DEFAULT_TARGET_SIZE: f64 = 1.0;
pub const DEFAULT_XY_EXAGGERATION: f64 = 100_000.0;
pub const DEFAULT_Z_EXAGGERATION: f64 = 2_000.0;
pub const DEFAULT_Z_WAVE_AMPLITUDE: f64 = 0.1;

pub const DEFAULT_DENSITY_FACTOR: u32 = 5;
pub const DEFAULT_TAIL_POINTS: u32 = 50;
pub const DEFAULT_GRID_SIZE: u32 = 9;
pub const DEFAULT_INTERP_GRID_SIZE: u32 = 7;
pub const DEFAULT_GRID_EVERY: u32 = 3;
pub const DEFAULT_INTERP_TAIL_INTERVAL: u32 = 1;
pub const DEFAULT_FLOOR_OFFSET: f64 = 1_000.0;
pub const DEFAULT_GRID_OFFSET_RATIO: f64 = 0.001;
pub const DEFAULT_POWER_LAW_EXPONENT: f64 = 0.7;
pub const DEFAULT_MAX_POINTS: usize = 4_000_000;

pub const DEFAULT_THRESHOLD_RATIO: f64 = 0.02;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u32 = 10_000;

// Upper bounds that keep a single densification call within memory
const MAX_DENSITY_FACTOR: u32 = 3_000;
const MAX_TAIL_POINTS: u32 = 1_000;
const MAX_GRID_SIZE: u32 = 15;
pub const MAX_POINTS_LIMIT: usize = 16_000_000;
const MAX_REQUEST_TIMEOUT_MS: u32 = 120_000;

fn require_finite_positive(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(TrackError::config(format!(
            "{} must be a positive finite number, got {}",
            name, value
        )));
    }
    Ok(())
}

fn require_range<T>(name: &str, value: T, min: T, max: T) -> Result<()>
where
    T: PartialOrd + std::fmt::Display,
{
    if value < min || value > max {
        return Err(TrackError::config(format!(
            "{} must be within {}..={}, got {}",
            name, min, max, value
        )));
    }
    Ok(())
}

/// Knobs for [`crate::normalize::normalize_and_scale`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NormalizeConfig {
    pub target_size: f64,
    pub xy_exaggeration: f64,
    pub z_exaggeration: f64,
    /// Amplitude of the index-driven Z wave, relative to `z_exaggeration`.
    pub z_wave_amplitude: f64,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            target_size: DEFAULT_TARGET_SIZE,
            xy_exaggeration: DEFAULT_XY_EXAGGERATION,
            z_exaggeration: DEFAULT_Z_EXAGGERATION,
            z_wave_amplitude: DEFAULT_Z_WAVE_AMPLITUDE,
        }
    }
}

impl NormalizeConfig {
    pub fn validate(&self) -> Result<()> {
        require_finite_positive("target_size", self.target_size)?;
        require_finite_positive("xy_exaggeration", self.xy_exaggeration)?;
        require_finite_positive("z_exaggeration", self.z_exaggeration)?;
        if !self.z_wave_amplitude.is_finite() || self.z_wave_amplitude < 0.0 {
            return Err(TrackError::config(format!(
                "z_wave_amplitude must be a non-negative finite number, got {}",
                self.z_wave_amplitude
            )));
        }
        Ok(())
    }
}

/// How tail points are spaced between a track point and the floor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TailSpacing {
    Linear,
    /// Step fraction `(j / n)^(1 / exponent)`; exponents below 1 pack
    /// points near the top of the tail.
    PowerLaw { exponent: f64 },
}

impl Default for TailSpacing {
    fn default() -> Self {
        TailSpacing::Linear
    }
}

impl TailSpacing {
    pub fn power_law() -> Self {
        TailSpacing::PowerLaw {
            exponent: DEFAULT_POWER_LAW_EXPONENT,
        }
    }
}

/// Knobs for [`crate::point_cloud::densify`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PointCloudConfig {
    pub density_factor: u32,
    pub tail_points: u32,
    pub grid_size: u32,
    pub interp_grid_size: u32,
    pub grid_every: u32,
    /// Every n-th interpolated point gets a half-length tail; 0 disables.
    pub interp_tail_interval: u32,
    pub floor_offset: f64,
    pub grid_offset_ratio: f64,
    pub tail_spacing: TailSpacing,
    pub max_points: usize,
}

impl Default for PointCloudConfig {
    fn default() -> Self {
        Self {
            density_factor: DEFAULT_DENSITY_FACTOR,
            tail_points: DEFAULT_TAIL_POINTS,
            grid_size: DEFAULT_GRID_SIZE,
            interp_grid_size: DEFAULT_INTERP_GRID_SIZE,
            grid_every: DEFAULT_GRID_EVERY,
            interp_tail_interval: DEFAULT_INTERP_TAIL_INTERVAL,
            floor_offset: DEFAULT_FLOOR_OFFSET,
            grid_offset_ratio: DEFAULT_GRID_OFFSET_RATIO,
            tail_spacing: TailSpacing::default(),
            max_points: DEFAULT_MAX_POINTS,
        }
    }
}

impl PointCloudConfig {
    pub fn validate(&self) -> Result<()> {
        require_range("density_factor", self.density_factor, 1, MAX_DENSITY_FACTOR)?;
        require_range("tail_points", self.tail_points, 0, MAX_TAIL_POINTS)?;
        require_range("grid_size", self.grid_size, 1, MAX_GRID_SIZE)?;
        require_range("interp_grid_size", self.interp_grid_size, 1, MAX_GRID_SIZE)?;
        require_range("grid_every", self.grid_every, 1, MAX_TAIL_POINTS)?;
        require_range(
            "interp_tail_interval",
            self.interp_tail_interval,
            0,
            MAX_DENSITY_FACTOR,
        )?;

        if !self.floor_offset.is_finite() || self.floor_offset < 0.0 {
            return Err(TrackError::config(format!(
                "floor_offset must be a non-negative finite number, got {}",
                self.floor_offset
            )));
        }
        // A zero offset would stack every lattice point on its tail point
        require_finite_positive("grid_offset_ratio", self.grid_offset_ratio)?;
        if let TailSpacing::PowerLaw { exponent } = self.tail_spacing {
            require_finite_positive("tail_spacing.exponent", exponent)?;
        }
        require_range("max_points", self.max_points, 1, MAX_POINTS_LIMIT)
    }
}

/// Knobs for [`crate::similarity::compare_polylines`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CompareConfig {
    pub threshold_ratio: f64,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            threshold_ratio: DEFAULT_THRESHOLD_RATIO,
        }
    }
}

impl CompareConfig {
    pub fn validate(&self) -> Result<()> {
        require_finite_positive("threshold_ratio", self.threshold_ratio)
    }
}

/// Credentials and transport settings for the upstream services.
///
/// The host passes these in with every call; nothing is read from the
/// environment and no client outlives the call it was built for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    pub google_maps_api_key: Option<String>,
    pub strava_access_token: Option<String>,
    pub request_timeout_ms: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            google_maps_api_key: None,
            strava_access_token: None,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<()> {
        require_range(
            "request_timeout_ms",
            self.request_timeout_ms,
            1,
            MAX_REQUEST_TIMEOUT_MS,
        )
    }
}

/// Treat blank strings the same as a missing credential.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
