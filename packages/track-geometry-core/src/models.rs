// Shared data structures passed between the pipeline stages and JS
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// One elevation-augmented track sample.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TrackPoint {
    pub lat: f64,
    pub lng: f64,
    pub elevation: f64,
}

impl TrackPoint {
    pub fn new(lat: f64, lng: f64, elevation: f64) -> Self {
        Self { lat, lng, elevation }
    }

    /// `x = lng`, `y = lat`, `z = elevation`, the same axes as [`crate::Polyline`].
    pub fn to_vector(&self) -> Vector3<f64> {
        Vector3::new(self.lng, self.lat, self.elevation)
    }
}

pub fn track_to_vectors(track: &[TrackPoint]) -> Vec<Vector3<f64>> {
    track.iter().map(TrackPoint::to_vector).collect()
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PointCloudStats {
    pub track_points: usize,
    pub interpolated_points: usize,
    pub tail_points: usize,
    pub total_points: usize,
}
