// Track pipelines exposed to the host: point-cloud GLB generation and route comparison
use js_sys::Uint8Array;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use serde_wasm_bindgen::to_value;
use wasm_bindgen::prelude::*;

use crate::config::{
    CompareConfig, NormalizeConfig, PointCloudConfig, ServiceConfig, DEFAULT_THRESHOLD_RATIO,
};
use crate::console_log;
use crate::elevation::ElevationClient;
use crate::error::{Result, TrackError};
use crate::export_glb::point_cloud_to_glb;
use crate::models::{track_to_vectors, TrackPoint};
use crate::normalize::normalize_and_scale;
use crate::point_cloud::{densify, expected_point_count};
use crate::polyline::decode_polyline;
use crate::similarity::compare_polylines;
use crate::strava::StravaClient;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PointCloudInput {
    pub track: Vec<TrackPoint>,
    #[serde(default)]
    pub normalize: NormalizeConfig,
    #[serde(default)]
    pub point_cloud: PointCloudConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FloatingLineInput {
    pub polyline: String,
    #[serde(default)]
    pub normalize: NormalizeConfig,
    #[serde(default)]
    pub point_cloud: PointCloudConfig,
    #[serde(default)]
    pub service: ServiceConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CompareInput {
    pub activity_id1: Option<u64>,
    pub activity_id2: Option<u64>,
    pub polyline1: Option<String>,
    pub polyline2: Option<String>,
    #[serde(default = "default_threshold_ratio")]
    pub threshold_ratio: f64,
    #[serde(default)]
    pub service: ServiceConfig,
}

fn default_threshold_ratio() -> f64 {
    DEFAULT_THRESHOLD_RATIO
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PointCloudStatsInput {
    pub track_points: usize,
    #[serde(default)]
    pub point_cloud: PointCloudConfig,
}

/// Where the two tracks of a comparison come from.
#[derive(Debug, Clone, PartialEq)]
pub enum CompareSource<'a> {
    Activities(u64, u64),
    Polylines(&'a str, &'a str),
}

impl CompareInput {
    /// Activity ids win when both pairs are present.
    pub fn source(&self) -> Result<CompareSource<'_>> {
        match (
            self.activity_id1,
            self.activity_id2,
            self.polyline1.as_deref(),
            self.polyline2.as_deref(),
        ) {
            (Some(a), Some(b), _, _) => Ok(CompareSource::Activities(a, b)),
            (_, _, Some(a), Some(b)) => Ok(CompareSource::Polylines(a, b)),
            _ => Err(TrackError::validation(
                "Either activity_id1/activity_id2 or polyline1/polyline2 must be provided.",
            )),
        }
    }

    pub fn compare_config(&self) -> CompareConfig {
        CompareConfig {
            threshold_ratio: self.threshold_ratio,
        }
    }
}

fn parse_input<T: for<'de> Deserialize<'de>>(input_json: &str) -> Result<T> {
    serde_json::from_str(input_json)
        .map_err(|e| TrackError::validation(format!("Failed to parse input: {}", e)))
}

/// Normalize and densify an elevation-augmented track.
pub fn build_point_cloud(
    track: &[TrackPoint],
    normalize: &NormalizeConfig,
    point_cloud: &PointCloudConfig,
) -> Result<Vec<Vector3<f64>>> {
    let scaled = normalize_and_scale(&track_to_vectors(track), normalize)?;
    densify(&scaled, point_cloud)
}

pub fn track_to_glb(
    track: &[TrackPoint],
    normalize: &NormalizeConfig,
    point_cloud: &PointCloudConfig,
) -> Result<Vec<u8>> {
    let cloud = build_point_cloud(track, normalize, point_cloud)?;
    let glb = point_cloud_to_glb(&cloud)?;
    console_log!("Exported {} points as {} bytes of GLB", cloud.len(), glb.len());
    Ok(glb)
}

/// Polyline in, GLB out: decode, look up elevation, normalize, densify, export.
pub async fn floating_line_model(
    client: &ElevationClient,
    encoded: &str,
    normalize: &NormalizeConfig,
    point_cloud: &PointCloudConfig,
) -> Result<Vec<u8>> {
    // Bad knobs should fail before the elevation request is spent
    normalize.validate()?;
    point_cloud.validate()?;

    let polyline = decode_polyline(encoded)?;
    if polyline.len() < 2 {
        return Err(TrackError::validation(format!(
            "Need at least 2 points to process coordinates, got {}",
            polyline.len()
        )));
    }

    let track = client.fetch_track_elevation(&polyline).await?;
    track_to_glb(&track, normalize, point_cloud)
}

pub fn compare_encoded(polyline1: &str, polyline2: &str, config: &CompareConfig) -> Result<bool> {
    let a = decode_polyline(polyline1)?;
    let b = decode_polyline(polyline2)?;
    compare_polylines(&a, &b, config)
}

pub async fn compare_activities(
    client: &StravaClient,
    activity_id1: u64,
    activity_id2: u64,
    config: &CompareConfig,
) -> Result<bool> {
    // Fail on a bad threshold before the two Strava requests
    config.validate()?;
    let a = client.fetch_activity_polyline(activity_id1).await?;
    let b = client.fetch_activity_polyline(activity_id2).await?;
    compare_polylines(&a, &b, config)
}

/// Build a point-cloud GLB from a track whose elevations are already known
#[wasm_bindgen]
pub fn generate_point_cloud_glb(input_json: &str) -> std::result::Result<Vec<u8>, JsValue> {
    let input: PointCloudInput = parse_input(input_json)?;
    Ok(track_to_glb(&input.track, &input.normalize, &input.point_cloud)?)
}

/// Polyline to floating line model GLB, fetching elevation on the way
#[wasm_bindgen]
pub async fn generate_floating_line_model(
    input_json: String,
) -> std::result::Result<Uint8Array, JsValue> {
    let input: FloatingLineInput = parse_input(&input_json)?;
    let client = ElevationClient::from_config(&input.service)?;
    let glb =
        floating_line_model(&client, &input.polyline, &input.normalize, &input.point_cloud).await?;
    Ok(Uint8Array::from(glb.as_slice()))
}

/// Compare two tracks given as polylines or as Strava activity ids
#[wasm_bindgen]
pub async fn compare_tracks(input_json: String) -> std::result::Result<bool, JsValue> {
    let input: CompareInput = parse_input(&input_json)?;
    let config = input.compare_config();

    let same = match input.source()? {
        CompareSource::Activities(a, b) => {
            let client = StravaClient::from_config(&input.service)?;
            compare_activities(&client, a, b, &config).await?
        }
        CompareSource::Polylines(a, b) => compare_encoded(a, b, &config)?,
    };
    Ok(same)
}

#[wasm_bindgen]
pub fn compare_encoded_polylines(
    polyline1: &str,
    polyline2: &str,
    threshold_ratio: f64,
) -> std::result::Result<bool, JsValue> {
    let config = CompareConfig { threshold_ratio };
    Ok(compare_encoded(polyline1, polyline2, &config)?)
}

/// Predicted cloud size for a track length, so hosts can reject work up front
#[wasm_bindgen]
pub fn point_cloud_stats(input_json: &str) -> std::result::Result<JsValue, JsValue> {
    let input: PointCloudStatsInput = parse_input(input_json)?;
    input.point_cloud.validate()?;
    let stats = expected_point_count(input.track_points, &input.point_cloud);
    Ok(to_value(&stats)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example_track() -> Vec<TrackPoint> {
        vec![
            TrackPoint::new(38.5, -120.2, 10.0),
            TrackPoint::new(40.7, -120.95, 15.0),
            TrackPoint::new(43.252, -126.453, 5.0),
        ]
    }

    #[test]
    fn builds_the_floating_line_cloud() {
        let cloud = build_point_cloud(
            &example_track(),
            &NormalizeConfig::default(),
            &PointCloudConfig::default(),
        )
        .expect("cloud");
        // 3 points + 8 interpolated + 3 full tails + 8 half tails
        assert_eq!(cloud.len(), 3 + 8 + 3 * 1330 + 8 * 409);
    }

    #[test]
    fn glb_output_starts_with_magic() {
        let glb = track_to_glb(
            &example_track(),
            &NormalizeConfig::default(),
            &PointCloudConfig::default(),
        )
        .expect("glb");
        assert_eq!(&glb[0..4], b"glTF");
    }

    #[test]
    fn invalid_point_cloud_config_is_a_config_error() {
        let bad = PointCloudConfig {
            density_factor: 0,
            ..PointCloudConfig::default()
        };
        let err = build_point_cloud(&example_track(), &NormalizeConfig::default(), &bad)
            .unwrap_err();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn bad_threshold_is_still_rejected_by_comparison() {
        let reference = "_p~iF~ps|U_ulLnnqC_mqNvxq`@";
        let config = CompareConfig {
            threshold_ratio: 0.0,
        };
        let err = compare_encoded(reference, reference, &config).unwrap_err();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn short_tracks_are_rejected() {
        let err = build_point_cloud(
            &example_track()[..1],
            &NormalizeConfig::default(),
            &PointCloudConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn point_cloud_input_parses_with_defaults() {
        let input: PointCloudInput = parse_input(
            r#"{ "track": [ { "lat": 1.0, "lng": 2.0, "elevation": 3.0 } ], "point_cloud": { "tail_points": 20 } }"#,
        )
        .expect("parse");
        assert_eq!(input.track.len(), 1);
        assert_eq!(input.point_cloud.tail_points, 20);
        assert_eq!(input.normalize, NormalizeConfig::default());
    }

    #[test]
    fn compare_source_prefers_activity_ids() {
        let input: CompareInput = parse_input(
            r#"{ "activity_id1": 1, "activity_id2": 2, "polyline1": "a", "polyline2": "b" }"#,
        )
        .expect("parse");
        assert_eq!(input.source().expect("source"), CompareSource::Activities(1, 2));
        assert_eq!(input.threshold_ratio, DEFAULT_THRESHOLD_RATIO);

        let input: CompareInput =
            parse_input(r#"{ "activity_id1": 1, "polyline1": "a", "polyline2": "b" }"#).expect("parse");
        assert_eq!(input.source().expect("source"), CompareSource::Polylines("a", "b"));
    }

    #[test]
    fn compare_source_needs_a_full_pair() {
        let input: CompareInput =
            parse_input(r#"{ "activity_id1": 1, "polyline2": "b" }"#).expect("parse");
        assert_eq!(input.source().unwrap_err().kind(), "validation");
    }

    #[test]
    fn compares_encoded_polylines() {
        let config = CompareConfig::default();
        let reference = "_p~iF~ps|U_ulLnnqC_mqNvxq`@";
        assert!(compare_encoded(reference, reference, &config).expect("compare"));

        let err = compare_encoded(reference, "_p~iF", &config).unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn malformed_json_is_a_validation_error() {
        let err = parse_input::<PointCloudInput>("{ not json").unwrap_err();
        assert_eq!(err.kind(), "validation");
    }
}
