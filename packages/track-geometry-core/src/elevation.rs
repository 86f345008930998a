use serde::{Deserialize, Serialize};

use crate::config::{non_blank, ServiceConfig};
use crate::console_log;
use crate::error::{Result, TrackError};
use crate::http::get_json;
use crate::models::TrackPoint;
use crate::polyline::{encode_polyline, Polyline};

const ELEVATION_API_URL: &str = "https://maps.googleapis.com/maps/api/elevation/json";
const STATUS_OK: &str = "OK";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ElevationSample {
    pub elevation: f64,
    pub location: Option<LatLng>,
    pub resolution: Option<f64>,
}

// Google Maps Elevation API response body
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ElevationResponse {
    #[serde(default)]
    pub results: Vec<ElevationSample>,
    pub status: String,
    pub error_message: Option<String>,
}

/// Elevation lookup bound to one API key.
///
/// Built per request from the host's [`ServiceConfig`].
#[derive(Debug, Clone)]
pub struct ElevationClient {
    api_key: String,
    timeout_ms: u32,
}

impl ElevationClient {
    pub fn new(api_key: impl Into<String>, timeout_ms: u32) -> Self {
        Self {
            api_key: api_key.into(),
            timeout_ms,
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        config.validate()?;
        let api_key = non_blank(config.google_maps_api_key.as_deref())
            .ok_or_else(|| TrackError::config("GOOGLE_MAPS_API_KEY not configured"))?;
        Ok(Self::new(api_key, config.request_timeout_ms))
    }

    /// One request for the whole track, locations sent as an encoded polyline.
    pub fn request_url(&self, polyline: &Polyline) -> String {
        let locations = format!("enc:{}", encode_polyline(polyline));
        format!(
            "{}?locations={}&key={}",
            ELEVATION_API_URL,
            urlencoding::encode(&locations),
            urlencoding::encode(&self.api_key)
        )
    }

    /// Fetch one elevation per polyline point, in input order.
    pub async fn fetch_track_elevation(&self, polyline: &Polyline) -> Result<Vec<TrackPoint>> {
        if polyline.is_empty() {
            return Err(TrackError::validation("No points to look up elevation for"));
        }

        console_log!("Fetching elevation for {} points", polyline.len());
        let response: ElevationResponse =
            get_json("Elevation data error", &self.request_url(polyline), &[], self.timeout_ms)
                .await?;
        match_elevations(polyline, response)
    }
}

/// Pair each polyline point with its elevation sample by index.
///
/// Anything other than a complete `OK` response fails the whole lookup.
pub fn match_elevations(polyline: &Polyline, response: ElevationResponse) -> Result<Vec<TrackPoint>> {
    if response.status != STATUS_OK {
        let detail = match response.error_message {
            Some(msg) => format!("{}: {}", response.status, msg),
            None => response.status,
        };
        return Err(TrackError::upstream(format!("Elevation data error: {}", detail)));
    }

    if response.results.len() != polyline.len() {
        return Err(TrackError::upstream(format!(
            "Elevation data error: expected {} samples, got {}",
            polyline.len(),
            response.results.len()
        )));
    }

    let track = polyline
        .lat_lngs()
        .zip(response.results.iter())
        .map(|((lat, lng), sample)| TrackPoint::new(lat, lng, sample.elevation))
        .collect();
    Ok(track)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polyline::decode_polyline;

    fn reference() -> Polyline {
        decode_polyline("_p~iF~ps|U_ulLnnqC_mqNvxq`@").expect("decode")
    }

    fn ok_response(elevations: &[f64]) -> ElevationResponse {
        ElevationResponse {
            results: elevations
                .iter()
                .map(|&elevation| ElevationSample {
                    elevation,
                    location: None,
                    resolution: Some(9.5),
                })
                .collect(),
            status: "OK".to_string(),
            error_message: None,
        }
    }

    #[test]
    fn client_requires_an_api_key() {
        let err = ElevationClient::from_config(&ServiceConfig::default()).unwrap_err();
        assert_eq!(err.kind(), "config");

        let config = ServiceConfig {
            google_maps_api_key: Some("   ".to_string()),
            ..ServiceConfig::default()
        };
        assert!(ElevationClient::from_config(&config).is_err());
    }

    #[test]
    fn request_url_sends_encoded_locations() {
        let client = ElevationClient::new("test-key", 5_000);
        let url = client.request_url(&reference());

        assert!(url.starts_with(ELEVATION_API_URL));
        assert!(url.contains("locations=enc%3A_p~iF~ps%7CU_ulLnnqC_mqNvxq%60%40"));
        assert!(url.ends_with("&key=test-key"));
    }

    #[test]
    fn matches_samples_by_index() {
        let track = match_elevations(&reference(), ok_response(&[10.0, 15.0, 5.0])).expect("match");

        assert_eq!(track.len(), 3);
        assert!((track[0].lat - 38.5).abs() < 1e-9);
        assert!((track[1].lng + 120.95).abs() < 1e-9);
        assert_eq!(track[2].elevation, 5.0);
    }

    #[test]
    fn parses_api_json() {
        let body = r#"{
            "results": [
                { "elevation": 1608.6, "location": { "lat": 39.7391536, "lng": -104.9847034 }, "resolution": 4.77 }
            ],
            "status": "OK"
        }"#;
        let response: ElevationResponse = serde_json::from_str(body).expect("parse");
        let single = Polyline::from_lat_lngs(vec![(39.73915, -104.9847)]);

        let track = match_elevations(&single, response).expect("match");
        assert_eq!(track[0].elevation, 1608.6);
    }

    #[test]
    fn non_ok_status_is_an_upstream_error() {
        let body = r#"{ "results": [], "status": "REQUEST_DENIED", "error_message": "The provided API key is invalid." }"#;
        let response: ElevationResponse = serde_json::from_str(body).expect("parse");

        let err = match_elevations(&reference(), response).unwrap_err();
        assert_eq!(err.kind(), "upstream");
        assert!(err.message().contains("REQUEST_DENIED"));
        assert!(err.message().contains("API key is invalid"));
    }

    #[test]
    fn partial_results_are_rejected() {
        let err = match_elevations(&reference(), ok_response(&[10.0, 15.0])).unwrap_err();
        assert_eq!(err.kind(), "upstream");
    }
}
