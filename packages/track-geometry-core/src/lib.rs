use wasm_bindgen::prelude::*;
use serde_wasm_bindgen::to_value;

// Create a console module for logging
pub mod console;
pub mod error;
pub mod config;
pub mod models;
pub mod polyline;
// Upstream lookups through the JS fetch helper
mod http;
pub mod elevation;
pub mod strava;
// Track geometry
pub mod normalize;
pub mod point_cloud;
pub mod similarity;
pub mod export_glb;
// Host-facing pipelines
pub mod pipeline;

pub use error::{Result, TrackError};
pub use models::TrackPoint;
pub use polyline::{decode_polyline, encode_polyline, Polyline};

// Enable better panic messages in console during development
#[cfg(feature = "console_error_panic_hook")]
pub use console_error_panic_hook::set_once as set_panic_hook;

#[wasm_bindgen]
extern "C" {
    // JavaScript helper: GET `url` with `headers`, abort after `timeoutMs`,
    // resolve to the parsed JSON body or reject with an Error.
    #[wasm_bindgen(js_namespace = wasmJsHelpers, js_name = fetchJson, catch)]
    pub fn fetch_json(url: &str, headers: JsValue, timeout_ms: u32) -> std::result::Result<js_sys::Promise, JsValue>;
}

#[macro_export]
macro_rules! console_log {
    ($($t:tt)*) => ($crate::console::log(&format!($($t)*)))
}

#[macro_export]
macro_rules! console_warn {
    ($($t:tt)*) => ($crate::console::warn(&format!($($t)*)))
}

use std::sync::Once;
static INIT: Once = Once::new();

#[wasm_bindgen(start)]
pub fn start() {
    INIT.call_once(|| {
        #[cfg(feature = "console_error_panic_hook")]
        console_error_panic_hook::set_once();

        console_log!("Track geometry module initialized");
    });
}

/// Decode a polyline into `[[lat, lng], ...]`
#[wasm_bindgen]
pub fn decode_polyline_js(encoded: &str) -> std::result::Result<JsValue, JsValue> {
    let polyline = decode_polyline(encoded)?;
    if polyline.len() < 2 {
        console_warn!("Decoded polyline has only {} points", polyline.len());
    }
    let points: Vec<[f64; 2]> = polyline.lat_lngs().map(|(lat, lng)| [lat, lng]).collect();
    Ok(to_value(&points)?)
}

/// Encode `[[lat, lng], ...]` back into a polyline string
#[wasm_bindgen]
pub fn encode_polyline_js(points: JsValue) -> std::result::Result<String, JsValue> {
    let points: Vec<[f64; 2]> = serde_wasm_bindgen::from_value(points)?;
    for [lat, lng] in &points {
        polyline::check_lat_lng(*lat, *lng)?;
    }
    let polyline = Polyline::from_lat_lngs(points.into_iter().map(|[lat, lng]| (lat, lng)));
    Ok(encode_polyline(&polyline))
}
