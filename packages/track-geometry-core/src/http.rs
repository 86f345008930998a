// JSON requests through the host's `wasmJsHelpers.fetchJson`.
//
// The helper is expected to issue a GET with the given headers, abort after
// `timeoutMs`, reject on non-2xx responses and resolve to the parsed body.
use js_sys::{Object, Reflect};
use serde::de::DeserializeOwned;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

use crate::error::{Result, TrackError};
use crate::fetch_json;

pub async fn get_json<T: DeserializeOwned>(
    service: &str,
    url: &str,
    headers: &[(&str, &str)],
    timeout_ms: u32,
) -> Result<T> {
    let header_obj = Object::new();
    for (name, value) in headers {
        Reflect::set(&header_obj, &JsValue::from_str(name), &JsValue::from_str(value))
            .map_err(|e| TrackError::upstream(format!("{}: {}", service, js_error_message(&e))))?;
    }

    let promise = fetch_json(url, header_obj.into(), timeout_ms)
        .map_err(|e| TrackError::upstream(format!("{}: {}", service, js_error_message(&e))))?;
    let body = JsFuture::from(promise)
        .await
        .map_err(|e| TrackError::upstream(format!("{}: {}", service, js_error_message(&e))))?;

    serde_wasm_bindgen::from_value(body)
        .map_err(|e| TrackError::upstream(format!("{}: unexpected response: {}", service, e)))
}

fn js_error_message(value: &JsValue) -> String {
    if let Some(text) = value.as_string() {
        return text;
    }
    if let Some(err) = value.dyn_ref::<js_sys::Error>() {
        return String::from(err.message());
    }
    "unknown error".to_string()
}
