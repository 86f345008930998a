use serde::Serialize;
use thiserror::Error;
use wasm_bindgen::JsValue;

pub type Result<T, E = TrackError> = std::result::Result<T, E>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TrackError {
    /// Bad caller input. Never retried.
    #[error("validation error: {0}")]
    Validation(String),

    /// An external service (elevation lookup, Strava) failed.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Missing credentials or out-of-range configuration knobs.
    #[error("configuration error: {0}")]
    Config(String),
}

impl TrackError {
    pub fn validation(msg: impl Into<String>) -> Self {
        TrackError::Validation(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        TrackError::Upstream(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        TrackError::Config(msg.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TrackError::Validation(_) => "validation",
            TrackError::Upstream(_) => "upstream",
            TrackError::Config(_) => "config",
        }
    }

    /// HTTP status a host route should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            TrackError::Validation(_) => 400,
            TrackError::Upstream(_) => 502,
            TrackError::Config(_) => 500,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            TrackError::Validation(msg) | TrackError::Upstream(msg) | TrackError::Config(msg) => {
                msg
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorPayload<'a> {
    kind: &'static str,
    status: u16,
    message: &'a str,
}

// Errors cross into JS as `{ kind, status, message }` so hosts can map them
// onto HTTP responses without parsing strings.
impl From<TrackError> for JsValue {
    fn from(err: TrackError) -> Self {
        let payload = ErrorPayload {
            kind: err.kind(),
            status: err.status_code(),
            message: err.message(),
        };
        serde_wasm_bindgen::to_value(&payload).unwrap_or_else(|_| JsValue::from_str(&err.to_string()))
    }
}
