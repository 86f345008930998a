// Strava activity lookup for comparing recorded runs
use serde::{Deserialize, Serialize};

use crate::config::{non_blank, ServiceConfig};
use crate::console_log;
use crate::error::{Result, TrackError};
use crate::http::get_json;
use crate::polyline::{decode_polyline, Polyline};

const STRAVA_API_URL: &str = "https://www.strava.com/api/v3";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ActivityMap {
    pub summary_polyline: Option<String>,
}

// Only the fields this crate reads from `GET /activities/{id}`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Activity {
    pub id: u64,
    #[serde(default)]
    pub map: Option<ActivityMap>,
}

/// Read-only Strava client for one athlete's access token.
#[derive(Debug, Clone)]
pub struct StravaClient {
    access_token: String,
    timeout_ms: u32,
}

impl StravaClient {
    pub fn new(access_token: impl Into<String>, timeout_ms: u32) -> Self {
        Self {
            access_token: access_token.into(),
            timeout_ms,
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        config.validate()?;
        let token = non_blank(config.strava_access_token.as_deref()).ok_or_else(|| {
            TrackError::config("Not authorized. Please complete OAuth flow first.")
        })?;
        Ok(Self::new(token, config.request_timeout_ms))
    }

    pub fn activity_url(activity_id: u64) -> String {
        format!("{}/activities/{}", STRAVA_API_URL, activity_id)
    }

    pub async fn fetch_activity(&self, activity_id: u64) -> Result<Activity> {
        let auth = format!("Bearer {}", self.access_token);
        get_json(
            "Strava API error",
            &Self::activity_url(activity_id),
            &[("Authorization", auth.as_str())],
            self.timeout_ms,
        )
        .await
    }

    /// Decoded summary polyline of an activity.
    pub async fn fetch_activity_polyline(&self, activity_id: u64) -> Result<Polyline> {
        let activity = self.fetch_activity(activity_id).await?;
        let encoded = summary_polyline(&activity)?;
        let polyline = decode_polyline(encoded)?;
        console_log!(
            "Strava activity {} has {} summary points",
            activity_id,
            polyline.len()
        );
        Ok(polyline)
    }
}

pub fn summary_polyline(activity: &Activity) -> Result<&str> {
    activity
        .map
        .as_ref()
        .and_then(|m| m.summary_polyline.as_deref())
        .filter(|p| !p.is_empty())
        .ok_or_else(|| {
            TrackError::upstream(format!(
                "Strava API error: activity {} has no summary polyline",
                activity.id
            ))
        })
}
