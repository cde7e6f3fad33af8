//! HTTPS boundary to the Airly measurement endpoint.
//!
//! The refresh engine only sees the [`Transport`] trait: one GET that yields
//! parsed JSON or a [`FetchError`]. [`HttpTransport`] is the `reqwest`-backed
//! implementation used by the binary.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde_json::Value;
use tracing::debug;

use crate::{Config, FetchError};

/// Index kind requested from the API.
pub const INDEX_TYPE: &str = "AIRLY_CAQI";

/// Hard upper bound on a single request.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

// ---

/// Everything needed to issue one nearest-measurement request.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRequest {
    pub url: String,
    pub api_key: String,
    pub index_type: &'static str,
    pub latitude: f64,
    pub longitude: f64,
    pub max_distance_km: f64,
}

impl MeasurementRequest {
    pub fn from_config(config: &Config) -> Self {
        // ---
        Self {
            url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            index_type: INDEX_TYPE,
            latitude: config.latitude,
            longitude: config.longitude,
            max_distance_km: config.max_distance_km,
        }
    }

    /// Query string pairs, in the order the API documents them.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        // ---
        vec![
            ("indexType", self.index_type.to_string()),
            ("lat", self.latitude.to_string()),
            ("lng", self.longitude.to_string()),
            ("maxDistanceKM", self.max_distance_km.to_string()),
        ]
    }
}

/// Fetch JSON for a measurement request.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get_json(&self, request: &MeasurementRequest) -> Result<Value, FetchError>;
}

/// `reqwest`-backed transport with a fixed timeout.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, FetchError> {
        // ---
        let client = reqwest::Client::builder()
            .user_agent(concat!("airly-aqi/", env!("CARGO_PKG_VERSION")))
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| FetchError::Http(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_json(&self, request: &MeasurementRequest) -> Result<Value, FetchError> {
        // ---
        debug!(
            "Fetching Airly measurement: {} lat={} lng={} maxDistanceKM={}",
            request.url, request.latitude, request.longitude, request.max_distance_km
        );

        let response = self
            .client
            .get(&request.url)
            .query(&request.query())
            .header("apikey", &request.api_key)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let body = response.text().await.map_err(map_reqwest_error)?;

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| FetchError::Json(e.to_string()))
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    // ---
    if err.is_timeout() {
        FetchError::Timeout(HTTP_TIMEOUT)
    } else {
        FetchError::Http(err.to_string())
    }
}
