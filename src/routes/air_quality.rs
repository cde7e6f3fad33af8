use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info};

use super::AppState;
use crate::{
    accessory::{MANUFACTURER, MODEL},
    AirQuality,
};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/air-quality", get(current))
        .route("/air-quality/refresh", post(refresh))
}

/// Accessory view served by `GET /air-quality`.
#[derive(Debug, Serialize)]
struct AirQualityResponse {
    name: String,
    manufacturer: &'static str,
    model: &'static str,
    air_quality: AirQuality,
    label: &'static str,
    status_fault: bool,
    pm2_5_density: Option<f64>,
    pm10_density: Option<f64>,
    last_update: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct RefreshResponse {
    index: Option<f64>,
    air_quality: AirQuality,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Never waits on the network: a cold cache answers `0` and starts a fetch.
async fn current(State((engine, accessory)): State<AppState>) -> impl IntoResponse {
    // ---
    debug!("GET /air-quality");

    let air_quality = engine.current_category();
    let snapshot = accessory.snapshot();
    let last_update = match engine.last_fetch_epoch_seconds() {
        0 => None,
        secs => DateTime::from_timestamp(secs, 0),
    };

    Json(AirQualityResponse {
        name: accessory.name.clone(),
        manufacturer: MANUFACTURER,
        model: MODEL,
        air_quality,
        label: air_quality.label(),
        status_fault: snapshot.status_fault,
        pm2_5_density: snapshot.pm2_5_density,
        pm10_density: snapshot.pm10_density,
        last_update,
    })
}

/// On-demand refresh; joins the scheduled fetch if one is already running.
async fn refresh(State((engine, _)): State<AppState>) -> impl IntoResponse {
    // ---
    info!("POST /air-quality/refresh");

    match engine.refresh().await {
        Ok(index) => {
            let air_quality = AirQuality::from_index(index.unwrap_or(0.0));
            (StatusCode::OK, Json(RefreshResponse { index, air_quality })).into_response()
        }
        Err(err) => {
            error!("On-demand refresh failed: {}", err);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse {
                    error: err.to_string(),
                }),
            )
                .into_response()
        }
    }
}
