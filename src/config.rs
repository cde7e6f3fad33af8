//! Configuration loader for the `airly-aqi` service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). Validation happens here so that a bad value fails
//! fast before any polling is scheduled.
use std::{env, time::Duration};

use anyhow::{anyhow, Result};

/// Upstream daily request budget for a free API key.
pub const API_REQUESTS_PER_DAY: u64 = 100;
pub const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Shortest refresh interval that stays within the daily budget.
pub const MIN_REFRESH_INTERVAL_SECONDS: u64 = SECONDS_PER_DAY.div_ceil(API_REQUESTS_PER_DAY);

pub const DEFAULT_API_URL: &str = "https://airapi.airly.eu/v2/measurements/nearest";
pub const DEFAULT_ACCESSORY_NAME: &str = "Air2";
pub const DEFAULT_MAX_DISTANCE_KM: f64 = 3.0;
pub const MAX_DISTANCE_CAP_KM: f64 = 50.0;
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Read an optional variable, treating empty values as unset.
macro_rules! optional_env {
    ($lookup:expr, $var_name:expr) => {
        $lookup($var_name).filter(|v: &String| !v.trim().is_empty())
    };
}

/// Read a required string variable.
macro_rules! require_env {
    ($lookup:expr, $var_name:expr, $what:expr) => {
        optional_env!($lookup, $var_name).ok_or_else(|| {
            anyhow!(
                "Configuration of {} is missing! Set {} in .env or environment.",
                $what,
                $var_name
            )
        })?
    };
}

/// Parse an optional integer variable with a default value.
macro_rules! parse_env_u16 {
    ($lookup:expr, $var_name:expr, $default:expr) => {
        optional_env!($lookup, $var_name)
            .map(|v| v.trim().parse::<u16>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// Airly API key, sent in the `apikey` header.
    pub api_key: String,

    /// Measurement endpoint.
    pub api_url: String,

    pub latitude: f64,
    pub longitude: f64,

    /// Search radius for the nearest installation, in kilometers.
    pub max_distance_km: f64,

    /// Poll period, never below [`MIN_REFRESH_INTERVAL_SECONDS`].
    pub refresh_interval: Duration,

    /// Display name of the accessory.
    pub name: String,

    /// Port of the local status API.
    pub http_port: u16,
}

/// Load configuration from environment variables with defaults.
///
/// Required:
/// - `AIRLY_API_KEY` (or `AIRLY_KEY`) – Airly API key
/// - `AIRLY_LATITUDE`, `AIRLY_LONGITUDE` – location to query
///
/// Optional:
/// - `AIRLY_MAX_DISTANCE_KM` – search radius (default: 3, capped at 50)
/// - `AIRLY_REFRESH_MINUTES` – poll period (default and floor: 15)
/// - `AIRLY_API_URL` – endpoint override
/// - `ACCESSORY_NAME` – display name (default: `Air2`)
/// - `HTTP_PORT` – status API port (default: 8080)
///
/// Returns an error if any required variable is missing or invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    load_from(|key| env::var(key).ok())
}

/// Load configuration through an arbitrary key lookup.
pub fn load_from<F>(lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    // ---
    let api_key = match optional_env!(lookup, "AIRLY_API_KEY") {
        Some(key) => key,
        None => require_env!(lookup, "AIRLY_KEY", "apikey"),
    };

    let latitude = require_env!(lookup, "AIRLY_LATITUDE", "latitude");
    let longitude = require_env!(lookup, "AIRLY_LONGITUDE", "longitude");
    let (latitude, longitude) = validate_coordinates(&latitude, &longitude)?;

    let max_distance_km = validate_max_distance(optional_env!(lookup, "AIRLY_MAX_DISTANCE_KM"));
    let refresh_interval = refresh_interval(optional_env!(lookup, "AIRLY_REFRESH_MINUTES"));

    let api_url =
        optional_env!(lookup, "AIRLY_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
    let name =
        optional_env!(lookup, "ACCESSORY_NAME").unwrap_or_else(|| DEFAULT_ACCESSORY_NAME.into());
    let http_port = parse_env_u16!(lookup, "HTTP_PORT", DEFAULT_HTTP_PORT);

    Ok(Config {
        api_key,
        api_url,
        latitude,
        longitude,
        max_distance_km,
        refresh_interval,
        name,
        http_port,
    })
}

/// Parse and range-check a coordinate pair.
pub fn validate_coordinates(lat: &str, lng: &str) -> Result<(f64, f64)> {
    // ---
    let latitude = lat
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| (-90.0..=90.0).contains(v))
        .ok_or_else(|| anyhow!("Invalid latitude: {lat}. Must be a number between -90 and 90."))?;

    let longitude = lng
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| (-180.0..=180.0).contains(v))
        .ok_or_else(|| {
            anyhow!("Invalid longitude: {lng}. Must be a number between -180 and 180.")
        })?;

    Ok((latitude, longitude))
}

/// Search radius with the default applied to unusable input and a hard cap.
pub fn validate_max_distance(raw: Option<String>) -> f64 {
    // ---
    let parsed = raw.and_then(|v| v.trim().parse::<f64>().ok());
    match parsed {
        Some(km) if km > MAX_DISTANCE_CAP_KM => {
            tracing::warn!("maxDistance capped at {}km (was {})", MAX_DISTANCE_CAP_KM, km);
            MAX_DISTANCE_CAP_KM
        }
        Some(km) if km > 0.0 => km,
        _ => DEFAULT_MAX_DISTANCE_KM,
    }
}

/// Poll period from a minutes override, clamped to the rate-limit floor and
/// to at most one day.
pub fn refresh_interval(raw_minutes: Option<String>) -> Duration {
    // ---
    let default_minutes = MIN_REFRESH_INTERVAL_SECONDS.div_ceil(60) as f64;
    let minutes = raw_minutes
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|m| m.is_finite())
        .unwrap_or(default_minutes);

    let requested = (minutes * 60.0).round().min(SECONDS_PER_DAY as f64);
    let seconds = if requested > MIN_REFRESH_INTERVAL_SECONDS as f64 {
        requested as u64
    } else {
        MIN_REFRESH_INTERVAL_SECONDS
    };
    Duration::from_secs(seconds)
}

/// Whole minutes in `interval`, rounded to nearest, for log output.
pub fn interval_minutes(interval: Duration) -> u64 {
    // ---
    (interval.as_secs() + 30) / 60
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks the API key while showing all other values that were loaded.
    pub fn log_config(&self) {
        // ---
        let masked_key = match self.api_key.char_indices().nth(4) {
            Some((pos, _)) => format!("{}****", &self.api_key[..pos]),
            None => "****".to_string(),
        };

        tracing::info!("Configuration loaded:");
        tracing::info!("  ACCESSORY_NAME        : {}", self.name);
        tracing::info!("  AIRLY_API_KEY         : {}", masked_key);
        tracing::info!("  AIRLY_API_URL         : {}", self.api_url);
        tracing::info!("  AIRLY_LATITUDE        : {}", self.latitude);
        tracing::info!("  AIRLY_LONGITUDE       : {}", self.longitude);
        tracing::info!("  AIRLY_MAX_DISTANCE_KM : {}", self.max_distance_km);
        tracing::info!(
            "  AIRLY_REFRESH_MINUTES : {} (API limit: {})",
            interval_minutes(self.refresh_interval),
            MIN_REFRESH_INTERVAL_SECONDS.div_ceil(60)
        );
        tracing::info!("  HTTP_PORT             : {}", self.http_port);
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        // ---
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    fn base_vars() -> Vec<(&'static str, &'static str)> {
        vec![
            ("AIRLY_API_KEY", "abcdef123456"),
            ("AIRLY_LATITUDE", "50.0614"),
            ("AIRLY_LONGITUDE", "19.9366"),
        ]
    }

    #[test]
    fn test_rate_limit_floor() {
        // ---
        assert_eq!(MIN_REFRESH_INTERVAL_SECONDS, 864);
    }

    #[test]
    fn test_defaults_applied() {
        // ---
        let cfg = load_from(lookup_from(&base_vars())).unwrap();
        assert_eq!(cfg.api_key, "abcdef123456");
        assert_eq!(cfg.latitude, 50.0614);
        assert_eq!(cfg.longitude, 19.9366);
        assert_eq!(cfg.max_distance_km, 3.0);
        assert_eq!(cfg.refresh_interval, Duration::from_secs(900));
        assert_eq!(cfg.name, "Air2");
        assert_eq!(cfg.api_url, DEFAULT_API_URL);
        assert_eq!(cfg.http_port, 8080);
    }

    #[test]
    fn test_key_alias_accepted() {
        // ---
        let cfg = load_from(lookup_from(&[
            ("AIRLY_KEY", "alias-key"),
            ("AIRLY_LATITUDE", "0"),
            ("AIRLY_LONGITUDE", "0"),
        ]))
        .unwrap();
        assert_eq!(cfg.api_key, "alias-key");
    }

    #[test]
    fn test_missing_required_values_fail() {
        // ---
        let no_key = load_from(lookup_from(&[
            ("AIRLY_LATITUDE", "50"),
            ("AIRLY_LONGITUDE", "19"),
        ]));
        assert!(no_key.unwrap_err().to_string().contains("apikey"));

        let no_lat = load_from(lookup_from(&[
            ("AIRLY_API_KEY", "k"),
            ("AIRLY_LONGITUDE", "19"),
        ]));
        assert!(no_lat.unwrap_err().to_string().contains("latitude"));

        let empty_lng = load_from(lookup_from(&[
            ("AIRLY_API_KEY", "k"),
            ("AIRLY_LATITUDE", "50"),
            ("AIRLY_LONGITUDE", ""),
        ]));
        assert!(empty_lng.unwrap_err().to_string().contains("longitude"));
    }

    #[test]
    fn test_coordinate_ranges() {
        // ---
        assert!(validate_coordinates("91", "0").is_err());
        assert!(validate_coordinates("0", "-180.5").is_err());
        assert!(validate_coordinates("north", "0").is_err());
        assert_eq!(validate_coordinates("90", "-180").unwrap(), (90.0, -180.0));
        assert_eq!(validate_coordinates(" -90 ", "180").unwrap(), (-90.0, 180.0));
    }

    #[test]
    fn test_max_distance_default_and_cap() {
        // ---
        assert_eq!(validate_max_distance(None), 3.0);
        assert_eq!(validate_max_distance(Some("abc".into())), 3.0);
        assert_eq!(validate_max_distance(Some("0".into())), 3.0);
        assert_eq!(validate_max_distance(Some("-4".into())), 3.0);
        assert_eq!(validate_max_distance(Some("12.5".into())), 12.5);
        assert_eq!(validate_max_distance(Some("50".into())), 50.0);
        assert_eq!(validate_max_distance(Some("120".into())), 50.0);
    }

    #[test]
    fn test_refresh_interval_clamped_to_floor() {
        // ---
        assert_eq!(refresh_interval(Some("1".into())), Duration::from_secs(864));
        assert_eq!(refresh_interval(Some("-10".into())), Duration::from_secs(864));
        assert_eq!(refresh_interval(Some("30".into())), Duration::from_secs(1800));
        assert_eq!(refresh_interval(Some("20.5".into())), Duration::from_secs(1230));
        assert_eq!(refresh_interval(Some("soon".into())), Duration::from_secs(900));
        assert_eq!(refresh_interval(Some("1e12".into())), Duration::from_secs(86_400));
    }

    #[test]
    fn test_interval_minutes_rounds_to_nearest() {
        // ---
        assert_eq!(interval_minutes(Duration::from_secs(1210)), 20);
        assert_eq!(interval_minutes(Duration::from_secs(1230)), 21);
        assert_eq!(interval_minutes(Duration::from_secs(900)), 15);
        assert_eq!(interval_minutes(Duration::from_secs(864)), 14);
    }

    #[test]
    fn test_invalid_port_fails() {
        // ---
        let mut vars = base_vars();
        vars.push(("HTTP_PORT", "eighty"));
        assert!(load_from(lookup_from(&vars)).is_err());
    }
}
