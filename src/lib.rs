//! Airly air-quality polling service.
//!
//! The library holds the refresh core: a single-flight [`RefreshEngine`] that
//! fetches the nearest CAQI measurement through a [`Transport`], normalizes the
//! payload into a [`Measurement`], caches it and classifies it into an
//! [`AirQuality`] band, plus the [`Poller`] that drives it on a fixed interval.
//! The binary wires these to the environment configuration and the HTTP
//! status API in [`routes`].

pub mod accessory;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod normalize;
pub mod routes;
pub mod scheduler;
pub mod transport;

#[cfg(test)]
mod test_support;

// Re-exported so sibling modules depend on the crate root rather than on
// each other's paths.
pub use accessory::{AccessorySnapshot, AccessoryState, ConsumerSink};
pub use classify::AirQuality;
pub use config::Config;
pub use engine::{Cache, CachedReading, RefreshEngine, RefreshOutcome, UpdateSource};
pub use error::{FetchError, RefreshError};
pub use models::{Measurement, Sensor};
pub use scheduler::Poller;
pub use transport::{HttpTransport, MeasurementRequest, Transport};
