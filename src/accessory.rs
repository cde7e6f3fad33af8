//! Consumer-facing state: the fault flag and the published sensor densities.

use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;

use crate::Sensor;

pub const MANUFACTURER: &str = "Airly";
pub const MODEL: &str = "API v2";

// ---

/// Receiver of side-effecting notifications from the refresh engine.
pub trait ConsumerSink: Send + Sync {
    /// Raise or clear the fault indicator.
    fn set_status_fault(&self, fault: bool);

    /// Publish a fresh concentration for `sensor`.
    fn set_sensor_value(&self, sensor: Sensor, value: f64);
}

/// Point-in-time copy of the accessory characteristics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AccessorySnapshot {
    pub status_fault: bool,
    pub pm2_5_density: Option<f64>,
    pub pm10_density: Option<f64>,
}

/// In-memory accessory characteristics shared with the status API.
#[derive(Debug, Clone)]
pub struct AccessoryState {
    pub name: String,
    inner: Arc<RwLock<AccessorySnapshot>>,
}

impl AccessoryState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: Arc::default(),
        }
    }

    pub fn snapshot(&self) -> AccessorySnapshot {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update(&self, apply: impl FnOnce(&mut AccessorySnapshot)) {
        let mut snapshot = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        apply(&mut snapshot);
    }
}

impl ConsumerSink for AccessoryState {
    fn set_status_fault(&self, fault: bool) {
        self.update(|s| s.status_fault = fault);
    }

    fn set_sensor_value(&self, sensor: Sensor, value: f64) {
        self.update(|s| match sensor {
            Sensor::Pm25 => s.pm2_5_density = Some(value),
            Sensor::Pm10 => s.pm10_density = Some(value),
        });
    }
}
