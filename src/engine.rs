//! Refresh engine: cache, single-flight fetching and the consumer read path.
//!
//! At most one fetch runs at a time. The first caller spawns a worker task and
//! parks a `watch` receiver in the engine state; callers arriving while it runs
//! subscribe to that receiver and all observe the same outcome. The marker is
//! cleared by a drop guard before the outcome is published, so it is released
//! even if the worker panics.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use chrono::Utc;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::{
    transport::{HTTP_TIMEOUT, INDEX_TYPE},
    AirQuality, ConsumerSink, FetchError, Measurement, MeasurementRequest, RefreshError, Sensor,
    Transport,
};

/// Result of one refresh: the new index value, or `None` when the response
/// carried no usable measurement.
pub type RefreshOutcome = Result<Option<f64>, RefreshError>;

type InFlight = watch::Receiver<Option<RefreshOutcome>>;

// ---

/// Where a payload handed to [`RefreshEngine::update_data`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateSource {
    /// A live network fetch; advances the freshness timestamp.
    Fetch,
    /// Replay of an already cached payload.
    Cache,
}

/// Most recent accepted measurement.
#[derive(Debug, Clone)]
pub struct CachedReading {
    pub measurement: Arc<Measurement>,
    pub index_value: f64,
}

/// Single cache slot. Both fields are written under one lock.
#[derive(Debug, Clone, Default)]
pub struct Cache {
    pub reading: Option<CachedReading>,
    pub last_fetch_epoch_seconds: i64,
}

#[derive(Default)]
struct EngineState {
    cache: Cache,
    in_flight: Option<InFlight>,
}

struct Inner {
    transport: Arc<dyn Transport>,
    sink: Arc<dyn ConsumerSink>,
    request: MeasurementRequest,
    fetch_timeout: Duration,
    state: Mutex<EngineState>,
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cheaply cloneable handle to the shared engine.
#[derive(Clone)]
pub struct RefreshEngine {
    inner: Arc<Inner>,
}

/// Clears the in-flight marker when the worker finishes, however it finishes.
/// A panicking fetch is reported like a communication failure.
struct InFlightGuard<'a> {
    inner: &'a Inner,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.inner.sink.set_status_fault(true);
            error!("Error reading data from Airly Network: refresh task panicked");
        }
        self.inner.lock_state().in_flight = None;
    }
}

impl RefreshEngine {
    pub fn new(
        transport: Arc<dyn Transport>,
        sink: Arc<dyn ConsumerSink>,
        request: MeasurementRequest,
    ) -> Self {
        Self::with_fetch_timeout(transport, sink, request, HTTP_TIMEOUT)
    }

    /// Like [`RefreshEngine::new`], with a custom bound around each transport call.
    pub fn with_fetch_timeout(
        transport: Arc<dyn Transport>,
        sink: Arc<dyn ConsumerSink>,
        request: MeasurementRequest,
        fetch_timeout: Duration,
    ) -> Self {
        // ---
        Self {
            inner: Arc::new(Inner {
                transport,
                sink,
                request,
                fetch_timeout,
                state: Mutex::default(),
            }),
        }
    }

    /// Category of the cached reading, without waiting on the network.
    ///
    /// With an empty cache this starts a background refresh, raises the fault
    /// indicator and answers [`AirQuality::Unknown`]. A stale reading is still
    /// served. Must be called from within a Tokio runtime.
    pub fn current_category(&self) -> AirQuality {
        // ---
        let cached = self
            .inner
            .lock_state()
            .cache
            .reading
            .as_ref()
            .map(|reading| reading.index_value);

        match cached {
            Some(index_value) => AirQuality::from_index(index_value),
            None => {
                // Raised before the fetch starts so a fast success can clear it.
                self.inner.sink.set_status_fault(true);
                // Outcome is not awaited; the worker logs its own failure.
                drop(self.join_or_start());
                AirQuality::Unknown
            }
        }
    }

    /// Fetch a fresh measurement, sharing any fetch already in flight.
    pub async fn refresh(&self) -> RefreshOutcome {
        // ---
        let mut outcome = self.join_or_start();
        let published = outcome
            .wait_for(Option::is_some)
            .await
            .map(|value| (*value).clone());

        match published {
            Ok(Some(result)) => result,
            Ok(None) | Err(_) => Err(RefreshError::Aborted),
        }
    }

    /// Normalize `payload` and commit it to the cache.
    ///
    /// Returns the index value, or `None` (leaving the cache alone) when the
    /// payload has no current measurement. Sensors present in the reading are
    /// published to the consumer; missing ones are left as they were.
    pub fn update_data(&self, payload: &Value, source: UpdateSource) -> Option<f64> {
        // ---
        let Some(measurement) = Measurement::from_payload(payload) else {
            warn!("Airly response does not contain current measurement data");
            return None;
        };

        self.inner.sink.set_status_fault(false);
        for sensor in Sensor::ALL {
            if let Some(value) = measurement.sensor_value(sensor.api_name()) {
                self.inner.sink.set_sensor_value(sensor, value);
            }
        }

        let index_value = measurement.index_value();
        if source == UpdateSource::Fetch {
            info!("Parsed Airly measurement {}={}", INDEX_TYPE, index_value);
        }

        let mut state = self.inner.lock_state();
        state.cache.reading = Some(CachedReading {
            measurement: Arc::new(measurement),
            index_value,
        });
        if source == UpdateSource::Fetch {
            state.cache.last_fetch_epoch_seconds = Utc::now().timestamp();
        }

        Some(index_value)
    }

    /// Copy of the cache slot.
    pub fn cache(&self) -> Cache {
        self.inner.lock_state().cache.clone()
    }

    pub fn last_fetch_epoch_seconds(&self) -> i64 {
        self.inner.lock_state().cache.last_fetch_epoch_seconds
    }

    pub fn is_fetching(&self) -> bool {
        self.inner.lock_state().in_flight.is_some()
    }

    fn join_or_start(&self) -> InFlight {
        // ---
        let mut state = self.inner.lock_state();
        if let Some(in_flight) = &state.in_flight {
            return in_flight.clone();
        }

        let (tx, rx) = watch::channel(None);
        state.in_flight = Some(rx.clone());
        drop(state);

        let engine = self.clone();
        tokio::spawn(async move { engine.run_fetch(tx).await });
        rx
    }

    async fn run_fetch(self, tx: watch::Sender<Option<RefreshOutcome>>) {
        // ---
        let guard = InFlightGuard { inner: &self.inner };
        let outcome = self.fetch_and_commit().await;
        drop(guard);
        tx.send_replace(Some(outcome));
    }

    async fn fetch_and_commit(&self) -> RefreshOutcome {
        // ---
        let inner = &self.inner;
        let fetched = tokio::time::timeout(
            inner.fetch_timeout,
            inner.transport.get_json(&inner.request),
        )
        .await
        .unwrap_or(Err(FetchError::Timeout(inner.fetch_timeout)));

        match fetched {
            Ok(payload) => Ok(self.update_data(&payload, UpdateSource::Fetch)),
            Err(err) => {
                inner.sink.set_status_fault(true);
                if let Some(body) = err.body_excerpt() {
                    error!("Airly error response body: {}", body);
                }
                error!("Error reading data from Airly Network: {}", err);
                Err(RefreshError::ServiceCommunication(err))
            }
        }
    }
}
