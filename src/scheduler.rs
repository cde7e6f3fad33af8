//! Periodic polling of the refresh engine.
//!
//! The poll loop runs as a background task with two stop signals: a private
//! one used by [`Poller::stop`] and restarts, and the host's shutdown flag.

use std::{
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tokio::{
    sync::{oneshot, watch},
    task::JoinHandle,
    time::MissedTickBehavior,
};
use tracing::{debug, info};

use crate::{
    config::{interval_minutes, MIN_REFRESH_INTERVAL_SECONDS},
    RefreshEngine,
};

// ---

struct PollTask {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Drives [`RefreshEngine::refresh`] immediately and then on a fixed interval.
pub struct Poller {
    engine: RefreshEngine,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
    running: Mutex<Option<PollTask>>,
}

impl Poller {
    /// `interval` is raised to the rate-limit floor if needed. Polling ends
    /// for good once `shutdown` turns `true` or its sender is dropped.
    pub fn new(engine: RefreshEngine, interval: Duration, shutdown: watch::Receiver<bool>) -> Self {
        // ---
        let floor = Duration::from_secs(MIN_REFRESH_INTERVAL_SECONDS);
        Self {
            engine,
            interval: interval.max(floor),
            shutdown,
            running: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start polling, replacing any loop that is already running.
    pub fn start(&self) {
        // ---
        let mut running = self.lock_running();
        if let Some(previous) = running.take() {
            let _ = previous.stop.send(());
        }

        let (stop, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(poll_loop(
            self.engine.clone(),
            self.interval,
            stop_rx,
            self.shutdown.clone(),
        ));
        *running = Some(PollTask { stop, handle });

        info!(
            "Polling Airly every {} minutes (API limit: {} minutes)",
            interval_minutes(self.interval),
            MIN_REFRESH_INTERVAL_SECONDS.div_ceil(60)
        );
    }

    /// Stop polling. Fetches already in flight are left to finish.
    pub fn stop(&self) {
        // ---
        if let Some(task) = self.lock_running().take() {
            let _ = task.stop.send(());
            debug!("Polling stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock_running()
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    fn lock_running(&self) -> MutexGuard<'_, Option<PollTask>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn poll_loop(
    engine: RefreshEngine,
    period: Duration,
    mut stop: oneshot::Receiver<()>,
    mut shutdown: watch::Receiver<bool>,
) {
    // ---
    if *shutdown.borrow_and_update() {
        return;
    }

    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = &mut stop => break,
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("Shutdown signalled, polling stopped");
                    break;
                }
            }
            _ = ticker.tick() => {
                // A tick never waits for the previous refresh; the engine dedups.
                let engine = engine.clone();
                tokio::spawn(async move {
                    if let Err(err) = engine.refresh().await {
                        debug!("Polling refresh failed: {}", err);
                    }
                });
            }
        }
    }
}
