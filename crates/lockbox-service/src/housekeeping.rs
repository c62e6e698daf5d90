//! Periodic background sweep.

use crate::context::AccessContext;
use crate::service::SmartLockService;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

/// Runs [`SmartLockService::sweep`] on a fixed interval.
pub struct Housekeeper {
    service: Arc<SmartLockService>,
    interval: Duration,
}

impl Housekeeper {
    /// Sweep on the service's configured interval.
    pub fn new(service: Arc<SmartLockService>) -> Self {
        let interval = service.config().sweep_interval;
        Self { service, interval }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Spawn the sweep loop. The first sweep runs immediately.
    pub fn start(self) -> HousekeeperHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let Housekeeper { service, interval } = self;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let ctx = AccessContext::system();
            let mut sweeps = 0u64;

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        debug!("Housekeeper received shutdown signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        match service.sweep(Utc::now(), &ctx).await {
                            Ok(report) => {
                                sweeps += 1;
                                debug!(?report, "Sweep finished");
                            }
                            Err(e) => error!("Sweep failed: {}", e),
                        }
                    }
                }
            }

            sweeps
        });

        info!(interval_secs = interval.as_secs_f64(), "Housekeeper started");
        HousekeeperHandle {
            shutdown_tx: Some(shutdown_tx),
            task,
        }
    }
}

/// Handle to a running [`Housekeeper`].
pub struct HousekeeperHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<u64>,
}

impl HousekeeperHandle {
    /// Stop the loop after any sweep in flight finishes.
    ///
    /// Returns the number of successful sweeps.
    pub async fn shutdown(mut self) -> u64 {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        match (&mut self.task).await {
            Ok(sweeps) => {
                info!(sweeps, "Housekeeper stopped");
                sweeps
            }
            Err(e) => {
                error!("Housekeeper task failed: {}", e);
                0
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for HousekeeperHandle {
    fn drop(&mut self) {
        if self.shutdown_tx.is_some() {
            self.task.abort();
        }
    }
}
