//! The three long-running scheduler loops.

use std::sync::Arc;

use graphsplit_core::JobSignals;
use graphsplit_store::Store;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::backoff::Backoff;
use crate::client::WorkerClient;
use crate::completion::{poll_one, PollOutcome};
use crate::config::SchedulerConfig;
use crate::decomposition::{decompose_next, DecomposeOutcome};
use crate::dispatch::{dispatch_one, DispatchOutcome};
use crate::shutdown::Shutdown;

pub struct Scheduler<S: Store> {
    store: Arc<S>,
    client: Arc<dyn WorkerClient>,
    config: SchedulerConfig,
    shutdown: Arc<Shutdown>,
}

/// Running loops. Dropping the handle does not stop them; call
/// [`SchedulerHandle::shutdown`].
pub struct SchedulerHandle {
    shutdown: Arc<Shutdown>,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl<S: Store> Scheduler<S> {
    pub fn new(store: Arc<S>, client: Arc<dyn WorkerClient>, config: SchedulerConfig) -> Self {
        Self { store, client, config, shutdown: Arc::new(Shutdown::new()) }
    }

    /// Start the decomposition, dispatch and completion loops.
    ///
    /// `signals` wakes the decomposition loop early; closing the channel
    /// stops that loop.
    pub fn spawn(self, signals: JobSignals) -> SchedulerHandle {
        let this = Arc::new(self);
        info!(
            decompose_interval_secs = this.config.decompose_interval_secs,
            poll_interval_ms = this.config.poll_interval_ms,
            "scheduler: starting loops"
        );

        let tasks = vec![
            ("decomposition", tokio::spawn(this.clone().decomposition_loop(signals))),
            ("dispatch", tokio::spawn(this.clone().dispatch_loop())),
            ("completion", tokio::spawn(this.clone().completion_loop())),
        ];
        SchedulerHandle { shutdown: this.shutdown.clone(), tasks }
    }

    async fn decomposition_loop(self: Arc<Self>, mut signals: JobSignals) {
        let interval = self.config.decompose_interval();
        while !self.shutdown.is_triggered() {
            match decompose_next(self.store.as_ref(), &self.config.partition).await {
                Ok(DecomposeOutcome::Idle) => debug!("scheduler: no pending job"),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "scheduler: decomposition failed, will retry"),
            }

            tokio::select! {
                _ = self.shutdown.wait() => break,
                signal = signals.recv() => {
                    if signal.is_none() {
                        info!("scheduler: job notification channel closed");
                        break;
                    }
                }
                _ = tokio::time::sleep(interval) => {}
            }
        }
        info!("scheduler: decomposition loop stopped");
    }

    async fn dispatch_loop(self: Arc<Self>) {
        let mut backoff = Backoff::new(self.config.dispatch_retry.clone());
        while !self.shutdown.is_triggered() {
            let wait = match dispatch_one(self.store.as_ref(), self.client.as_ref()).await {
                Ok(DispatchOutcome::Idle) => {
                    backoff.reset();
                    debug!("scheduler: no task to dispatch");
                    self.config.dispatch_idle()
                }
                Ok(DispatchOutcome::Dispatched(_)) => {
                    backoff.reset();
                    self.config.dispatch_pause()
                }
                Err(e) => {
                    let delay = backoff.fail();
                    warn!(
                        error = %e,
                        attempt = backoff.failures(),
                        retry_in_ms = delay.as_millis() as u64,
                        "scheduler: dispatch failed"
                    );
                    delay
                }
            };
            if !self.shutdown.sleep(wait).await {
                break;
            }
        }
        info!("scheduler: dispatch loop stopped");
    }

    async fn completion_loop(self: Arc<Self>) {
        let mut backoff = Backoff::new(self.config.poll_retry.clone());
        while !self.shutdown.is_triggered() {
            let wait = match poll_one(self.store.as_ref(), self.client.as_ref()).await {
                Ok(PollOutcome::Idle) => {
                    backoff.reset();
                    debug!("scheduler: no executing task");
                    self.config.poll_idle()
                }
                Ok(_) => {
                    backoff.reset();
                    self.config.poll_interval()
                }
                Err(e) => {
                    let delay = backoff.fail();
                    warn!(
                        error = %e,
                        attempt = backoff.failures(),
                        retry_in_ms = delay.as_millis() as u64,
                        "scheduler: poll failed"
                    );
                    delay
                }
            };
            if !self.shutdown.sleep(wait).await {
                break;
            }
        }
        info!("scheduler: completion loop stopped");
    }
}

impl SchedulerHandle {
    /// Ask the loops to stop at their next wait without waiting for them.
    pub fn stop(&self) {
        self.shutdown.trigger();
    }

    /// Stop the loops and wait for the work in flight to finish.
    pub async fn shutdown(self) {
        self.shutdown.trigger();
        for (name, handle) in self.tasks {
            if let Err(e) = handle.await {
                warn!(loop_name = name, error = %e, "scheduler: loop panicked");
            }
        }
        info!("scheduler: stopped");
    }
}
