use crate::{
    clock::Clock,
    reconciler::{JobHandle, Reconciler},
    service::Service,
};
use core::time::Duration;
use db::Store;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Tunables of the process-wide context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Settings {
    /// Period of the status reconciler.
    pub reconcile_every: Duration,
    /// Upper bound on a single store round-trip.
    pub store_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self { reconcile_every: Duration::from_secs(60), store_timeout: Duration::from_secs(5) }
    }
}

/// Everything the process shares between requests: the service (and through it the store and
/// the clock) plus the reconciler job. Must be created inside a Tokio runtime.
pub struct Context<S, C> {
    service: Arc<Service<S, C>>,
    job: JobHandle,
    /// Background task that drives the store's connection, if it has one.
    driver: Option<JoinHandle<()>>,
}

impl<S: Store, C: Clock> Context<S, C> {
    pub fn start(store: S, clock: C, settings: Settings) -> Self {
        let store = Arc::new(store);
        let clock = Arc::new(clock);
        let reconciler = Reconciler::new(store.clone(), clock.clone(), settings.store_timeout);
        let job = reconciler.spawn(settings.reconcile_every);
        let service = Arc::new(Service::new(store, clock, settings.store_timeout));
        Self { service, job, driver: None }
    }

    /// Hands over the task driving the store connection so that shutdown can release it.
    pub fn with_driver(mut self, driver: JoinHandle<()>) -> Self {
        self.driver = Some(driver);
        self
    }

    pub fn service(&self) -> Arc<Service<S, C>> {
        self.service.clone()
    }

    /// Stops the reconciler, waits for it, then releases the store connection.
    pub async fn shutdown(self) {
        let Self { service, job, driver } = self;
        job.shutdown().await;
        drop(service);

        let Some(driver) = driver else {
            return;
        };
        driver.abort();
        match driver.await {
            Ok(()) => log::info!("Store connection closed."),
            Err(err) if err.is_cancelled() => log::info!("Store connection released."),
            Err(err) => log::error!("Store connection task failed: {err}"),
        }
    }
}
