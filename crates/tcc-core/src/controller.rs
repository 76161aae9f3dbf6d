// ── Controller ──
//
// Explicit context object for one portal account: the client, the
// discovered devices and the poller live here rather than in any global
// registry. Cheaply cloneable; background polling runs on a spawned task
// that stops when the cancellation token fires.

use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption};
use secrecy::SecretString;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tcc_api::{ComfortClient, Credentials};

use crate::command::{self, Command};
use crate::config::AccountConfig;
use crate::device::Thermostat;
use crate::discovery::{Location, discover};
use crate::error::CoreError;
use crate::model::{DeviceId, Snapshot};
use crate::poller::{PollStatus, Poller};

#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: AccountConfig,
    client: Arc<ComfortClient>,
    locations: ArcSwap<Vec<Location>>,
    poller: ArcSwapOption<Poller>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Controller {
    /// Build the client. Does NOT touch the network -- call
    /// [`connect()`](Self::connect) to log in and discover devices.
    pub fn new(config: AccountConfig) -> Result<Self, CoreError> {
        let client = ComfortClient::new(config.credentials(), config.client_config()?)?;
        Ok(Self {
            inner: Arc::new(ControllerInner {
                config,
                client: Arc::new(client),
                locations: ArcSwap::from_pointee(Vec::new()),
                poller: ArcSwapOption::empty(),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        })
    }

    pub fn config(&self) -> &AccountConfig {
        &self.inner.config
    }

    pub fn client(&self) -> &Arc<ComfortClient> {
        &self.inner.client
    }

    // ── Connection lifecycle ─────────────────────────────────────────

    /// Log in, discover every thermostat and set up the poller.
    ///
    /// `Authentication` means the credentials need to be re-entered;
    /// `RateLimited` and transient errors mean "try again later".
    pub async fn connect(&self) -> Result<(), CoreError> {
        let client = &self.inner.client;
        client.login().await?;

        let locations = discover(client).await?;
        let devices: Vec<Arc<Thermostat>> = locations
            .iter()
            .flat_map(|l| l.devices.iter().cloned())
            .collect();
        if devices.is_empty() {
            return Err(CoreError::NoDevices);
        }

        info!(
            locations = locations.len(),
            devices = devices.len(),
            "connected to portal"
        );
        let poller = Poller::new(Arc::clone(client), devices, self.inner.config.poller);
        self.inner.poller.store(Some(Arc::new(poller)));
        self.inner.locations.store(Arc::new(locations));
        Ok(())
    }

    /// Replace the account credentials and log in with them.
    pub async fn set_credentials(&self, username: impl Into<String>, password: SecretString) -> Result<(), CoreError> {
        let session = self.inner.client.session();
        session
            .set_credentials(Credentials::new(username, password))
            .await;
        session.login().await?;
        Ok(())
    }

    /// Cancel background tasks and wait for them to stop.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!("controller shut down");
    }

    /// One-shot: connect, run closure, shut down.
    pub async fn oneshot<F, Fut, T>(config: AccountConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Controller) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let controller = Controller::new(config)?;
        controller.connect().await?;
        let result = f(controller.clone()).await;
        controller.shutdown().await;
        result
    }

    // ── Polling ──────────────────────────────────────────────────────

    fn poller(&self) -> Result<Arc<Poller>, CoreError> {
        self.inner.poller.load_full().ok_or(CoreError::NotConnected)
    }

    /// Run one poll cycle now.
    pub async fn update(&self) -> Result<Arc<Snapshot>, CoreError> {
        self.poller()?.update().await
    }

    /// Snapshot of the last completed cycle (empty before the first).
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.inner
            .poller
            .load_full()
            .map(|p| p.snapshot())
            .unwrap_or_default()
    }

    /// Subscribe to poll phase changes.
    pub fn poll_status(&self) -> Result<watch::Receiver<PollStatus>, CoreError> {
        Ok(self.poller()?.subscribe())
    }

    /// Start polling every `config.poller.interval` until
    /// [`shutdown()`](Self::shutdown). The first cycle runs immediately.
    pub async fn spawn_polling(&self) -> Result<(), CoreError> {
        let poller = self.poller()?;
        let interval = self.inner.config.poller.interval;
        let cancel = self.inner.cancel.clone();
        let handle = tokio::spawn(poll_task(poller, interval, cancel));
        self.inner.task_handles.lock().await.push(handle);
        Ok(())
    }

    // ── Devices ──────────────────────────────────────────────────────

    pub fn locations(&self) -> Arc<Vec<Location>> {
        self.inner.locations.load_full()
    }

    pub fn devices(&self) -> Vec<Arc<Thermostat>> {
        self.inner
            .poller
            .load_full()
            .map(|p| p.devices().to_vec())
            .unwrap_or_default()
    }

    /// Look a device up by numeric id or (case-insensitive) name.
    pub fn device(&self, identifier: &str) -> Result<Arc<Thermostat>, CoreError> {
        let devices = self.devices();
        let by_id = identifier.parse::<DeviceId>().ok();
        devices
            .iter()
            .find(|d| Some(d.id()) == by_id)
            .or_else(|| devices.iter().find(|d| d.name().eq_ignore_ascii_case(identifier.trim())))
            .cloned()
            .ok_or_else(|| CoreError::DeviceNotFound {
                identifier: identifier.to_owned(),
            })
    }

    /// Run a command against one device with the configured retry.
    pub async fn execute(&self, device: &Thermostat, command: Command) -> Result<(), CoreError> {
        command::execute(device, command, &self.inner.config.command).await
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("url", &self.inner.config.url.as_str())
            .field("client", &self.inner.client)
            .finish_non_exhaustive()
    }
}

// ── Background tasks ─────────────────────────────────────────────────

async fn poll_task(poller: Arc<Poller>, interval: std::time::Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(e) = poller.update().await {
                    warn!(error = %e, "poll cycle failed");
                }
            }
        }
    }
}
