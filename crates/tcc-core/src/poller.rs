// ── Polling orchestrator ──
//
// One `update()` call is one poll cycle: make sure the session is up,
// refresh every device concurrently, then decide between a fresh snapshot,
// the previous snapshot (transient trouble) and a fatal error. Cycles are
// serialised by the mutex that also owns the consecutive-error counter.

use std::collections::BTreeMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tracing::{debug, error, info, warn};

use tcc_api::{ComfortClient, Error};

use crate::config::PollerConfig;
use crate::device::Thermostat;
use crate::error::CoreError;
use crate::model::{DeviceStatus, Snapshot};

// ── Status ───────────────────────────────────────────────────────────

/// Where the poller is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PollPhase {
    Idle,
    Authenticating,
    RefreshingDevices,
    /// The last cycle completed and produced a new snapshot.
    Success,
    /// The last cycle failed transiently; the previous snapshot was served.
    DegradedStale,
    /// The last cycle escalated to the caller.
    Fatal,
}

/// Published on every phase change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollStatus {
    pub phase: PollPhase,
    /// Outcome of the last finished cycle (`Success`, `DegradedStale` or
    /// `Fatal`), if any.
    pub last_outcome: Option<PollPhase>,
    pub consecutive_errors: u32,
    pub last_error: Option<String>,
    pub last_success_at: Option<DateTime<Utc>>,
    /// Cycles finished so far, whatever their outcome.
    pub cycles: u64,
}

impl Default for PollStatus {
    fn default() -> Self {
        Self {
            phase: PollPhase::Idle,
            last_outcome: None,
            consecutive_errors: 0,
            last_error: None,
            last_success_at: None,
            cycles: 0,
        }
    }
}

enum CycleOutcome {
    Completed { snapshot: Snapshot, failed: usize },
    Failed(Error),
}

// ── Poller ───────────────────────────────────────────────────────────

pub struct Poller {
    client: Arc<ComfortClient>,
    devices: Vec<Arc<Thermostat>>,
    config: PollerConfig,
    snapshot: ArcSwap<Snapshot>,
    /// Consecutive cycle-level failures. Held for the whole cycle.
    consecutive_errors: Mutex<u32>,
    status: watch::Sender<PollStatus>,
}

impl Poller {
    pub fn new(client: Arc<ComfortClient>, devices: Vec<Arc<Thermostat>>, config: PollerConfig) -> Self {
        let (status, _) = watch::channel(PollStatus::default());
        Self {
            client,
            devices,
            config,
            snapshot: ArcSwap::from_pointee(Snapshot::default()),
            consecutive_errors: Mutex::new(0),
            status,
        }
    }

    /// Snapshot of the last completed cycle.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.load_full()
    }

    pub fn devices(&self) -> &[Arc<Thermostat>] {
        &self.devices
    }

    pub fn subscribe(&self) -> watch::Receiver<PollStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> PollStatus {
        self.status.borrow().clone()
    }

    pub async fn consecutive_errors(&self) -> u32 {
        *self.consecutive_errors.lock().await
    }

    /// Run one poll cycle.
    ///
    /// Returns the new snapshot, or the previous one when the cycle failed
    /// in a way that is expected to clear up (rate limit, outage below the
    /// threshold). Everything else is `CoreError::UpdateFailed`.
    pub async fn update(&self) -> Result<Arc<Snapshot>, CoreError> {
        let mut errors = self.consecutive_errors.lock().await;
        let mut restarts = 0;

        loop {
            let err = match self.run_cycle().await {
                CycleOutcome::Completed { snapshot, failed } => {
                    let snapshot = Arc::new(snapshot);
                    self.snapshot.store(Arc::clone(&snapshot));
                    if failed == 0 {
                        *errors = 0;
                    }
                    info!(
                        devices = snapshot.devices.len(),
                        available = snapshot.available_count(),
                        failed,
                        "poll cycle complete"
                    );
                    self.finish(PollPhase::Success, *errors, None);
                    return Ok(snapshot);
                }
                CycleOutcome::Failed(err) => err,
            };

            if matches!(err, Error::Unauthorized { .. }) && restarts < self.config.reauth_cycle_retries {
                restarts += 1;
                warn!(error = %err, "session rejected mid-cycle, logging in again");
                match self.client.login().await {
                    Ok(()) => continue,
                    Err(login_err) => return self.fail(&mut *errors, login_err),
                }
            }
            return self.fail(&mut *errors, err);
        }
    }

    async fn run_cycle(&self) -> CycleOutcome {
        self.set_phase(PollPhase::Authenticating);
        if let Err(e) = self.client.ensure_authenticated().await {
            return CycleOutcome::Failed(e);
        }

        self.set_phase(PollPhase::RefreshingDevices);
        let results = join_all(self.devices.iter().map(|device| async move {
            let result = device.refresh().await;
            (device, result)
        }))
        .await;

        let mut statuses = BTreeMap::new();
        let mut failures = Vec::new();
        for (device, result) in results {
            let reading = device.reading();
            let (available, last_error) = match result {
                Ok(()) => (reading.as_ref().is_some_and(|r| r.is_alive), None),
                Err(e) => {
                    warn!(device = %device.id(), name = device.name(), error = %e, "device refresh failed");
                    let message = e.to_string();
                    failures.push(e);
                    (false, Some(message))
                }
            };
            statuses.insert(
                device.id(),
                DeviceStatus {
                    id: device.id(),
                    name: device.name().to_owned(),
                    reading,
                    available,
                    last_error,
                },
            );
        }

        if let Some(err) = escalate(failures.as_mut_slice(), self.devices.len()) {
            return CycleOutcome::Failed(err);
        }

        let failed = failures.len();
        CycleOutcome::Completed {
            snapshot: Snapshot {
                devices: statuses,
                completed_at: Some(Utc::now()),
            },
            failed,
        }
    }

    /// Count a failed cycle and decide between stale data and escalation.
    fn fail(&self, errors: &mut u32, err: Error) -> Result<Arc<Snapshot>, CoreError> {
        let previous = *errors;
        *errors = previous.saturating_add(1);
        let count = *errors;

        let stale = match &err {
            Error::RateLimited { .. } => {
                warn!(error = %err, consecutive_errors = count, "rate limited, serving previous data");
                true
            }
            e if e.is_transient() && previous < self.config.error_threshold => {
                warn!(
                    error = %err,
                    consecutive_errors = count,
                    threshold = self.config.error_threshold,
                    "portal unavailable, serving previous data"
                );
                true
            }
            _ => false,
        };

        if stale {
            self.finish(PollPhase::DegradedStale, count, Some(err.to_string()));
            return Ok(self.snapshot());
        }

        let reason = match &err {
            Error::Authentication { .. } => "re-authentication failed".to_owned(),
            Error::Unauthorized { .. } => "session rejected again after logging in".to_owned(),
            e if e.is_transient() => format!("portal unreachable after {count} consecutive failed cycles"),
            _ => "unexpected error during update".to_owned(),
        };
        error!(error = %err, consecutive_errors = count, "{reason}");
        self.finish(PollPhase::Fatal, count, Some(err.to_string()));
        Err(CoreError::UpdateFailed { reason, source: err })
    }

    fn set_phase(&self, phase: PollPhase) {
        self.status.send_modify(|s| s.phase = phase);
    }

    /// Publish the cycle outcome and settle back to `Idle` unless fatal.
    fn finish(&self, outcome: PollPhase, consecutive_errors: u32, last_error: Option<String>) {
        debug!(%outcome, consecutive_errors, "poll cycle finished");
        self.status.send_modify(|s| {
            s.phase = if outcome == PollPhase::Fatal {
                PollPhase::Fatal
            } else {
                PollPhase::Idle
            };
            s.last_outcome = Some(outcome);
            s.consecutive_errors = consecutive_errors;
            if outcome == PollPhase::Success {
                s.last_success_at = Some(Utc::now());
            }
            s.last_error = last_error;
            s.cycles = s.cycles.saturating_add(1);
        });
    }
}

/// Cycle-level verdict on device failures, most serious first: any
/// `Authentication`, then `Unauthorized`, then `RateLimited`, then an
/// outage that took out every device.
fn escalate(failures: &mut [Error], device_count: usize) -> Option<Error> {
    let take = |failures: &mut [Error], pred: fn(&Error) -> bool| {
        failures
            .iter_mut()
            .find(|e| pred(e))
            .map(|e| std::mem::replace(e, Error::RetriesExhausted { attempts: 0 }))
    };

    take(failures, |e| matches!(e, Error::Authentication { .. }))
        .or_else(|| take(failures, |e| matches!(e, Error::Unauthorized { .. })))
        .or_else(|| take(failures, |e| matches!(e, Error::RateLimited { .. })))
        .or_else(|| {
            let all_failed = device_count > 0 && failures.len() == device_count;
            if all_failed && failures.iter().all(Error::is_transient) {
                take(failures, Error::is_transient)
            } else {
                None
            }
        })
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("devices", &self.devices.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
