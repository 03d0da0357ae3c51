use crate::config::types::ConcurrencyConfig;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

/// A named concurrency bound. Each `open()` yields an independent semaphore
/// (one per host, per probe, per URL...) while the peak in-flight count is
/// shared so tests can assert the bound held everywhere.
#[derive(Debug, Clone)]
pub struct GateSpec {
    name: &'static str,
    limit: usize,
    peak: Arc<AtomicUsize>,
}

impl GateSpec {
    pub fn new(name: &'static str, limit: usize) -> Self {
        Self {
            name,
            limit: limit.max(1),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn open(&self) -> Gate {
        Gate {
            name: self.name,
            sem: Arc::new(Semaphore::new(self.limit)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: self.peak.clone(),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct Gate {
    name: &'static str,
    sem: Arc<Semaphore>,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl Gate {
    pub async fn enter(&self) -> Result<GatePass, AcquireError> {
        let permit = self.sem.clone().acquire_owned().await?;
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tracing::trace!(gate = self.name, in_flight = now, "gate entered");
        Ok(GatePass {
            _permit: permit,
            in_flight: self.in_flight.clone(),
        })
    }
}

pub struct GatePass {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for GatePass {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// The three nesting levels of bounded concurrency used during assessment.
#[derive(Debug, Clone)]
pub struct Limits {
    /// Global, across hosts.
    pub hosts: GateSpec,
    /// Per host: login HEAD requests.
    pub login: GateSpec,
    /// Per host: ports probed for MJPEG paths.
    pub mjpeg_ports: GateSpec,
    /// Per port: MJPEG paths in flight.
    pub mjpeg_paths: GateSpec,
    /// Per login URL: credential trials in flight.
    pub credentials: GateSpec,
}

impl Limits {
    pub fn from_config(cfg: &ConcurrencyConfig) -> Self {
        Self {
            hosts: GateSpec::new("hosts", cfg.max_hosts),
            login: GateSpec::new("login", cfg.login_probe),
            mjpeg_ports: GateSpec::new("mjpeg_ports", cfg.mjpeg_ports),
            mjpeg_paths: GateSpec::new("mjpeg_paths", cfg.mjpeg_paths),
            credentials: GateSpec::new("credentials", cfg.credential_trials),
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self::from_config(&ConcurrencyConfig::default())
    }
}
