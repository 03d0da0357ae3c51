use futures::FutureExt;
use reqwest::Client;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{self, JoinSet};

use super::deadline::Deadline;
use super::models::{HostAssessment, PortSet};
use super::ports;
use super::probes::ProbeSet;
use crate::credentials::{Credential, CredentialTester};
use crate::fingerprint::{correlate, FingerprintEngine};
use crate::plugins::snapshot::{self, SnapshotGroup};
use crate::utils::gate::GateSpec;

pub struct CredentialPlan {
    pub tester: CredentialTester,
    pub creds: Arc<Vec<Credential>>,
}

pub struct SnapshotPlan {
    pub group: Arc<SnapshotGroup>,
    pub client: Client,
    pub out_dir: PathBuf,
    pub request_timeout: Duration,
}

#[derive(Debug, Default)]
pub struct SnapshotCounters {
    pub attempts: AtomicUsize,
    pub saved: AtomicUsize,
}

/// Assesses every verified host, at most `hosts.limit()` at a time.
pub struct HostOrchestrator {
    probes: ProbeSet,
    fingerprints: Arc<FingerprintEngine>,
    hosts: GateSpec,
    credentials: Option<CredentialPlan>,
    snapshots: Option<SnapshotPlan>,
    snapshot_counters: Arc<SnapshotCounters>,
}

impl HostOrchestrator {
    pub fn new(probes: ProbeSet, fingerprints: Arc<FingerprintEngine>, hosts: GateSpec) -> Self {
        Self {
            probes,
            fingerprints,
            hosts,
            credentials: None,
            snapshots: None,
            snapshot_counters: Arc::new(SnapshotCounters::default()),
        }
    }

    pub fn with_credentials(mut self, plan: CredentialPlan) -> Self {
        self.credentials = Some(plan);
        self
    }

    pub fn with_snapshots(mut self, plan: SnapshotPlan) -> Self {
        self.snapshots = Some(plan);
        self
    }

    pub fn snapshot_counters(&self) -> (usize, usize) {
        (
            self.snapshot_counters.attempts.load(Ordering::SeqCst),
            self.snapshot_counters.saved.load(Ordering::SeqCst),
        )
    }

    /// One record per host in `verified`, in completion order. A failing or
    /// panicking host is reported through its `error` field.
    pub async fn assess_all<F>(
        self: &Arc<Self>,
        verified: &PortSet,
        deadline: Deadline,
        mut on_done: F,
    ) -> Vec<HostAssessment>
    where
        F: FnMut(&HostAssessment),
    {
        tracing::info!("Assessing {} host(s), {} at a time", verified.len(), self.hosts.limit());
        let gate = self.hosts.open();
        let mut tasks = JoinSet::new();
        let mut pending = HashMap::with_capacity(verified.len());

        for (host, open) in verified.iter() {
            let this = self.clone();
            let gate = gate.clone();
            let host = host.clone();
            let open: Vec<u16> = open.iter().copied().collect();
            let owner = (host.clone(), open.clone());
            let handle = tasks.spawn(async move {
                let _pass = match gate.enter().await {
                    Ok(pass) => pass,
                    Err(e) => return HostAssessment::failed(host, open, format!("host gate closed: {}", e)),
                };
                let work = {
                    let this = this.clone();
                    let host = host.clone();
                    let open = open.clone();
                    async move { this.assess_host(&host, &open, deadline).await }
                };
                isolated(host, open, work).await
            });
            pending.insert(handle.id(), owner);
        }

        collect(tasks, pending, on_done).await
    }

    pub async fn assess_host(&self, host: &str, open: &[u16], deadline: Deadline) -> HostAssessment {
        tracing::info!(host, ports = ?open, "assessing host");
        let (http_ports, rtsp_ports) = ports::classify(open);

        if !http_ports.is_empty() {
            self.launch_snapshot(host, &http_ports);
        }

        let report = self.probes.run(host, &http_ports, &rtsp_ports, deadline).await;

        let (vendor, note) = self
            .fingerprints
            .detect(&report.http.server, &report.http.body, &report.rtsp.server);
        let vulnerabilities = correlate(&vendor);

        let credential = match &self.credentials {
            Some(plan) if !report.login_urls.is_empty() => plan
                .tester
                .find(&report.login_urls, plan.creds.clone(), deadline)
                .await
                .map(|c| c.to_string())
                .unwrap_or_default(),
            _ => String::new(),
        };

        let error = deadline
            .is_elapsed()
            .then(|| "run deadline elapsed; results may be partial".to_string());

        HostAssessment {
            host: host.to_string(),
            ports: open.to_vec(),
            http_ports,
            rtsp_ports,
            http: report.http,
            login_urls: report.login_urls,
            rtsp: report.rtsp,
            onvif: report.onvif,
            mjpeg_urls: report.mjpeg_urls,
            vendor,
            note,
            vulnerabilities,
            credential,
            error,
        }
    }

    fn launch_snapshot(&self, host: &str, http_ports: &[u16]) {
        let Some(plan) = &self.snapshots else { return };
        self.snapshot_counters.attempts.fetch_add(1, Ordering::SeqCst);

        let client = plan.client.clone();
        let host = host.to_string();
        let http_ports = http_ports.to_vec();
        let out_dir = plan.out_dir.clone();
        let request_timeout = plan.request_timeout;
        let counters = self.snapshot_counters.clone();

        plan.group.spawn(async move {
            match snapshot::capture(&client, &host, &http_ports, &out_dir, request_timeout).await {
                Ok(Some(path)) => {
                    counters.saved.fetch_add(1, Ordering::SeqCst);
                    tracing::info!(host = %host, path = %path.display(), "snapshot saved");
                }
                Ok(None) => tracing::debug!(host = %host, "no snapshot endpoint answered"),
                Err(e) => tracing::warn!(host = %host, error = %e, "snapshot capture failed"),
            }
        });
    }
}

/// Drains `tasks`, turning a task that never produced a record into an error
/// record for the host it was spawned for.
async fn collect<F>(
    mut tasks: JoinSet<HostAssessment>,
    mut pending: HashMap<task::Id, (String, Vec<u16>)>,
    mut on_done: F,
) -> Vec<HostAssessment>
where
    F: FnMut(&HostAssessment),
{
    let mut results = Vec::with_capacity(pending.len());
    while let Some(done) = tasks.join_next_with_id().await {
        let record = match done {
            Ok((id, record)) => {
                pending.remove(&id);
                record
            }
            Err(e) => {
                let Some((host, open)) = pending.remove(&e.id()) else {
                    tracing::error!("untracked host task did not complete: {}", e);
                    continue;
                };
                tracing::error!(host = %host, "host task did not complete: {}", e);
                HostAssessment::failed(host, open, format!("host task did not complete: {}", e))
            }
        };
        on_done(&record);
        results.push(record);
    }
    results
}

/// Runs one host's assessment, turning a panic into an error record.
async fn isolated<F>(host: String, open: Vec<u16>, work: F) -> HostAssessment
where
    F: Future<Output = HostAssessment>,
{
    let outcome = AssertUnwindSafe(work).catch_unwind().await;
    match outcome {
        Ok(record) => record,
        Err(panic) => {
            let msg = panic_message(panic.as_ref());
            tracing::error!(host = %host, "assessment panicked: {}", msg);
            HostAssessment::failed(host, open, format!("assessment panicked: {}", msg))
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
