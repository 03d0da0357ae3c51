use crate::{
    cli::Cli,
    config::{ConfigLoader, GlobalConfig},
    core::{
        classifier::TargetClassifier,
        deadline::Deadline,
        discovery::DiscoverySelector,
        models::Target,
        ports::PortSpec,
        probes::ProbeSet,
        scheduler::{CredentialPlan, HostOrchestrator, SnapshotPlan},
        state::RunState,
        verify::Verifier,
    },
    credentials::{Credential, CredentialStore, CredentialTester},
    fingerprint::FingerprintEngine,
    plugins::{
        http::build_client, portscan_connect::ConnectScan, portscan_masscan::MasscanScan,
        snapshot::SnapshotGroup, types::DiscoveryEngine,
    },
    reporters::writer,
    targets,
    ui::{printer, progress::ProgressManager},
    utils::{gate::Limits, logging, time},
};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub async fn run(cli: Cli) -> Result<()> {
    let start_time = Instant::now();

    let level = logging::level_from_cli(&cli);
    logging::init(level)?;

    let mut config = ConfigLoader::load_with_custom_path(cli.config.as_deref())?;
    apply_overrides(&mut config, &cli);
    ConfigLoader::validate_config(&config).context("Invalid configuration after applying flags")?;

    let deadline = Deadline::after(cli.timeout);
    let targets = targets::expand(&cli.targets).context("Error parsing targets")?;
    let port_spec: PortSpec = cli.ports.parse().context("Error parsing --ports")?;

    let run_id = time::new_run_id(targets.first().map(String::as_str).unwrap_or("none"));
    tracing::info!("Run ID: {}", run_id);
    let mut state = RunState::new(run_id, targets.len());

    let progress = ProgressManager::new(!(cli.verbose || cli.debug));
    progress.update(&format!("Discovering open ports on {} target(s)", targets.len()));

    // Discovery and verification
    let classifier = Arc::new(TargetClassifier::new());
    let local: Vec<String> = targets
        .iter()
        .map(|t| classifier.target(t))
        .filter(Target::is_local)
        .map(|t| t.address)
        .collect();
    if !local.is_empty() {
        tracing::info!("Local targets present ({}), using connect scan for the whole batch", local.join(", "));
    }

    let connect: Arc<dyn DiscoveryEngine> = Arc::new(ConnectScan::new(&config.discovery));
    let selector = DiscoverySelector::new(
        classifier,
        Arc::new(MasscanScan::new(&config.discovery)),
        connect.clone(),
    );
    let rate = config.discovery.rate;
    let (found, strategy) = selector
        .discover(&targets, &port_spec, rate, deadline)
        .await
        .context("Port discovery failed")?;
    state.on_discovery(&found, strategy);

    progress.update(&format!("Verifying {} open port(s)", found.total_ports()));
    let verification = Verifier::new(connect).verify(&found, rate, deadline).await;
    state.on_verification(&verification.ports, verification.degraded);

    // Assessment
    let client = build_client(&config.probes).context("Failed to build HTTP client")?;
    let limits = Limits::from_config(&config.concurrency);
    let probes = ProbeSet::new(client.clone(), config.probes.clone(), limits.clone());
    let fingerprints = Arc::new(FingerprintEngine::new());
    let mut orchestrator = HostOrchestrator::new(probes, fingerprints.clone(), limits.hosts.clone());

    let store = CredentialStore::new();
    if let Some(creds) = load_credentials(&cli, &config, &store).await? {
        orchestrator = orchestrator.with_credentials(CredentialPlan {
            tester: CredentialTester::new(
                client.clone(),
                limits.credentials.clone(),
                Duration::from_millis(config.credentials.timeout_ms),
            ),
            creds,
        });
    }

    let snapshots = Arc::new(SnapshotGroup::new());
    if config.output.snapshots {
        orchestrator = orchestrator.with_snapshots(SnapshotPlan {
            group: snapshots.clone(),
            client: client.clone(),
            out_dir: config.output.dir.join("snapshots"),
            request_timeout: Duration::from_millis(config.probes.snapshot_timeout_ms),
        });
    }
    let orchestrator = Arc::new(orchestrator);

    let total = verification.ports.len();
    progress.update(&format!("Assessing {} host(s)", total));
    let mut done = 0;
    let mut records = orchestrator
        .assess_all(&verification.ports, deadline, |record| {
            done += 1;
            progress.host_done(record, done, total);
        })
        .await;
    records.sort_by(|a, b| a.host.cmp(&b.host));

    tracing::debug!("Fingerprint cache holds {} signal combination(s)", fingerprints.cached());
    state.assessed_hosts = records.len();
    state.failed_hosts = records.iter().filter(|r| r.error.is_some()).count();

    let grace = Duration::from_secs(config.output.snapshot_grace_secs);
    let finished = snapshots.shutdown(grace).await;
    (state.snapshot_attempts, state.snapshots_saved) = orchestrator.snapshot_counters();
    if finished < state.snapshot_attempts {
        tracing::warn!(
            "Abandoned {} snapshot capture(s) still running after {:?}",
            state.snapshot_attempts - finished,
            grace
        );
    }

    state.duration_ms = u64::try_from(start_time.elapsed().as_millis()).unwrap_or(u64::MAX);

    progress.update("Writing reports");
    let paths = writer::write_all(&records, &state, &config.output.dir)
        .with_context(|| format!("Failed to write reports to {}", config.output.dir.display()))?;

    progress.finish("Scan complete");
    if deadline.is_elapsed() {
        tracing::warn!("Run deadline of {:?} elapsed; some results may be partial", cli.timeout);
    }
    if state.degradations() > 0 {
        tracing::info!("Run finished with {} degradation(s)", state.degradations());
    }
    printer::print_summary(&records, &state, &paths);

    Ok(())
}

/// Flags win over the config file.
fn apply_overrides(config: &mut GlobalConfig, cli: &Cli) {
    let d = &mut config.discovery;
    if let Some(rate) = cli.rate {
        d.rate = rate;
    }
    if let Some(retry) = cli.retry {
        d.retries = retry;
    }
    if let Some(wait) = cli.wait {
        d.wait_secs = wait;
    }
    if cli.adapter.is_some() {
        d.adapter = cli.adapter.clone();
    }
    if cli.adapter_ip.is_some() {
        d.adapter_ip = cli.adapter_ip.clone();
    }
    if let Some(dir) = &cli.output {
        config.output.dir = dir.clone();
    }
    if let Some(hosts) = cli.concurrency {
        config.concurrency.max_hosts = hosts;
    }
    if cli.no_snapshots {
        config.output.snapshots = false;
    }
}

/// An explicit `--creds` file must be readable. The configured default may be
/// absent, in which case credential testing is skipped.
async fn load_credentials(
    cli: &Cli,
    config: &GlobalConfig,
    store: &CredentialStore,
) -> Result<Option<Arc<Vec<Credential>>>> {
    let creds = match &cli.creds {
        Some(path) => store
            .load(path)
            .await
            .with_context(|| format!("Failed to load credentials from {}", path.display()))?,
        None => {
            let path = &config.credentials.path;
            if !path.exists() {
                tracing::warn!(
                    "Credential file {} not found, skipping default credential checks",
                    path.display()
                );
                return Ok(None);
            }
            store.load(path).await?
        }
    };

    if creds.is_empty() {
        tracing::warn!("Credential list is empty, skipping default credential checks");
        return Ok(None);
    }
    Ok(Some(creds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn flags_override_config_file_values() {
        let mut config = GlobalConfig::default();
        config.discovery.rate = 250;
        let cli = Cli::parse_from([
            "cctvscan", "--rate", "5000", "--retry", "1", "--concurrency", "9", "--no-snapshots", "-o", "out",
            "10.0.0.1",
        ]);

        apply_overrides(&mut config, &cli);

        assert_eq!(config.discovery.rate, 5000);
        assert_eq!(config.discovery.retries, 1);
        assert_eq!(config.concurrency.max_hosts, 9);
        assert!(!config.output.snapshots);
        assert_eq!(config.output.dir, std::path::PathBuf::from("out"));
    }

    #[test]
    fn absent_flags_keep_config_values() {
        let mut config = GlobalConfig::default();
        config.discovery.adapter = Some("eth1".into());
        let cli = Cli::parse_from(["cctvscan", "10.0.0.1"]);

        apply_overrides(&mut config, &cli);

        assert_eq!(config.discovery.adapter.as_deref(), Some("eth1"));
        assert_eq!(config.discovery.rate, 1000);
        assert!(config.output.snapshots);
    }

    #[tokio::test]
    async fn explicit_missing_credential_file_is_fatal() {
        let cli = Cli::parse_from(["cctvscan", "--creds", "/nonexistent/creds.txt", "10.0.0.1"]);
        let err = load_credentials(&cli, &GlobalConfig::default(), &CredentialStore::new())
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/creds.txt"));
    }

    #[tokio::test]
    async fn missing_default_credential_file_disables_testing() {
        let cli = Cli::parse_from(["cctvscan", "10.0.0.1"]);
        let mut config = GlobalConfig::default();
        config.credentials.path = "/nonexistent/default-creds.txt".into();
        let creds = load_credentials(&cli, &config, &CredentialStore::new()).await.unwrap();
        assert!(creds.is_none());
    }

    #[tokio::test]
    async fn explicit_credential_file_is_loaded() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "admin:admin\n# comment\nroot:12345").unwrap();
        let path = file.path().to_string_lossy().to_string();
        let cli = Cli::parse_from(["cctvscan", "--creds", path.as_str(), "10.0.0.1"]);

        let creds = load_credentials(&cli, &GlobalConfig::default(), &CredentialStore::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(creds.len(), 2);
    }
}
