use chrono::{DateTime, Utc};
use serde::Serialize;

use super::discovery::Strategy;
use super::models::PortSet;

/// Run-level counters shown in the terminal summary and the report footer.
#[derive(Debug, Clone, Serialize)]
pub struct RunState {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub targets: usize,
    pub strategy: Option<String>,
    pub discovered_hosts: usize,
    pub discovered_ports: usize,
    pub verified_hosts: usize,
    pub verified_ports: usize,
    pub verification_degraded: bool,
    pub assessed_hosts: usize,
    pub failed_hosts: usize,
    pub snapshot_attempts: usize,
    pub snapshots_saved: usize,
    pub duration_ms: u64,
}

impl RunState {
    pub fn new(run_id: String, targets: usize) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            targets,
            strategy: None,
            discovered_hosts: 0,
            discovered_ports: 0,
            verified_hosts: 0,
            verified_ports: 0,
            verification_degraded: false,
            assessed_hosts: 0,
            failed_hosts: 0,
            snapshot_attempts: 0,
            snapshots_saved: 0,
            duration_ms: 0,
        }
    }

    pub fn on_discovery(&mut self, found: &PortSet, strategy: Strategy) {
        self.strategy = Some(strategy.to_string());
        self.discovered_hosts = found.len();
        self.discovered_ports = found.total_ports();
    }

    pub fn on_verification(&mut self, verified: &PortSet, degraded: bool) {
        self.verified_hosts = verified.len();
        self.verified_ports = verified.total_ports();
        self.verification_degraded = degraded;
        if degraded {
            tracing::warn!("Continuing with unverified discovery results");
        }
    }

    pub fn degradations(&self) -> usize {
        usize::from(self.verification_degraded) + self.snapshot_attempts.saturating_sub(self.snapshots_saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_follow_stages() {
        let mut state = RunState::new("run_test".into(), 3);
        let found: PortSet = [("10.0.0.1".to_string(), 80), ("10.0.0.1".to_string(), 554)]
            .into_iter()
            .collect();
        state.on_discovery(&found, Strategy::Syn);
        state.on_verification(&found, true);
        assert_eq!(state.strategy.as_deref(), Some("syn"));
        assert_eq!(state.discovered_ports, 2);
        assert_eq!(state.verified_hosts, 1);
        assert_eq!(state.degradations(), 1);
    }
}
