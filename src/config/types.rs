use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GlobalConfig {
    pub concurrency: ConcurrencyConfig,
    pub discovery: DiscoveryConfig,
    pub probes: ProbeConfig,
    pub credentials: CredentialsConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    pub max_hosts: usize,
    pub login_probe: usize,
    pub mjpeg_ports: usize,
    pub mjpeg_paths: usize,
    pub credential_trials: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_hosts: 5,
            login_probe: 10,
            mjpeg_ports: 5,
            mjpeg_paths: 8,
            credential_trials: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub masscan_command: String,
    /// Packets (or connect attempts) per second.
    pub rate: u32,
    pub retries: u32,
    /// Seconds masscan keeps listening after the last packet.
    pub wait_secs: u64,
    pub connect_timeout_ms: u64,
    /// Upper bound on in-flight connect attempts.
    pub max_in_flight: usize,
    pub adapter: Option<String>,
    pub adapter_ip: Option<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            masscan_command: "masscan".to_string(),
            rate: 1000,
            retries: 3,
            wait_secs: 1,
            connect_timeout_ms: 1000,
            max_in_flight: 256,
            adapter: None,
            adapter_ip: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub user_agent: String,
    pub snippet_bytes: usize,
    pub http_timeout_ms: u64,
    pub http_connect_timeout_ms: u64,
    pub login_timeout_ms: u64,
    pub rtsp_connect_timeout_ms: u64,
    pub rtsp_timeout_ms: u64,
    pub onvif_timeout_ms: u64,
    pub mjpeg_timeout_ms: u64,
    pub snapshot_timeout_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            user_agent: "CCTVTool/1.0".to_string(),
            snippet_bytes: 512,
            http_timeout_ms: 2000,
            http_connect_timeout_ms: 1200,
            login_timeout_ms: 1500,
            rtsp_connect_timeout_ms: 1200,
            rtsp_timeout_ms: 1500,
            onvif_timeout_ms: 1200,
            mjpeg_timeout_ms: 2000,
            snapshot_timeout_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CredentialsConfig {
    pub path: PathBuf,
    pub timeout_ms: u64,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/etc/cctvscan/credentials.txt"),
            timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub snapshots: bool,
    /// How long pending snapshot captures may run after host assessment ends,
    /// before the reports are written.
    pub snapshot_grace_secs: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            snapshots: true,
            snapshot_grace_secs: 3,
        }
    }
}
