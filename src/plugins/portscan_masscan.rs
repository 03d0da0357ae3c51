use async_trait::async_trait;
use std::path::PathBuf;

use super::types::DiscoveryEngine;
use crate::config::types::DiscoveryConfig;
use crate::core::{deadline::Deadline, errors::ScanError, models::PortSet, ports};
use crate::executors::command;

/// High-rate SYN discovery delegated to the masscan binary.
pub struct MasscanScan {
    command: String,
    wait_secs: u64,
    adapter: Option<String>,
    adapter_ip: Option<String>,
}

impl MasscanScan {
    pub fn new(cfg: &DiscoveryConfig) -> Self {
        Self {
            command: cfg.masscan_command.clone(),
            wait_secs: cfg.wait_secs,
            adapter: cfg.adapter.clone(),
            adapter_ip: cfg.adapter_ip.clone(),
        }
    }

    /// Resolves the binary on PATH; absence is a setup problem, not a scan failure.
    pub fn locate(&self) -> Result<PathBuf, ScanError> {
        which::which(&self.command).map_err(|e| {
            ScanError::Setup(format!("{} not found in PATH ({}); install it or set discovery.masscan_command", self.command, e))
        })
    }

    fn build_args(&self, targets: &[String], port_list: &[u16], rate: u32) -> Vec<String> {
        let mut args = vec![
            "--rate".to_string(),
            rate.max(1).to_string(),
            "--open-only".to_string(),
            "--wait".to_string(),
            self.wait_secs.to_string(),
            "-p".to_string(),
            ports::render(port_list),
        ];
        if let Some(adapter) = self.adapter.as_deref().filter(|a| !a.is_empty()) {
            args.push("--interface".to_string());
            args.push(adapter.to_string());
        }
        if let Some(ip) = self.adapter_ip.as_deref().filter(|a| !a.is_empty()) {
            args.push("--source-ip".to_string());
            args.push(ip.to_string());
        }
        args.extend(targets.iter().cloned());
        args
    }
}

/// Accepts both output styles masscan has shipped:
/// `Discovered open port 80/tcp on 1.2.3.4` and `open tcp 80 1.2.3.4 <ts>`.
/// Banners, progress and anything else yield `None`.
pub fn parse_line(line: &str) -> Option<(String, u16)> {
    let line = line.trim();
    if line.is_empty()
        || line.starts_with('#')
        || line.starts_with("Starting masscan")
        || line.starts_with("Initiating")
        || line.starts_with("Scanning")
    {
        return None;
    }

    let fields: Vec<&str> = line.split_whitespace().collect();
    let (port, host) = if let Some(rest) = line.strip_prefix("Discovered open port ") {
        let mut parts = rest.split_whitespace();
        let port = parts.next()?.split('/').next()?;
        if parts.next()? != "on" {
            return None;
        }
        (port, parts.next()?)
    } else if fields.len() >= 4 && fields[0] == "open" {
        (fields[2], fields[3])
    } else {
        return None;
    };

    let port = port.parse::<u16>().ok().filter(|p| *p != 0)?;
    Some((host.to_string(), port))
}

#[async_trait]
impl DiscoveryEngine for MasscanScan {
    fn name(&self) -> &'static str {
        "masscan"
    }

    async fn scan(
        &self,
        targets: &[String],
        ports: &[u16],
        rate: u32,
        deadline: Deadline,
    ) -> Result<PortSet, ScanError> {
        let binary = self.locate()?;
        let args = self.build_args(targets, ports, rate);

        let mut found = PortSet::new();
        let result = command::stream(&binary.to_string_lossy(), &args, deadline, |line| {
            if let Some((host, port)) = parse_line(line) {
                tracing::debug!(host = %host, port, "masscan reported open port");
                found.insert(host, port);
            }
        })
        .await?;

        if result.timed_out {
            tracing::warn!(
                "masscan hit the run deadline after {}ms; keeping {} hosts seen so far",
                result.duration_ms,
                found.len()
            );
        }
        tracing::info!(
            "masscan finished (exit {:?}): {} output lines, {} hosts with open ports",
            result.exit_code,
            result.lines,
            found.len()
        );
        Ok(found)
    }
}
