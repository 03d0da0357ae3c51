use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{interval, MissedTickBehavior};

use super::types::DiscoveryEngine;
use crate::config::types::DiscoveryConfig;
use crate::core::{deadline::Deadline, errors::ScanError, models::PortSet};

/// In-process TCP connect scanner, paced at `rate` attempts per second.
/// Used for loopback targets and for verification.
#[derive(Debug, Clone)]
pub struct ConnectScan {
    connect_timeout: Duration,
    retries: u32,
    max_in_flight: usize,
}

impl ConnectScan {
    pub fn new(cfg: &DiscoveryConfig) -> Self {
        Self {
            connect_timeout: Duration::from_millis(cfg.connect_timeout_ms),
            retries: cfg.retries,
            max_in_flight: cfg.max_in_flight.max(1),
        }
    }

    /// Probes every (target, port) pair, calling `on_open` for each open one
    /// as soon as it is confirmed.
    pub async fn scan_with<F>(
        &self,
        targets: &[String],
        ports: &[u16],
        rate: u32,
        deadline: Deadline,
        mut on_open: F,
    ) -> Result<(), ScanError>
    where
        F: FnMut(&str, u16) + Send,
    {
        if deadline.is_elapsed() {
            return Err(ScanError::Discovery("run deadline already elapsed".into()));
        }

        let period = (Duration::from_secs(1) / rate.max(1)).max(Duration::from_micros(1));
        let mut pacer = interval(period);
        pacer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let in_flight = Arc::new(Semaphore::new(self.max_in_flight));
        let mut attempts: JoinSet<Option<(String, u16)>> = JoinSet::new();

        'targets: for host in targets {
            for &port in ports {
                if deadline.is_elapsed() {
                    tracing::warn!("connect scan reached the run deadline, not launching remaining attempts");
                    break 'targets;
                }
                pacer.tick().await;
                let permit = in_flight
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|e| ScanError::Discovery(format!("connect gate closed: {}", e)))?;

                let host = host.clone();
                let connect_timeout = self.connect_timeout;
                let retries = self.retries;
                attempts.spawn(async move {
                    let _permit = permit;
                    probe_port(&host, port, connect_timeout, retries, deadline)
                        .await
                        .then_some((host, port))
                });

                while let Some(done) = attempts.try_join_next() {
                    deliver(done, &mut on_open)?;
                }
            }
        }

        while let Some(done) = attempts.join_next().await {
            deliver(done, &mut on_open)?;
        }
        Ok(())
    }
}

fn deliver<F>(
    done: Result<Option<(String, u16)>, tokio::task::JoinError>,
    on_open: &mut F,
) -> Result<(), ScanError>
where
    F: FnMut(&str, u16),
{
    match done {
        Ok(Some((host, port))) => {
            on_open(&host, port);
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(e) => Err(ScanError::Discovery(format!("connect attempt task failed: {}", e))),
    }
}

const RETRY_PAUSE: Duration = Duration::from_millis(50);

/// One initial attempt plus up to `retries` more, `RETRY_PAUSE` apart; any
/// success counts as open.
pub async fn probe_port(
    host: &str,
    port: u16,
    connect_timeout: Duration,
    retries: u32,
    deadline: Deadline,
) -> bool {
    for attempt in 0..=retries {
        match deadline
            .within(connect_timeout, TcpStream::connect((host, port)))
            .await
        {
            Some(Ok(_stream)) => return true,
            Some(Err(e)) => {
                tracing::trace!(host, port, attempt, error = %e, "connect failed");
            }
            None => {
                tracing::trace!(host, port, attempt, "connect timed out");
            }
        }
        if attempt == retries || deadline.is_elapsed() {
            break;
        }
        tokio::time::sleep(deadline.clamp(RETRY_PAUSE)).await;
    }
    false
}

#[async_trait]
impl DiscoveryEngine for ConnectScan {
    fn name(&self) -> &'static str {
        "connect"
    }

    async fn scan(
        &self,
        targets: &[String],
        ports: &[u16],
        rate: u32,
        deadline: Deadline,
    ) -> Result<PortSet, ScanError> {
        let mut found = PortSet::new();
        self.scan_with(targets, ports, rate, deadline, |host, port| {
            tracing::debug!(host, port, "connect scan confirmed open port");
            found.insert(host, port);
        })
        .await?;
        Ok(found)
    }
}
