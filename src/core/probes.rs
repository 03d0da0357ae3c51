use reqwest::Client;
use std::time::Duration;

use super::deadline::Deadline;
use super::models::{HttpMeta, RtspInfo};
use crate::config::types::ProbeConfig;
use crate::plugins::{http_meta, login_pages, mjpeg, onvif, rtsp};
use crate::utils::gate::Limits;

/// Fields produced by the per-host probes. Each probe owns exactly one field.
#[derive(Debug, Clone, Default)]
pub struct ProbeReport {
    pub http: HttpMeta,
    pub login_urls: Vec<String>,
    pub rtsp: RtspInfo,
    pub onvif: String,
    pub mjpeg_urls: Vec<String>,
}

pub struct ProbeSet {
    client: Client,
    cfg: ProbeConfig,
    limits: Limits,
}

impl ProbeSet {
    pub fn new(client: Client, cfg: ProbeConfig, limits: Limits) -> Self {
        Self { client, cfg, limits }
    }

    /// Runs all five probes concurrently and returns once every one of them
    /// has finished or given up.
    pub async fn run(
        &self,
        host: &str,
        http_ports: &[u16],
        rtsp_ports: &[u16],
        deadline: Deadline,
    ) -> ProbeReport {
        let ms = Duration::from_millis;
        let cfg = &self.cfg;

        let (http, login_urls, rtsp, onvif, mjpeg_urls) = tokio::join!(
            http_meta::probe(
                &self.client,
                host,
                http_ports,
                ms(cfg.http_timeout_ms),
                cfg.snippet_bytes,
                deadline,
            ),
            login_pages::probe(
                &self.client,
                host,
                http_ports,
                &self.limits.login,
                ms(cfg.login_timeout_ms),
                deadline,
            ),
            rtsp::probe(
                host,
                rtsp_ports,
                ms(cfg.rtsp_connect_timeout_ms),
                ms(cfg.rtsp_timeout_ms),
                deadline,
            ),
            onvif::probe(host, ms(cfg.onvif_timeout_ms), deadline),
            mjpeg::probe(
                &self.client,
                host,
                http_ports,
                &self.limits.mjpeg_ports,
                &self.limits.mjpeg_paths,
                ms(cfg.mjpeg_timeout_ms),
                deadline,
            ),
        );

        tracing::debug!(
            host,
            server = %http.server,
            logins = login_urls.len(),
            rtsp = rtsp.any,
            streams = mjpeg_urls.len(),
            "probes finished"
        );

        ProbeReport { http, login_urls, rtsp, onvif, mjpeg_urls }
    }
}
