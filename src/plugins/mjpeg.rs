use reqwest::{Client, StatusCode};
use std::time::Duration;
use tokio::task::JoinSet;

use super::http::{base_url, content_type};
use super::login_pages::dedup_urls;
use crate::core::deadline::Deadline;
use crate::utils::gate::{Gate, GateSpec};

pub const STREAM_PATHS: &[&str] = &[
    "/axis-cgi/mjpg/video.cgi",
    "/mjpeg.cgi",
    "/video/mjpg.cgi",
    "/videostream.cgi",
    "/mjpg/video.mjpg",
    "/jpg/image.jpg",
    "/snapshot.cgi",
    "/image.jpg",
    "/cgi-bin/video.jpg",
    "/cgi-bin/viewer/video.jpg",
    "/SnapshotJPEG",
    "/cgi-bin/nphMotionJpeg",
    "/faststream.jpg",
    "/control/faststream.jpg",
    "/stream.jpg",
    "/video.jpg",
    "/liveimg.cgi",
    "/now.jpg",
    "/image",
    "/oneshotimage.jpg",
];

const STREAM_CONTENT_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/pjpeg",
    "multipart/x-mixed-replace",
    "video/mjpeg",
    "video/x-motion-jpeg",
];

pub fn is_stream_content_type(content_type: &str) -> bool {
    let ct = content_type.to_ascii_lowercase();
    STREAM_CONTENT_TYPES.iter().any(|allowed| ct.contains(allowed))
}

/// HEADs the stream path list on every HTTP port. Ports are bounded by
/// `port_gate` per host, paths by `path_gate` per port.
pub async fn probe(
    client: &Client,
    host: &str,
    ports: &[u16],
    port_gate: &GateSpec,
    path_gate: &GateSpec,
    request_timeout: Duration,
    deadline: Deadline,
) -> Vec<String> {
    let port_gate = port_gate.open();
    let mut per_port = JoinSet::new();

    for &port in ports {
        let client = client.clone();
        let port_gate = port_gate.clone();
        let paths = path_gate.open();
        let base = base_url(host, port);
        per_port.spawn(async move {
            let Ok(_pass) = port_gate.enter().await else { return Vec::new() };
            probe_port(client, base, paths, request_timeout, deadline).await
        });
    }

    let mut found = Vec::new();
    while let Some(done) = per_port.join_next().await {
        match done {
            Ok(urls) => found.extend(urls),
            Err(e) => tracing::warn!(host, error = %e, "mjpeg port task failed"),
        }
    }
    dedup_urls(found)
}

async fn probe_port(
    client: Client,
    base: String,
    gate: Gate,
    request_timeout: Duration,
    deadline: Deadline,
) -> Vec<String> {
    let mut checks = JoinSet::new();
    for path in STREAM_PATHS {
        let url = format!("{}{}", base, path);
        let client = client.clone();
        let gate = gate.clone();
        checks.spawn(async move {
            let _pass = gate.enter().await.ok()?;
            let resp = deadline.within(request_timeout, client.head(&url).send()).await?.ok()?;
            (resp.status() == StatusCode::OK && is_stream_content_type(&content_type(&resp))).then_some(url)
        });
    }

    let mut found = Vec::new();
    while let Some(done) = checks.join_next().await {
        if let Ok(Some(url)) = done {
            found.push(url);
        }
    }
    found
}
