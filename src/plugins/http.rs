use reqwest::header::HeaderName;
use reqwest::{Client, Response};
use std::time::Duration;

use crate::config::types::ProbeConfig;
use crate::core::errors::ScanError;
use crate::core::ports;

/// Shared client for every HTTP probe. Camera firmware routinely ships
/// self-signed certificates, so certificate checks are off.
pub fn build_client(cfg: &ProbeConfig) -> Result<Client, ScanError> {
    Client::builder()
        .user_agent(cfg.user_agent.clone())
        .danger_accept_invalid_certs(true)
        .connect_timeout(Duration::from_millis(cfg.http_connect_timeout_ms))
        .build()
        .map_err(|e| ScanError::Setup(format!("failed to build HTTP client: {}", e)))
}

/// `host:port`, bracketing IPv6 literals.
pub fn authority(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

pub fn base_url(host: &str, port: u16) -> String {
    format!("{}://{}", ports::scheme(port), authority(host, port))
}

/// Header value as text. Firmware often sends Latin-1 or GBK bytes here, so
/// invalid UTF-8 is replaced rather than dropped.
pub fn header_text(resp: &Response, name: HeaderName) -> String {
    resp.headers()
        .get(name)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).trim().to_string())
        .unwrap_or_default()
}

pub fn content_type(resp: &Response) -> String {
    header_text(resp, reqwest::header::CONTENT_TYPE).to_ascii_lowercase()
}

pub fn has_auth_challenge(resp: &Response) -> bool {
    resp.headers().contains_key(reqwest::header::WWW_AUTHENTICATE)
}

/// Reads at most `limit` bytes of the body without draining endless streams.
pub async fn read_prefix(resp: &mut Response, limit: usize) -> Vec<u8> {
    let mut buf = Vec::new();
    while buf.len() < limit {
        match resp.chunk().await {
            Ok(Some(chunk)) => buf.extend_from_slice(&chunk),
            Ok(None) => break,
            Err(e) => {
                tracing::trace!(error = %e, "body read stopped early");
                break;
            }
        }
    }
    buf.truncate(limit);
    buf
}

/// Cuts `s` back to at most `limit` bytes, ending on a char boundary.
pub fn truncate_on_char_boundary(s: &mut String, limit: usize) {
    if s.len() <= limit {
        return;
    }
    let mut end = limit;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
}
