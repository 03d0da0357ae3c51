use reqwest::{Client, StatusCode};
use std::collections::HashSet;
use std::time::Duration;
use tokio::task::JoinSet;

use super::http::{base_url, has_auth_challenge};
use crate::core::deadline::Deadline;
use crate::utils::gate::GateSpec;

pub const LOGIN_PATHS: &[&str] = &["/", "/login", "/admin", "/viewer", "/webadmin", "/index.html"];

pub fn is_login_candidate(status: StatusCode, auth_challenge: bool) -> bool {
    auth_challenge
        || status == StatusCode::OK
        || status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
}

/// Drops repeats, keeping the first occurrence of each URL.
pub fn dedup_urls(urls: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.into_iter().filter(|u| seen.insert(u.clone())).collect()
}

/// HEADs every login path on every HTTP port, bounded by `gate` per host.
pub async fn probe(
    client: &Client,
    host: &str,
    ports: &[u16],
    gate: &GateSpec,
    request_timeout: Duration,
    deadline: Deadline,
) -> Vec<String> {
    let gate = gate.open();
    let mut checks = JoinSet::new();

    for &port in ports {
        for path in LOGIN_PATHS {
            let url = format!("{}{}", base_url(host, port), path);
            let client = client.clone();
            let gate = gate.clone();
            checks.spawn(async move {
                let _pass = gate.enter().await.ok()?;
                let resp = deadline.within(request_timeout, client.head(&url).send()).await?.ok()?;
                is_login_candidate(resp.status(), has_auth_challenge(&resp)).then_some(url)
            });
        }
    }

    let mut found = Vec::new();
    while let Some(done) = checks.join_next().await {
        match done {
            Ok(Some(url)) => found.push(url),
            Ok(None) => {}
            Err(e) => tracing::warn!(host, error = %e, "login check task failed"),
        }
    }
    dedup_urls(found)
}
