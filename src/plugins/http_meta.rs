use reqwest::Client;
use std::time::Duration;

use super::http::{base_url, header_text, read_prefix, truncate_on_char_boundary};
use crate::core::{deadline::Deadline, models::HttpMeta};

/// GETs `/` on each port in order until both a `Server` banner and a body
/// snippet are known. One representative front door per host, not a survey.
pub async fn probe(
    client: &Client,
    host: &str,
    ports: &[u16],
    request_timeout: Duration,
    snippet_bytes: usize,
    deadline: Deadline,
) -> HttpMeta {
    let mut meta = HttpMeta::default();

    for &port in ports {
        if deadline.is_elapsed() || (!meta.server.is_empty() && !meta.body.is_empty()) {
            break;
        }

        let url = format!("{}/", base_url(host, port));
        let fetched = deadline
            .within(request_timeout, async {
                let mut resp = client.get(&url).send().await?;
                let server = header_text(&resp, reqwest::header::SERVER);
                let body = read_prefix(&mut resp, snippet_bytes).await;
                Ok::<_, reqwest::Error>((server, body))
            })
            .await;

        match fetched {
            Some(Ok((server, body))) => {
                if meta.server.is_empty() && !server.is_empty() {
                    meta.server = server;
                }
                if meta.body.is_empty() && !body.is_empty() {
                    let mut snippet = String::from_utf8_lossy(&body).to_lowercase();
                    truncate_on_char_boundary(&mut snippet, snippet_bytes);
                    meta.body = snippet;
                }
            }
            Some(Err(e)) => tracing::debug!(host, port, error = %e, "http metadata request failed"),
            None => tracing::debug!(host, port, "http metadata request timed out"),
        }
    }

    meta
}
