use reqwest::{Client, StatusCode};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use super::store::Credential;
use crate::core::deadline::Deadline;
use crate::utils::gate::GateSpec;

/// Basic-auth trials against login URLs that challenged an anonymous request.
#[derive(Clone)]
pub struct CredentialTester {
    client: Client,
    gate: GateSpec,
    request_timeout: Duration,
}

impl CredentialTester {
    pub fn new(client: Client, gate: GateSpec, request_timeout: Duration) -> Self {
        Self { client, gate, request_timeout }
    }

    /// Races every URL and credential; the first 200 wins. Which credential
    /// wins when several are valid is not deterministic. All trials are
    /// stopped and joined before returning.
    pub async fn find(
        &self,
        login_urls: &[String],
        creds: Arc<Vec<Credential>>,
        deadline: Deadline,
    ) -> Option<Credential> {
        if login_urls.is_empty() || creds.is_empty() {
            return None;
        }

        let (tx, mut rx) = mpsc::channel::<Credential>(1);
        let stop = Arc::new(AtomicBool::new(false));
        let mut per_url = JoinSet::new();

        for url in login_urls {
            let tester = self.clone();
            let url = url.clone();
            let creds = creds.clone();
            let tx = tx.clone();
            let stop = stop.clone();
            per_url.spawn(async move { tester.attack_url(url, creds, tx, stop, deadline).await });
        }
        drop(tx);

        let winner = rx.recv().await;
        stop.store(true, Ordering::SeqCst);
        per_url.abort_all();
        while per_url.join_next().await.is_some() {}

        winner
    }

    async fn attack_url(
        self,
        url: String,
        creds: Arc<Vec<Credential>>,
        tx: mpsc::Sender<Credential>,
        stop: Arc<AtomicBool>,
        deadline: Deadline,
    ) {
        if !self.requires_auth(&url, deadline).await {
            tracing::debug!(url = %url, "no auth challenge, skipping credential trials");
            return;
        }

        let gate = self.gate.open();
        let mut trials = JoinSet::new();
        for cred in creds.iter().cloned() {
            let client = self.client.clone();
            let url = url.clone();
            let gate = gate.clone();
            let tx = tx.clone();
            let stop = stop.clone();
            let request_timeout = self.request_timeout;
            trials.spawn(async move {
                let Ok(_pass) = gate.enter().await else { return };
                if stop.load(Ordering::SeqCst) {
                    return;
                }
                if try_credential(&client, &url, &cred, request_timeout, deadline).await
                    && !stop.swap(true, Ordering::SeqCst)
                {
                    tracing::info!(url = %url, user = %cred.user, "credential accepted");
                    let _ = tx.try_send(cred);
                }
            });
        }
        while trials.join_next().await.is_some() {}
    }

    async fn requires_auth(&self, url: &str, deadline: Deadline) -> bool {
        match deadline.within(self.request_timeout, self.client.get(url).send()).await {
            Some(Ok(resp)) => {
                resp.headers().contains_key(reqwest::header::WWW_AUTHENTICATE)
                    || resp.status() == StatusCode::UNAUTHORIZED
                    || resp.status() == StatusCode::FORBIDDEN
            }
            _ => false,
        }
    }
}

async fn try_credential(
    client: &Client,
    url: &str,
    cred: &Credential,
    request_timeout: Duration,
    deadline: Deadline,
) -> bool {
    let request = client.get(url).basic_auth(&cred.user, Some(&cred.pass)).send();
    matches!(
        deadline.within(request_timeout, request).await,
        Some(Ok(resp)) if resp.status() == StatusCode::OK
    )
}
