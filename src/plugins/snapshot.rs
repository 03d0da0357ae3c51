use reqwest::{Client, StatusCode};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinSet;

use super::http::{base_url, content_type, read_prefix};

const SNAPSHOT_PATHS: &[&str] = &[
    "/snapshot",
    "/jpg/image.jpg",
    "/image.jpg",
    "/snapshot.cgi",
    "/cgi-bin/snapshot.cgi",
    "/mjpg/video.mjpg",
];

const MAX_FRAME_BYTES: usize = 256 * 1024;

/// Fetches the first reachable snapshot and writes it under `out_dir`.
/// Returns `None` when no candidate path served an image.
pub async fn capture(
    client: &Client,
    host: &str,
    ports: &[u16],
    out_dir: &Path,
    request_timeout: Duration,
) -> std::io::Result<Option<PathBuf>> {
    for &port in ports {
        let base = base_url(host, port);
        for path in SNAPSHOT_PATHS {
            let url = format!("{}{}", base, path);
            let fetched = tokio::time::timeout(request_timeout, async {
                let mut resp = client.get(&url).send().await.ok()?;
                if resp.status() != StatusCode::OK {
                    return None;
                }
                let ct = content_type(&resp);
                if !(ct.contains("image/jpeg") || ct.contains("multipart/x-mixed-replace")) {
                    return None;
                }
                Some(read_prefix(&mut resp, MAX_FRAME_BYTES).await)
            })
            .await;

            let Ok(Some(bytes)) = fetched else { continue };
            tokio::fs::create_dir_all(out_dir).await?;
            let file = out_dir.join(format!("{}_{}{}.jpg", sanitize(host), port, sanitize(path)));
            tokio::fs::write(&file, first_frame(&bytes)).await?;
            return Ok(Some(file));
        }
    }
    Ok(None)
}

/// Cuts a single JPEG out of a multipart stream prefix; plain images pass through.
pub fn first_frame(bytes: &[u8]) -> &[u8] {
    let start = bytes.windows(2).position(|w| w == [0xFF, 0xD8]);
    let Some(start) = start else { return bytes };
    match bytes[start..].windows(2).position(|w| w == [0xFF, 0xD9]) {
        Some(end) => &bytes[start..start + end + 2],
        None => &bytes[start..],
    }
}

fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect()
}

/// Opportunistic background work nobody waits on during the run. Failures
/// are logged by the tasks themselves.
#[derive(Default)]
pub struct SnapshotGroup {
    tasks: Mutex<JoinSet<()>>,
}

impl SnapshotGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match self.tasks.lock() {
            Ok(mut tasks) => {
                tasks.spawn(task);
            }
            Err(poisoned) => {
                poisoned.into_inner().spawn(task);
            }
        }
    }

    /// Gives pending captures `grace` to finish, then aborts the rest.
    /// Returns how many finished.
    pub async fn shutdown(&self, grace: Duration) -> usize {
        let mut tasks = match self.tasks.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        let pending = tasks.len();
        let mut finished = 0;
        let _ = tokio::time::timeout(grace, async {
            while tasks.join_next().await.is_some() {
                finished += 1;
            }
        })
        .await;
        if finished < pending {
            tracing::debug!("aborting {} unfinished snapshot captures", pending - finished);
        }
        tasks.abort_all();
        finished
    }
}
