use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::core::errors::ScanError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub user: String,
    pub pass: String,
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.user, self.pass)
    }
}

/// `user:pass` per line; blank lines and `#` comments are skipped, as are
/// lines without a colon.
pub fn parse(content: &str) -> Vec<Credential> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .filter_map(|l| match l.split_once(':') {
            Some((user, pass)) => Some(Credential {
                user: user.to_string(),
                pass: pass.to_string(),
            }),
            None => {
                tracing::debug!("skipping credential line without ':'");
                None
            }
        })
        .collect()
}

/// Credential lists memoized by file path for the lifetime of the run.
#[derive(Debug, Default)]
pub struct CredentialStore {
    lists: RwLock<HashMap<PathBuf, Arc<Vec<Credential>>>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn load(&self, path: &Path) -> Result<Arc<Vec<Credential>>, ScanError> {
        if let Some(hit) = self.lists.read().ok().and_then(|l| l.get(path).cloned()) {
            return Ok(hit);
        }

        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            ScanError::Setup(format!("cannot read credential file {}: {}", path.display(), e))
        })?;
        let creds = Arc::new(parse(&content));
        tracing::info!("Loaded {} credentials from {}", creds.len(), path.display());

        match self.lists.write() {
            Ok(mut lists) => Ok(lists.entry(path.to_path_buf()).or_insert(creds).clone()),
            Err(_) => Ok(creds),
        }
    }
}
