use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Reachability {
    Local,
    External,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub address: String,
    pub reachability: Reachability,
}

impl Target {
    pub fn is_local(&self) -> bool {
        self.reachability == Reachability::Local
    }
}

/// host -> open ports. Hosts without an open port are never present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PortSet(BTreeMap<String, BTreeSet<u16>>);

impl PortSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, host: impl Into<String>, port: u16) {
        self.0.entry(host.into()).or_default().insert(port);
    }

    pub fn ports(&self, host: &str) -> Option<&BTreeSet<u16>> {
        self.0.get(host)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeSet<u16>)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total_ports(&self) -> usize {
        self.0.values().map(BTreeSet::len).sum()
    }

    /// Keeps only (host, port) pairs present in both sets.
    pub fn intersect(&self, other: &PortSet) -> PortSet {
        let mut out = PortSet::new();
        for (host, ports) in &self.0 {
            if let Some(theirs) = other.0.get(host) {
                for port in ports.intersection(theirs) {
                    out.insert(host.clone(), *port);
                }
            }
        }
        out
    }

    pub fn is_subset_of(&self, other: &PortSet) -> bool {
        self.0.iter().all(|(host, ports)| {
            other
                .0
                .get(host)
                .map(|theirs| ports.is_subset(theirs))
                .unwrap_or(false)
        })
    }
}

impl IntoIterator for PortSet {
    type Item = (String, BTreeSet<u16>);
    type IntoIter = std::collections::btree_map::IntoIter<String, BTreeSet<u16>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<(String, u16)> for PortSet {
    fn from_iter<I: IntoIterator<Item = (String, u16)>>(iter: I) -> Self {
        let mut set = PortSet::new();
        for (host, port) in iter {
            set.insert(host, port);
        }
        set
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HttpMeta {
    pub server: String,
    /// Lower-cased, truncated to the configured snippet size.
    pub body: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RtspInfo {
    pub any: bool,
    pub server: String,
    pub public: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Fingerprint {
    pub vendor: String,
    pub note: String,
    pub vulnerabilities: Vec<String>,
}

/// One record per host with at least one open port.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HostAssessment {
    pub host: String,
    pub ports: Vec<u16>,
    pub http_ports: Vec<u16>,
    pub rtsp_ports: Vec<u16>,
    pub http: HttpMeta,
    pub login_urls: Vec<String>,
    pub rtsp: RtspInfo,
    pub onvif: String,
    pub mjpeg_urls: Vec<String>,
    pub vendor: String,
    pub note: String,
    pub vulnerabilities: Vec<String>,
    pub credential: String,
    pub error: Option<String>,
}

impl HostAssessment {
    pub fn new(host: impl Into<String>, ports: Vec<u16>) -> Self {
        Self {
            host: host.into(),
            ports,
            ..Default::default()
        }
    }

    pub fn failed(host: impl Into<String>, ports: Vec<u16>, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(host, ports)
        }
    }
}
