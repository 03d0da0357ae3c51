use super::errors::ScanError;
use std::collections::HashSet;
use std::str::FromStr;

const WEB_PORTS: &[u16] = &[80, 81, 82, 83, 84, 85, 86, 87, 88, 89, 443, 8080, 8443];

const OTHER_WEB_PORTS: &[u16] = &[
    7001, 8999, 9000, 9001, 9002, 10000, 8181, 5001, 50000, 8880, 8889, 3001,
];

pub const RTSP_PORTS: &[u16] = &[554, 8554, 10554, 1554, 2554, 3554, 4554, 5554, 6554, 7554, 9554];

const RTMP_PORTS: std::ops::RangeInclusive<u16> = 1935..=1939;

pub const ONVIF_DISCOVERY_PORT: u16 = 3702;

/// Dahua's proprietary service port; not HTTP.
const DAHUA_SDK_PORT: u16 = 37777;

const HTTPS_PORTS: &[u16] = &[443, 8443];

/// The curated port universe scanned when "all ports" is requested.
pub fn camera_ports() -> Vec<u16> {
    let mut seen = HashSet::new();
    WEB_PORTS
        .iter()
        .copied()
        .chain(8000..=8010)
        .chain(8081..=8104)
        .chain(OTHER_WEB_PORTS.iter().copied())
        .chain(RTSP_PORTS.iter().copied())
        .chain(RTMP_PORTS)
        .chain([ONVIF_DISCOVERY_PORT, DAHUA_SDK_PORT, 5000])
        .filter(|p| seen.insert(*p))
        .collect()
}

pub fn is_rtsp(port: u16) -> bool {
    RTSP_PORTS.contains(&port)
}

pub fn is_http(port: u16) -> bool {
    !is_rtsp(port)
        && !RTMP_PORTS.contains(&port)
        && port != ONVIF_DISCOVERY_PORT
        && port != DAHUA_SDK_PORT
}

pub fn scheme(port: u16) -> &'static str {
    if HTTPS_PORTS.contains(&port) { "https" } else { "http" }
}

/// Splits a host's open ports into (http-capable, rtsp-capable), keeping order.
pub fn classify(ports: &[u16]) -> (Vec<u16>, Vec<u16>) {
    let http = ports.iter().copied().filter(|p| is_http(*p)).collect();
    let rtsp = ports.iter().copied().filter(|p| is_rtsp(*p)).collect();
    (http, rtsp)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortSpec {
    /// Stands for the curated camera list, not all 65535 ports.
    All,
    List(Vec<u16>),
}

impl PortSpec {
    pub fn resolve(&self) -> Vec<u16> {
        match self {
            PortSpec::All => camera_ports(),
            PortSpec::List(ports) => ports.clone(),
        }
    }
}

impl FromStr for PortSpec {
    type Err = ScanError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        match input.to_lowercase().as_str() {
            "" | "all" | "0-65535" | "1-65535" => return Ok(PortSpec::All),
            _ => {}
        }

        let mut seen = HashSet::new();
        let mut ports = Vec::new();
        for item in input.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let range = match item.split_once('-') {
                Some((start, end)) => {
                    let start = parse_port(start)?;
                    let end = parse_port(end)?;
                    if start > end {
                        return Err(ScanError::Setup(format!("invalid port range: {}", item)));
                    }
                    start..=end
                }
                None => {
                    let port = parse_port(item)?;
                    port..=port
                }
            };
            ports.extend(range.filter(|p| seen.insert(*p)));
        }

        if ports.is_empty() {
            return Err(ScanError::Setup(format!("no ports in specification: {}", input)));
        }
        Ok(PortSpec::List(ports))
    }
}

fn parse_port(raw: &str) -> Result<u16, ScanError> {
    match raw.trim().parse::<u16>() {
        Ok(0) | Err(_) => Err(ScanError::Setup(format!("invalid port: {}", raw.trim()))),
        Ok(port) => Ok(port),
    }
}

/// Comma-separated form understood by external scanners.
pub fn render(ports: &[u16]) -> String {
    ports
        .iter()
        .map(u16::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
