use ipnetwork::IpNetwork;
use std::collections::HashSet;
use std::net::IpAddr;
use std::path::Path;
use std::str::FromStr;

use crate::core::errors::ScanError;

/// Expands CLI target arguments into unique addresses, first-seen order kept.
///
/// An argument naming an existing file contributes one target per line
/// (blank lines and `#` comments skipped). Everything else must be a CIDR
/// block, a literal IP or `localhost`.
pub fn expand(args: &[String]) -> Result<Vec<String>, ScanError> {
    let mut raw = Vec::new();
    for arg in args {
        if Path::new(arg).is_file() {
            raw.extend(read_target_file(arg)?);
        } else {
            raw.push(arg.trim().to_string());
        }
    }

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for entry in raw {
        for address in expand_one(&entry)? {
            if seen.insert(address.clone()) {
                out.push(address);
            }
        }
    }

    if out.is_empty() {
        return Err(ScanError::Setup("no targets given".into()));
    }
    tracing::debug!("Expanded {} argument(s) into {} target(s)", args.len(), out.len());
    Ok(out)
}

fn read_target_file(path: &str) -> Result<Vec<String>, ScanError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ScanError::Setup(format!("failed to read target file {}: {}", path, e)))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

fn expand_one(entry: &str) -> Result<Vec<String>, ScanError> {
    if entry.eq_ignore_ascii_case("localhost") {
        return Ok(vec!["localhost".to_string()]);
    }
    if let Ok(ip) = IpAddr::from_str(entry) {
        return Ok(vec![ip.to_string()]);
    }
    if entry.contains('/') {
        if let Ok(network) = IpNetwork::from_str(entry) {
            return Ok(network.iter().map(|ip| ip.to_string()).collect());
        }
    }
    Err(ScanError::Setup(format!("invalid target {:?}", entry)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn cidr_expands_every_address() {
        let out = expand(&args(&["192.0.2.0/30"])).unwrap();
        assert_eq!(out, vec!["192.0.2.0", "192.0.2.1", "192.0.2.2", "192.0.2.3"]);
    }

    #[test]
    fn duplicates_keep_first_position() {
        let out = expand(&args(&["10.0.0.2", "10.0.0.0/31", "10.0.0.2", "localhost"])).unwrap();
        assert_eq!(out, vec!["10.0.0.2", "10.0.0.0", "10.0.0.1", "localhost"]);
    }

    #[test]
    fn file_entries_skip_comments_and_blanks() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# cameras on the lab VLAN\n\n198.51.100.7\n  198.51.100.8  \n").unwrap();
        let path = file.path().to_string_lossy().to_string();

        let out = expand(&[path, "198.51.100.7".to_string()]).unwrap();
        assert_eq!(out, vec!["198.51.100.7", "198.51.100.8"]);
    }

    #[test]
    fn invalid_entry_is_setup_error_naming_it() {
        let err = expand(&args(&["10.0.0.1", "camera.local"])).unwrap_err();
        assert!(err.is_setup());
        assert!(err.to_string().contains("camera.local"));
    }

    #[test]
    fn ipv6_literal_is_normalised() {
        let out = expand(&args(&["2001:DB8::1"])).unwrap();
        assert_eq!(out, vec!["2001:db8::1"]);
    }
}
