use regex::Regex;
use std::collections::HashMap;
use std::sync::RwLock;

use super::cvedb;
use super::vendors::{contains_any, rtsp_vendor, GENERIC_KEYWORDS, VENDORS};
use crate::core::models::Fingerprint;

pub const UNKNOWN_CAMERA: &str = "Unknown cam";

/// Vendor detection memoized by the normalized signal triple.
///
/// The cache is additive and never evicted; its size is bounded by the number
/// of distinct banner/body/RTSP combinations seen, not by host count.
/// TODO: cap entries or add a TTL before reusing this in a long-lived service.
pub struct FingerprintEngine {
    cache: RwLock<HashMap<String, Fingerprint>>,
    versions: HashMap<&'static str, Regex>,
}

impl Default for FingerprintEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FingerprintEngine {
    pub fn new() -> Self {
        let versions = VENDORS
            .iter()
            .filter_map(|v| {
                let pattern = v.version_pattern?;
                match Regex::new(pattern) {
                    Ok(re) => Some((v.name, re)),
                    Err(e) => {
                        tracing::warn!(vendor = v.name, error = %e, "skipping version pattern");
                        None
                    }
                }
            })
            .collect();
        Self {
            cache: RwLock::new(HashMap::new()),
            versions,
        }
    }

    /// `(vendor, note)`; both empty when nothing matched.
    pub fn detect(&self, server: &str, body: &str, rtsp_server: &str) -> (String, String) {
        let fp = self.fingerprint(server, body, rtsp_server);
        (fp.vendor, fp.note)
    }

    /// Detection plus correlated vulnerabilities, served from the cache when
    /// the same signals were seen before.
    pub fn fingerprint(&self, server: &str, body: &str, rtsp_server: &str) -> Fingerprint {
        let key = format!("{}|{}|{}", server, body, rtsp_server).to_lowercase();

        if let Some(hit) = self.cache.read().ok().and_then(|c| c.get(&key).cloned()) {
            return hit;
        }

        let (vendor, note) = self.classify(server, body, rtsp_server);
        let fp = Fingerprint {
            vulnerabilities: correlate(&vendor),
            vendor,
            note,
        };

        if let Ok(mut cache) = self.cache.write() {
            cache.entry(key).or_insert_with(|| fp.clone());
        }
        fp
    }

    pub fn cached(&self) -> usize {
        self.cache.read().map(|c| c.len()).unwrap_or(0)
    }

    fn classify(&self, server: &str, body: &str, rtsp_server: &str) -> (String, String) {
        let lh = server.to_lowercase();
        let lb = body.to_lowercase();
        let lr = rtsp_server.to_lowercase();

        for rule in VENDORS {
            let header_hit = !rule.body_only && contains_any(&lh, rule.keywords);
            if header_hit || contains_any(&lb, rule.keywords) {
                let note = self
                    .version(rule.name, body)
                    .map(|v| format!("Version: {}", v))
                    .unwrap_or_default();
                return (rule.name.to_string(), note);
            }
            if !rule.rtsp_token.is_empty() && lr.contains(rule.rtsp_token) {
                let mut note = format!("RTSP server: {}", rtsp_server);
                if let Some(v) = self.version(rule.name, rtsp_server) {
                    note.push_str(&format!(" | Version: {}", v));
                }
                return (rule.name.to_string(), note);
            }
        }

        if let Some(vendor) = rtsp_vendor(rtsp_server) {
            return (vendor, format!("RTSP server: {}", rtsp_server));
        }

        if [&lh, &lb, &lr].iter().any(|s| contains_any(s, GENERIC_KEYWORDS)) {
            return (UNKNOWN_CAMERA.to_string(), String::new());
        }

        (String::new(), String::new())
    }

    fn version(&self, vendor: &str, text: &str) -> Option<String> {
        self.versions
            .get(vendor)?
            .captures(text)?
            .get(1)
            .map(|m| m.as_str().to_string())
    }
}

/// Pure function of the vendor name.
pub fn correlate(vendor: &str) -> Vec<String> {
    if vendor.is_empty() {
        return Vec::new();
    }
    cvedb::for_vendor(vendor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn hikvision_banner_is_detected_with_vulnerabilities() {
        let engine = FingerprintEngine::new();
        let fp = engine.fingerprint("HiKVISION-Webs", "", "");
        assert_eq!(fp.vendor, "Hikvision");
        assert!(!fp.vulnerabilities.is_empty());
    }

    #[rstest]
    #[case("Boa/0.94.14rc21", "<title>dahua web</title>", "", "Dahua")]
    #[case("", "axis communications", "", "Axis")]
    #[case("lighttpd", "<title>login</title>", "Hipcam RealServer/V1.0", "Hipcam")]
    #[case("", "", "Dahua Rtsp Server", "Dahua")]
    #[case("cp plus", "", "", "")]
    #[case("", "welcome to cp plus", "", "CP Plus")]
    #[case("thttpd", "<html>webcam</html>", "", UNKNOWN_CAMERA)]
    #[case("nginx", "<html>hello</html>", "", "")]
    fn vendor_priority(#[case] server: &str, #[case] body: &str, #[case] rtsp: &str, #[case] expected: &str) {
        let (vendor, _) = FingerprintEngine::new().detect(server, body, rtsp);
        assert_eq!(vendor, expected);
    }

    #[test]
    fn rtsp_only_vendor_gets_banner_note() {
        let (vendor, note) = FingerprintEngine::new().detect("", "", "UBNT Streamer v2");
        assert_eq!(vendor, "Ubiquiti");
        assert_eq!(note, "RTSP server: UBNT Streamer v2");
    }

    #[test]
    fn version_is_extracted_into_note() {
        let (vendor, note) =
            FingerprintEngine::new().detect("HiKVISION-WebService/1.0", "hikvision web service v4.1.2", "");
        assert_eq!(vendor, "Hikvision");
        assert_eq!(note, "Version: 4.1.2");
    }

    #[test]
    fn detection_is_memoized_and_stable() {
        let engine = FingerprintEngine::new();
        let first = engine.fingerprint("App-webs/", "<title>hikvision</title>", "");
        let second = engine.fingerprint("App-webs/", "<title>hikvision</title>", "");
        assert_eq!(first, second);
        assert_eq!(engine.cached(), 1);
        assert_eq!(correlate(&first.vendor), correlate(&second.vendor));
        assert_eq!(correlate(&first.vendor), first.vulnerabilities);
    }

    #[test]
    fn cache_key_ignores_case() {
        let engine = FingerprintEngine::new();
        engine.detect("AXIS", "", "");
        engine.detect("axis", "", "");
        assert_eq!(engine.cached(), 1);
        assert_eq!(FingerprintEngine::new().cached(), 0);
    }

    #[test]
    fn unknown_vendor_correlates_to_nothing() {
        assert!(correlate("").is_empty());
        assert!(correlate(UNKNOWN_CAMERA).is_empty());
        assert!(correlate("Acme").is_empty());
    }
}
