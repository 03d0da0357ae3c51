/// Known vulnerabilities by lower-cased vendor name.
const TABLE: &[(&str, &[&str])] = &[
    ("hikvision", &["CVE-2017-7921", "CVE-2021-36260", "CVE-2014-4878", "CVE-2013-4977"]),
    ("dahua", &["CVE-2021-33044", "CVE-2021-33045", "CVE-2017-7927", "CVE-2013-6117"]),
    ("axis", &["CVE-2018-10660", "CVE-2018-10661", "CVE-2018-10662"]),
    ("sony", &["CVE-2018-3937"]),
    ("bosch", &["CVE-2018-19036"]),
    ("samsung", &["CVE-2018-6294", "CVE-2018-6295"]),
    ("cp plus", &["CVE-2021-33044"]),
    ("hipcam", &["CVE-2017-8225"]),
    ("h264dvr", &["CVE-2017-7577"]),
];

const NVD_DETAIL: &str = "https://nvd.nist.gov/vuln/detail/";

/// Pure lookup; unknown vendors get an empty list.
pub fn for_vendor(vendor: &str) -> Vec<String> {
    let key = vendor.trim().to_lowercase();
    TABLE
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, ids)| ids.iter().map(|s| s.to_string()).collect())
        .unwrap_or_default()
}

pub fn links(ids: &[String]) -> Vec<String> {
    ids.iter().map(|id| format!("{}{}", NVD_DETAIL, id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive_and_stable() {
        let first = for_vendor("HIKVISION");
        assert!(!first.is_empty());
        assert_eq!(first, for_vendor("hikvision"));
        assert!(for_vendor("Unknown cam").is_empty());
        assert!(for_vendor("").is_empty());
    }

    #[test]
    fn links_point_at_nvd() {
        let ids = vec!["CVE-2017-7921".to_string()];
        assert_eq!(links(&ids), vec!["https://nvd.nist.gov/vuln/detail/CVE-2017-7921"]);
    }
}
