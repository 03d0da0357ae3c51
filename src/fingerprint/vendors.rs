/// Keyword rule for one vendor. Keywords are matched as lower-case
/// substrings; `rtsp_token` is checked against the RTSP `Server` banner.
pub struct VendorRule {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
    pub rtsp_token: &'static str,
    /// Some vendors are too generic to trust in a `Server` header.
    pub body_only: bool,
    pub version_pattern: Option<&'static str>,
}

/// Detection priority; first match wins.
pub const VENDORS: &[VendorRule] = &[
    VendorRule {
        name: "Hikvision",
        keywords: &["hikvision", "dvr", "nvr", "hik-connect", "ivms", "web service"],
        rtsp_token: "hik",
        body_only: false,
        version_pattern: Some(r"(?i)(?:hikvision|hik-connect|ivms).*?v?(\d+\.\d+\.\d+(?:\.\d+)?)"),
    },
    VendorRule {
        name: "Dahua",
        keywords: &["dahua", "dvr", "nvr", "dss", "smartpss", "dmss"],
        rtsp_token: "dahua",
        body_only: false,
        version_pattern: Some(r"(?i)(?:dahua|dss|smartpss).*?v?(\d+\.\d+\.\d+(?:\.\d+)?)"),
    },
    VendorRule {
        name: "Axis",
        keywords: &["axis", "axis communications", "axis camera", "axis mjpg"],
        rtsp_token: "axis",
        body_only: false,
        version_pattern: Some(r"(?i)(?:axis|axis communications).*?v?(\d+\.\d+\.\d+(?:\.\d+)?)"),
    },
    VendorRule {
        name: "Sony",
        keywords: &["sony", "ipela", "snc", "sony network camera"],
        rtsp_token: "sony",
        body_only: false,
        version_pattern: Some(r"(?i)(?:sony|ipela).*?v?(\d+\.\d+\.\d+(?:\.\d+)?)"),
    },
    VendorRule {
        name: "Bosch",
        keywords: &["bosch", "security systems", "flexidome", "dinion", "autodome"],
        rtsp_token: "bosch",
        body_only: false,
        version_pattern: Some(r"(?i)(?:bosch|flexidome|dinion).*?v?(\d+\.\d+\.\d+(?:\.\d+)?)"),
    },
    VendorRule {
        name: "Samsung",
        keywords: &["samsung", "samsung techwin", "samsung sds", "hanwha", "wisenet"],
        rtsp_token: "samsung",
        body_only: false,
        version_pattern: Some(r"(?i)(?:samsung|hanwha|wisenet).*?v?(\d+\.\d+\.\d+(?:\.\d+)?)"),
    },
    VendorRule {
        name: "Panasonic",
        keywords: &["panasonic", "network camera", "wv", "bb", "blc"],
        rtsp_token: "panasonic",
        body_only: false,
        version_pattern: Some(r"(?i)(?:panasonic|wv|bb|blc).*?v?(\d+\.\d+\.\d+(?:\.\d+)?)"),
    },
    VendorRule {
        name: "Vivotek",
        keywords: &["vivotek", "network camera", "ip camera", "fd", "sd"],
        rtsp_token: "vivotek",
        body_only: false,
        version_pattern: Some(r"(?i)(?:vivotek|fd|sd).*?v?(\d+\.\d+\.\d+(?:\.\d+)?)"),
    },
    VendorRule {
        name: "CP Plus",
        keywords: &["cp plus", "cpplus", "cp-plus", "cp_plus"],
        rtsp_token: "",
        body_only: true,
        version_pattern: None,
    },
];

pub const GENERIC_KEYWORDS: &[&str] = &[
    "camera", "webcam", "surveillance", "ip camera", "network camera", "dvr", "nvr", "recorder",
];

/// Vendors that only ever identify themselves in RTSP `Server` banners.
const RTSP_ALIASES: &[(&[&str], &str)] = &[
    (&["hipcam"], "Hipcam"),
    (&["tvt"], "TVT"),
    (&["ubnt", "ubiquiti"], "Ubiquiti"),
    (&["gstreamer"], "GStreamer"),
    (&["h264dvr"], "H264DVR"),
    (&["rtprtspflyer"], "RtpRtspFlyer"),
];

/// Maps an RTSP `Server` banner to a vendor name. Banners that merely say
/// "RTSP server" identify nothing and yield `None`; unknown banners are
/// returned as-is.
pub fn rtsp_vendor(banner: &str) -> Option<String> {
    let banner = banner.trim();
    if banner.is_empty() {
        return None;
    }
    let low = banner.to_lowercase();
    for (tokens, name) in RTSP_ALIASES {
        if tokens.iter().any(|t| low.contains(t)) {
            return Some(name.to_string());
        }
    }
    if low.contains("rtsp") {
        return None;
    }
    Some(banner.to_string())
}

pub fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}
