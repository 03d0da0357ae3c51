pub mod http;
pub mod http_meta;
pub mod login_pages;
pub mod mjpeg;
pub mod onvif;
pub mod portscan_connect;
pub mod portscan_masscan;
pub mod rtsp;
pub mod snapshot;
pub mod types;
