use std::net::IpAddr;
use std::time::Duration;
use tokio::net::UdpSocket;

use crate::core::{deadline::Deadline, ports::ONVIF_DISCOVERY_PORT};

const PROBE_ENVELOPE: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8"?>"#,
    r#"<e:Envelope xmlns:e="http://www.w3.org/2003/05/soap-envelope" "#,
    r#"xmlns:w="http://schemas.xmlsoap.org/ws/2004/08/addressing" "#,
    r#"xmlns:d="http://schemas.xmlsoap.org/ws/2005/04/discovery" "#,
    r#"xmlns:dn="http://www.onvif.org/ver10/network/wsdl">"#,
    r#"<e:Header>"#,
    r#"<w:MessageID>uuid:00000000-0000-0000-0000-000000000000</w:MessageID>"#,
    r#"<w:To e:mustUnderstand="true">urn:schemas-xmlsoap-org:ws:2005:04:discovery</w:To>"#,
    r#"<w:Action e:mustUnderstand="true">http://schemas.xmlsoap.org/ws/2005/04/discovery/Probe</w:Action>"#,
    r#"</e:Header>"#,
    r#"<e:Body><d:Probe><d:Types>dn:NetworkVideoTransmitter</d:Types></d:Probe></e:Body>"#,
    r#"</e:Envelope>"#,
);

/// Unicast WS-Discovery probe. Returns a short description of the reply, or
/// an empty string when nothing answered in time.
pub async fn probe(host: &str, reply_timeout: Duration, deadline: Deadline) -> String {
    probe_port(host, ONVIF_DISCOVERY_PORT, reply_timeout, deadline).await
}

async fn probe_port(host: &str, port: u16, reply_timeout: Duration, deadline: Deadline) -> String {
    let exchange = async {
        let bind = match host.parse::<IpAddr>() {
            Ok(IpAddr::V6(_)) => "[::]:0",
            _ => "0.0.0.0:0",
        };
        let socket = UdpSocket::bind(bind).await?;
        socket.connect((host, port)).await?;
        socket.send(PROBE_ENVELOPE.as_bytes()).await?;
        let mut buf = vec![0u8; 8192];
        let n = socket.recv(&mut buf).await?;
        Ok::<_, std::io::Error>(n)
    };

    match deadline.within(reply_timeout, exchange).await {
        Some(Ok(n)) if n > 0 => format!("WS-Discovery response ({} bytes)", n),
        Some(Ok(_)) => String::new(),
        Some(Err(e)) => {
            tracing::debug!(host, error = %e, "onvif probe failed");
            String::new()
        }
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reports_reply_size() {
        let responder = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = responder.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut buf = vec![0u8; 8192];
            let (n, peer) = responder.recv_from(&mut buf).await.unwrap();
            assert!(String::from_utf8_lossy(&buf[..n]).contains("NetworkVideoTransmitter"));
            responder.send_to(b"<ProbeMatches/>", peer).await.unwrap();
        });

        let text = probe_port("127.0.0.1", port, Duration::from_secs(2), Deadline::after(Duration::from_secs(10))).await;
        assert_eq!(text, "WS-Discovery response (15 bytes)");
    }

    #[tokio::test]
    async fn silence_is_empty() {
        let quiet = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = quiet.local_addr().unwrap().port();
        let text = probe_port("127.0.0.1", port, Duration::from_millis(200), Deadline::after(Duration::from_secs(10))).await;
        assert!(text.is_empty());
        drop(quiet);
    }
}
