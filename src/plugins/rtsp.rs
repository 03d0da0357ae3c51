use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use super::http::authority;
use crate::core::{deadline::Deadline, models::RtspInfo};

/// Sends `OPTIONS` to each RTSP port in turn, stopping at the first 200.
pub async fn probe(
    host: &str,
    ports: &[u16],
    connect_timeout: Duration,
    exchange_timeout: Duration,
    deadline: Deadline,
) -> RtspInfo {
    for &port in ports {
        if deadline.is_elapsed() {
            break;
        }
        let info = options(host, port, connect_timeout, exchange_timeout, deadline).await;
        if info.any {
            return info;
        }
    }
    RtspInfo::default()
}

async fn options(
    host: &str,
    port: u16,
    connect_timeout: Duration,
    exchange_timeout: Duration,
    deadline: Deadline,
) -> RtspInfo {
    let mut stream = match deadline.within(connect_timeout, TcpStream::connect((host, port))).await {
        Some(Ok(stream)) => stream,
        Some(Err(e)) => {
            tracing::debug!(host, port, error = %e, "rtsp connect failed");
            return RtspInfo::default();
        }
        None => return RtspInfo::default(),
    };

    let request = format!(
        "OPTIONS rtsp://{} RTSP/1.0\r\nCSeq: 1\r\n\r\n",
        authority(host, port)
    );

    let exchange = async {
        stream.write_all(request.as_bytes()).await?;
        Ok::<_, std::io::Error>(read_options_response(BufReader::new(&mut stream)).await)
    };

    match deadline.within(exchange_timeout, exchange).await {
        Some(Ok(info)) => info,
        Some(Err(e)) => {
            tracing::debug!(host, port, error = %e, "rtsp exchange failed");
            RtspInfo::default()
        }
        None => RtspInfo::default(),
    }
}

/// Reads the status line and header block, keeping only `Server` and
/// `Public`. Anything but `RTSP/1.0 200` means no RTSP service. Header
/// bytes that are not UTF-8 are replaced, not treated as end of input.
pub async fn read_options_response<R: AsyncBufRead + Unpin>(mut reader: R) -> RtspInfo {
    let Some(status) = next_line(&mut reader).await else {
        return RtspInfo::default();
    };
    if !status.trim_start().starts_with("RTSP/1.0 200") {
        return RtspInfo::default();
    }

    let mut info = RtspInfo { any: true, ..RtspInfo::default() };
    while let Some(line) = next_line(&mut reader).await {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        let Some((name, value)) = line.split_once(':') else { continue };
        let value = value.trim();
        if name.eq_ignore_ascii_case("server") && info.server.is_empty() {
            info.server = value.to_string();
        } else if name.eq_ignore_ascii_case("public") && info.public.is_empty() {
            info.public = value.to_string();
        }
    }
    info
}

/// One `\n`-terminated line, lossily decoded. `None` at EOF or on a read error.
async fn next_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> Option<String> {
    let mut buf = Vec::new();
    match reader.read_until(b'\n', &mut buf).await {
        Ok(0) => None,
        Ok(_) => Some(String::from_utf8_lossy(&buf).into_owned()),
        Err(e) => {
            tracing::trace!(error = %e, "rtsp read stopped");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::raw_responder;
    use pretty_assertions::assert_eq;

    fn deadline() -> Deadline {
        Deadline::after(Duration::from_secs(10))
    }

    #[tokio::test]
    async fn parses_server_and_public() {
        let raw: &[u8] = b"RTSP/1.0 200 OK\r\nCSeq: 1\r\nServer: Hipcam RealServer/V1.0\r\nPublic: OPTIONS, DESCRIBE, PLAY\r\nServer: ignored\r\n\r\nleftover";
        let info = read_options_response(raw).await;
        assert_eq!(
            info,
            RtspInfo {
                any: true,
                server: "Hipcam RealServer/V1.0".into(),
                public: "OPTIONS, DESCRIBE, PLAY".into(),
            }
        );
    }

    #[tokio::test]
    async fn latin1_server_header_keeps_the_banner() {
        let raw: &[u8] = b"RTSP/1.0 200 OK\r\nCSeq: 1\r\nServer: C\xe1mara RTSP\r\nPublic: OPTIONS, DESCRIBE\r\n\r\n";
        let info = read_options_response(raw).await;
        assert_eq!(
            info,
            RtspInfo {
                any: true,
                server: "C\u{FFFD}mara RTSP".into(),
                public: "OPTIONS, DESCRIBE".into(),
            }
        );
    }

    #[tokio::test]
    async fn non_200_status_is_no_rtsp() {
        let raw: &[u8] = b"RTSP/1.0 401 Unauthorized\r\nServer: Dahua Rtsp Server\r\n\r\n";
        assert_eq!(read_options_response(raw).await, RtspInfo::default());
    }

    #[tokio::test]
    async fn garbage_is_no_rtsp() {
        let raw: &[u8] = b"HTTP/1.1 400 Bad Request\r\n\r\n";
        assert_eq!(read_options_response(raw).await, RtspInfo::default());
        assert_eq!(read_options_response(&b""[..]).await, RtspInfo::default());
    }

    #[tokio::test]
    async fn rejected_options_over_the_wire_gives_default_info() {
        let addr = raw_responder(b"RTSP/1.0 404 Not Found\r\nCSeq: 1\r\nServer: x\r\n\r\n").await;
        let info = probe(
            "127.0.0.1",
            &[addr.port()],
            Duration::from_millis(1200),
            Duration::from_millis(1500),
            deadline(),
        )
        .await;
        assert_eq!(info, RtspInfo { any: false, server: String::new(), public: String::new() });
    }

    #[tokio::test]
    async fn stops_at_first_answering_port() {
        let bad = raw_responder(b"RTSP/1.0 500 Internal Server Error\r\n\r\n").await;
        let good = raw_responder(b"RTSP/1.0 200 OK\r\nServer: GStreamer RTSP server\r\nPublic: OPTIONS\r\n\r\n").await;
        let info = probe(
            "127.0.0.1",
            &[bad.port(), good.port()],
            Duration::from_millis(1200),
            Duration::from_millis(1500),
            deadline(),
        )
        .await;
        assert!(info.any);
        assert_eq!(info.server, "GStreamer RTSP server");
    }
}
