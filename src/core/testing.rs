use chrono::{Duration, TimeZone, Utc};

use super::types::{Alert, AlertId, AlertStatus, Severity};

pub(crate) fn alert(id: &str, zone: &str, severity: Severity, status: AlertStatus) -> Alert {
    Alert {
        id: AlertId::new(id),
        timestamp: Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap(),
        camera: "CAM-01".into(),
        zone: zone.into(),
        event: "Fence Damage Detected".into(),
        scenario: "fence_damage".into(),
        severity,
        status,
        details: None,
        confidence: Some(0.91),
    }
}

/// Alert `offset_mins` after 2024-03-04 10:00 UTC (a Monday).
pub(crate) fn alert_at(id: &str, offset_mins: i64) -> Alert {
    let mut a = alert(id, "A", Severity::Low, AlertStatus::Logged);
    a.timestamp += Duration::minutes(offset_mins);
    a
}

pub(crate) fn scenario_alert(id: &str, zone: &str, severity: Severity, scenario: &str, event: &str) -> Alert {
    let mut a = alert(id, zone, severity, AlertStatus::Logged);
    a.scenario = scenario.into();
    a.event = event.into();
    a
}

/// Minimal HTTP/1.1 responder: `routes` maps a path to `(status, body)`.
/// Unknown paths get 404. One request per connection.
pub(crate) async fn serve_http(routes: Vec<(&'static str, u16, String)>) -> std::net::SocketAddr {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else { return };
            let routes = routes.clone();

            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }

                let head = String::from_utf8_lossy(&request);
                let path = head.split_whitespace().nth(1).unwrap_or("/").to_string();
                let (status, body) = routes
                    .iter()
                    .find(|(p, _, _)| *p == path)
                    .map(|(_, status, body)| (*status, body.clone()))
                    .unwrap_or((404, String::new()));

                let response = format!(
                    "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });

    addr
}

/// Accepts connections and never answers.
pub(crate) async fn serve_silence() -> std::net::SocketAddr {
    use tokio::net::TcpListener;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    addr
}
