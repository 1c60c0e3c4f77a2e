use std::time::Duration;

use homebadger::{
    app::polling::poll_remote_once,
    remote::RemoteClient,
    sensors::{SensorDescriptor, SensorValue},
    state::SharedState,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
    task::JoinHandle,
    time::Instant,
};

const STALENESS: Duration = Duration::from_secs(30);

fn badge_state() -> SharedState {
    SharedState::new(
        vec![
            SensorDescriptor::local("Temp", "temp", 0),
            SensorDescriptor::remote("Outdoors", "sensor.temperature_outdoor"),
        ],
        2,
    )
}

/// Answer one request with `response` and hand back what the client sent.
async fn fake_service(response: &'static str) -> (u16, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 512];
        while !request.ends_with(b"\r\n\r\n") {
            let n = stream.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.unwrap();
        String::from_utf8(request).unwrap()
    });
    (port, handle)
}

/// Read one request, optionally answer it, then report whether the client
/// closed its end (EOF) within two seconds.
async fn closing_service(response: Option<&'static str>) -> (u16, JoinHandle<bool>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 512];
        while !request.ends_with(b"\r\n\r\n") {
            let n = stream.read(&mut buf).await.unwrap();
            if n == 0 {
                return true;
            }
            request.extend_from_slice(&buf[..n]);
        }
        if let Some(response) = response {
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
        }
        matches!(
            tokio::time::timeout(Duration::from_secs(2), stream.read(&mut buf)).await,
            Ok(Ok(0))
        )
    });
    (port, handle)
}

fn client(port: u16) -> RemoteClient {
    RemoteClient::new("127.0.0.1", port, "t0k", Duration::from_secs(2))
}

#[tokio::test]
async fn successful_response_updates_value_and_timestamp() {
    let state = badge_state();
    let (port, server) = fake_service(
        "HTTP/1.0 200 OK\r\nContent-Type: application/json\r\n\r\n{\"state\": \"12.5\"}",
    )
    .await;
    let before = Instant::now();

    poll_remote_once(&state, &client(port), STALENESS).await;

    let request = server.await.unwrap();
    assert!(request.starts_with("GET /api/states/sensor.temperature_outdoor HTTP/1.0\r\n"));
    assert!(request.contains("Authorization: Bearer t0k\r\n"));

    let reading = state.reading(1).unwrap();
    assert_eq!(reading.value, SensorValue::from("12.5"));
    assert!(reading.last_updated >= before);
    let stats = state.statistics();
    assert_eq!(stats.requests_sent_to_ha, 1);
    assert_eq!(stats.errors_in_requests_sent_to_ha, 0);
}

#[tokio::test]
async fn failed_response_keeps_previous_reading() {
    let state = badge_state();
    let stamp = Instant::now();
    state.with_cache(|cache| cache.update(1, SensorValue::from("9.0"), stamp));
    tokio::time::sleep(Duration::from_millis(5)).await;

    let (port, server) = fake_service("HTTP/1.0 200 OK\r\n\r\n{\"entity_id\": \"x\"}").await;
    poll_remote_once(&state, &client(port), Duration::ZERO).await;
    server.await.unwrap();

    let reading = state.reading(1).unwrap();
    assert_eq!(reading.value, SensorValue::from("9.0"));
    assert_eq!(reading.last_updated, stamp);
    let stats = state.statistics();
    assert_eq!(stats.requests_sent_to_ha, 1);
    assert_eq!(stats.errors_in_requests_sent_to_ha, 1);
}

#[tokio::test]
async fn unreachable_service_counts_one_error_per_attempt() {
    let state = badge_state();
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };

    poll_remote_once(&state, &client(port), STALENESS).await;
    poll_remote_once(&state, &client(port), STALENESS).await;

    assert!(state.reading(1).is_none());
    let stats = state.statistics();
    assert_eq!(stats.requests_sent_to_ha, 2);
    assert_eq!(stats.errors_in_requests_sent_to_ha, 2);
}

#[tokio::test]
async fn silent_service_times_out_and_connection_is_closed() {
    let state = badge_state();
    let (port, server) = closing_service(None).await;
    let slow = RemoteClient::new("127.0.0.1", port, "t0k", Duration::from_millis(100));

    poll_remote_once(&state, &slow, STALENESS).await;

    assert!(state.reading(1).is_none());
    assert_eq!(state.statistics().errors_in_requests_sent_to_ha, 1);
    assert!(server.await.unwrap(), "connection left open after timeout");
}

#[tokio::test]
async fn malformed_response_connection_is_closed() {
    let state = badge_state();
    let response = "HTTP/1.0 200 OK\r\n\r\n{\"entity_id\": \"x\"}";
    let (port, server) = closing_service(Some(response)).await;

    poll_remote_once(&state, &client(port), STALENESS).await;

    assert!(state.reading(1).is_none());
    assert_eq!(state.statistics().errors_in_requests_sent_to_ha, 1);
    assert!(server.await.unwrap(), "connection left open after bad body");
}

#[tokio::test]
async fn fresh_reading_is_not_requested_again() {
    let state = badge_state();
    state.with_cache(|cache| cache.update(1, SensorValue::from("3"), Instant::now()));

    // Port 9 is never contacted because the reading is fresh.
    poll_remote_once(&state, &client(9), STALENESS).await;

    assert_eq!(state.statistics().requests_sent_to_ha, 0);
}
