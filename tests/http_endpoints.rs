use std::net::SocketAddr;

use homebadger::{
    http,
    sensors::{SensorDescriptor, SensorValue, ValueFormat},
    state::SharedState,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    task::LocalSet,
    time::Instant,
};

fn badge_state() -> SharedState {
    SharedState::new(
        vec![
            SensorDescriptor::local("BME688\nTemp. (C)", "bme688_temperature", 0)
                .with_format(ValueFormat::fixed(1)),
            SensorDescriptor::local("BME688\nHumidity", "bme688_humidity", 1)
                .with_format(ValueFormat::fixed(0).with_suffix("%")),
            SensorDescriptor::remote("Outdoors\nTemp. (C)", "sensor.temperature_outdoor"),
        ],
        3,
    )
}

async fn start(state: &SharedState) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::task::spawn_local(http::serve(listener, state.clone()));
    addr
}

async fn send(addr: SocketAddr, request: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    String::from_utf8(raw).unwrap()
}

fn body(response: &str) -> &str {
    response.split_once("\r\n\r\n").map(|(_, b)| b).unwrap_or_default()
}

#[tokio::test]
async fn status_page_before_first_reading_shows_placeholders() {
    let state = badge_state();
    LocalSet::new()
        .run_until(async {
            let addr = start(&state).await;
            let response = send(addr, "GET / HTTP/1.1\r\nHost: badger\r\n\r\n").await;
            assert!(response.starts_with("HTTP/1.0 200 OK\r\n"));
            assert!(response.contains("Content-Type: text/html\r\n"));
            let html = body(&response);
            assert!(html.contains("<th>BME688 Temp. (C)</th><td>??</td><td>??</td>"));
            assert!(html.contains("<a href=\"/json\">"));
        })
        .await;
    assert_eq!(state.statistics().requests_received, 1);
}

#[tokio::test]
async fn json_lists_each_local_sensor_once() {
    let state = badge_state();
    state.with_cache(|cache| cache.update(0, SensorValue::from(21.34), Instant::now()));
    LocalSet::new()
        .run_until(async {
            let addr = start(&state).await;
            let response = send(addr, "GET /json HTTP/1.0\r\n\r\n").await;
            assert!(response.contains("Content-Type: application/json\r\n"));
            let doc: serde_json::Value = serde_json::from_str(body(&response)).unwrap();
            let sensors = doc["sensors"].as_object().unwrap();
            assert_eq!(sensors.len(), 2);
            assert_eq!(sensors["bme688_temperature"], serde_json::json!(21.34));
            assert!(sensors["bme688_humidity"].is_null());
            assert_eq!(doc["homebadger_statistics"]["requests_received"], 1);
            assert_eq!(doc["homebadger_statistics"]["ha_sensor_count"], 1);
        })
        .await;
}

#[tokio::test]
async fn unknown_path_is_404_and_still_counted() {
    let state = badge_state();
    LocalSet::new()
        .run_until(async {
            let addr = start(&state).await;
            let response = send(addr, "GET /does-not-exist HTTP/1.0\r\n\r\n").await;
            assert!(response.starts_with("HTTP/1.0 404 Not Found\r\n"));
            assert_eq!(body(&response), "Not found.");
        })
        .await;
    let stats = state.statistics();
    assert_eq!(stats.requests_received, 1);
    assert_eq!(stats.errors_in_requests_received, 0);
}

#[tokio::test]
async fn non_get_requests_are_closed_without_reply() {
    let state = badge_state();
    LocalSet::new()
        .run_until(async {
            let addr = start(&state).await;
            let response = send(addr, "POST / HTTP/1.0\r\nContent-Length: 0\r\n\r\n").await;
            assert!(response.is_empty());
            let response = send(addr, "GET /\r\n\r\n").await;
            assert!(response.is_empty());
            // The server stays up after both.
            let response = send(addr, "GET /json HTTP/1.0\r\n\r\n").await;
            assert!(response.starts_with("HTTP/1.0 200 OK"));
        })
        .await;
    let stats = state.statistics();
    assert_eq!(stats.requests_received, 1);
    assert_eq!(stats.errors_in_requests_received, 1);
}
