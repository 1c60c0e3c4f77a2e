//! Minimal HTTP/1.0 status endpoint: one connection at a time, `GET` only.

use std::{collections::BTreeMap, time::Duration};

use log::{debug, info, warn};
use serde::Serialize;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};

use crate::{
    sensors::{SensorSource, SensorValue, PLACEHOLDER},
    state::{Counter, SharedState, Statistics},
    Error, Result,
};

pub const MAX_REQUEST_BYTES: usize = 1024;
/// A client that connects and never sends must not wedge the serial accept loop.
pub const REQUEST_READ_TIMEOUT: Duration = Duration::from_secs(5);

const HTML_START: &str = concat!(
    "<!doctype html><html><head><meta charset=\"utf-8\">",
    "<meta name=\"viewport\" content=\"width=device-width\"><title>Home Badger</title></head>",
    "<body><h1>Home Badger</h1><h2>Status:</h2><table border=\"1\">"
);
const HTML_END: &str =
    "</table><p>Machine-readable version at <a href=\"/json\">/json</a></p></body></html>";

#[derive(Serialize)]
struct StatusDocument<'a> {
    sensors: BTreeMap<&'a str, Option<SensorValue>>,
    homebadger_statistics: Statistics,
}

/// Accept connections forever, handling each to completion before the next.
pub async fn serve(listener: TcpListener, state: SharedState) {
    if let Ok(addr) = listener.local_addr() {
        info!("http server listening on {addr}");
    }
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                debug!("connection from {peer}");
                handle_connection(stream, &state).await;
            }
            Err(err) => warn!("accept failed: {err}"),
        }
    }
}

/// Serve one connection and close it, whatever the outcome.
pub async fn handle_connection(mut stream: TcpStream, state: &SharedState) {
    if let Err(err) = respond(&mut stream, state).await {
        state.record(Counter::RequestErrors);
        warn!("request failed: {err}");
    }
    let _ = stream.shutdown().await;
}

async fn respond(stream: &mut TcpStream, state: &SharedState) -> Result<()> {
    let mut buf = [0u8; MAX_REQUEST_BYTES];
    let read = tokio::time::timeout(REQUEST_READ_TIMEOUT, stream.read(&mut buf))
        .await
        .map_err(|_| Error::Timeout(REQUEST_READ_TIMEOUT))??;
    let request = String::from_utf8_lossy(&buf[..read]);

    let Some(path) = parse_request_line(&request)? else {
        debug!("ignoring non-GET request");
        return Ok(());
    };
    info!("received request for {path}");
    state.record(Counter::RequestsReceived);

    let response = route(path, state);
    stream.write_all(&response).await?;
    stream.flush().await?;
    Ok(())
}

/// Path of a `GET` request line. `Ok(None)` for other methods or empty input,
/// `Err` for a `GET` line that is not `METHOD PATH PROTOCOL`.
pub fn parse_request_line(raw: &str) -> Result<Option<&str>> {
    let line = raw.split("\r\n").next().unwrap_or_default();
    if !line.starts_with("GET") {
        return Ok(None);
    }
    let parts: Vec<&str> = line.split(' ').collect();
    match parts.as_slice() {
        ["GET", path, _protocol] => Ok(Some(*path)),
        _ => Err(Error::Parse(format!("malformed request line '{line}'"))),
    }
}

pub fn route(path: &str, state: &SharedState) -> Vec<u8> {
    match path {
        "/" => make_response("text/html", &build_html(state), "200 OK"),
        "/json" => make_response("application/json", &build_json(state), "200 OK"),
        _ => make_response("text/plain", "Not found.", "404 Not Found"),
    }
}

pub fn make_response(content_type: &str, body: &str, status: &str) -> Vec<u8> {
    format!(
        "HTTP/1.0 {status}\r\nConnection: close\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    )
    .into_bytes()
}

/// Status page: local sensors with display and precise values, then every counter.
pub fn build_html(state: &SharedState) -> String {
    let mut rows = vec![
        HTML_START.to_string(),
        "<tr><th colspan=\"3\">Sensor values</th></tr>".to_string(),
        "<tr><th>Display name</th><th>Display value</th><th>Precise value</th></tr>".to_string(),
    ];

    state.with_cache(|cache| {
        for (idx, sensor) in state.sensors().iter().enumerate() {
            if !sensor.is_local() {
                continue;
            }
            let value = cache.value(idx);
            let precise = value
                .map(|v| v.to_string())
                .unwrap_or_else(|| PLACEHOLDER.to_string());
            rows.push(format!(
                "<tr><th>{}</th><td>{}</td><td>{}</td></tr>",
                escape_html(&sensor.flat_title()),
                escape_html(&sensor.display_value(value)),
                escape_html(&precise),
            ));
        }
    });

    rows.push("<tr><th colspan=\"3\">Homebadger statistics</th></tr>".to_string());
    for (name, value) in state.statistics().entries() {
        rows.push(format!(
            "<tr><th>{}</th><td colspan=\"2\">{value}</td></tr>",
            name.replace('_', " ")
        ));
    }
    rows.push(HTML_END.to_string());
    rows.join("\n")
}

/// `{"sensors": {key: raw-or-null}, "homebadger_statistics": {...}}` for local sensors.
pub fn build_json(state: &SharedState) -> String {
    let sensors: BTreeMap<&str, Option<SensorValue>> = state.with_cache(|cache| {
        state
            .sensors()
            .iter()
            .enumerate()
            .filter_map(|(idx, sensor)| match &sensor.source {
                SensorSource::Local { key, .. } => Some((key.as_str(), cache.value(idx).cloned())),
                SensorSource::Remote { .. } => None,
            })
            .collect()
    });
    let doc = StatusDocument {
        sensors,
        homebadger_statistics: state.statistics(),
    };
    // Maps with string keys and plain values always serialize.
    serde_json::to_string(&doc).unwrap_or_else(|_| "{}".to_string())
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}
