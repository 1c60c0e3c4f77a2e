//! Client for the remote telemetry service's `GET /api/states/<entity>` endpoint.

use std::time::Duration;

use serde::Deserialize;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};

use crate::{config::RemoteConfig, sensors::SensorValue, Error, Result};

#[derive(Debug, Deserialize)]
struct StateBody {
    state: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct RemoteClient {
    host: String,
    port: u16,
    token: String,
    timeout: Duration,
}

impl RemoteClient {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            token: token.into(),
            timeout,
        }
    }

    pub fn from_config(config: &RemoteConfig) -> Self {
        Self::new(
            config.host.clone(),
            config.port,
            config.token.clone(),
            config.request_timeout,
        )
    }

    /// One round-trip for `entity_id`, bounded by the configured timeout.
    /// The connection is dropped, and therefore closed, on every return path.
    pub async fn fetch_state(&self, entity_id: &str) -> Result<SensorValue> {
        tokio::time::timeout(self.timeout, self.request(entity_id))
            .await
            .map_err(|_| Error::Timeout(self.timeout))?
    }

    async fn request(&self, entity_id: &str) -> Result<SensorValue> {
        let mut stream = TcpStream::connect((self.host.as_str(), self.port)).await?;
        stream
            .write_all(build_request(entity_id, &self.token).as_bytes())
            .await?;
        stream.flush().await?;
        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).await?;
        parse_state_response(&raw)
    }
}

pub fn build_request(entity_id: &str, token: &str) -> String {
    format!("GET /api/states/{entity_id} HTTP/1.0\r\nAuthorization: Bearer {token}\r\n\r\n")
}

/// Extract `state` from a full HTTP response (status line, headers, JSON body).
pub fn parse_state_response(raw: &[u8]) -> Result<SensorValue> {
    let text = std::str::from_utf8(raw)
        .map_err(|_| Error::Parse("response is not valid utf-8".into()))?;
    let (head, body) = text
        .split_once("\r\n\r\n")
        .ok_or_else(|| Error::Parse("response has no header terminator".into()))?;

    let status_line = head.lines().next().unwrap_or_default();
    let status = status_line.split(' ').nth(1).unwrap_or_default();
    if !status.starts_with('2') {
        return Err(Error::Remote(format!("unexpected status '{status_line}'")));
    }

    let parsed: StateBody = serde_json::from_str(body.trim())
        .map_err(|e| Error::Parse(format!("invalid state body: {e}")))?;
    match parsed.state {
        Some(serde_json::Value::String(s)) => Ok(SensorValue::Text(s)),
        Some(serde_json::Value::Number(n)) => n
            .as_f64()
            .map(SensorValue::Number)
            .ok_or_else(|| Error::Remote(format!("state {n} is out of range"))),
        Some(other) => Err(Error::Remote(format!("unsupported state value {other}"))),
        None => Err(Error::Remote("response has no state field".into())),
    }
}
