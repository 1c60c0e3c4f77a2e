use std::time::Duration;

use log::{debug, info, warn};
use tokio::time::{sleep, Instant};

use crate::{
    config::{Config, LocalKind},
    remote::RemoteClient,
    sensors::{local::IioChannel, DemoSensor, IioSensor, LocalSensor, SensorSource, SensorValue},
    state::{Counter, SharedState},
    Result,
};

/// Build the configured local peripheral; channel order follows `local_sensors`.
pub fn build_local_sensor(config: &Config) -> Box<dyn LocalSensor> {
    match config.local.kind {
        LocalKind::Demo => Box::new(DemoSensor::new(
            config
                .local_sensors
                .iter()
                .map(|s| s.demo_value.unwrap_or(0.0))
                .collect(),
        )),
        LocalKind::Iio => Box::new(IioSensor::new(
            &config.local.device,
            config
                .local_sensors
                .iter()
                .map(|s| IioChannel {
                    attribute: s.attribute.clone().unwrap_or_default(),
                    scale: s.scale,
                })
                .collect(),
        )),
    }
}

/// True when the sensor has never been read or its reading is older than `staleness`.
fn is_stale(state: &SharedState, idx: usize, staleness: Duration, now: Instant) -> bool {
    match state.reading(idx) {
        Some(reading) => now.saturating_duration_since(reading.last_updated) > staleness,
        None => true,
    }
}

/// One pass over the remote sensors. Stale ones are fetched one after another,
/// so at most one outbound connection is open at a time.
pub async fn poll_remote_once(state: &SharedState, client: &RemoteClient, staleness: Duration) {
    let targets: Vec<(usize, String)> = state
        .sensors()
        .iter()
        .enumerate()
        .filter_map(|(idx, sensor)| match &sensor.source {
            SensorSource::Remote { entity_id } => Some((idx, entity_id.clone())),
            SensorSource::Local { .. } => None,
        })
        .collect();

    for (idx, entity_id) in targets {
        if !is_stale(state, idx, staleness, Instant::now()) {
            continue;
        }
        state.record(Counter::RemoteRequests);
        match client.fetch_state(&entity_id).await {
            Ok(value) => {
                debug!("{entity_id} = {value}");
                state.with_cache(|cache| cache.update(idx, value, Instant::now()));
            }
            Err(err) => {
                state.record(Counter::RemoteErrors);
                warn!("failed to refresh {entity_id}: {err}");
            }
        }
    }
}

pub async fn run_remote_poller(
    state: SharedState,
    client: RemoteClient,
    interval: Duration,
    staleness: Duration,
) {
    info!(
        "remote poller started (interval={}, staleness={})",
        humantime::format_duration(interval),
        humantime::format_duration(staleness)
    );
    loop {
        poll_remote_once(&state, &client, staleness).await;
        sleep(interval).await;
    }
}

/// Read every channel and store them in one cache step. On failure nothing is written.
pub fn sample_local_once(state: &SharedState, sensor: &mut dyn LocalSensor) -> Result<()> {
    let values = sensor.read()?;
    let now = Instant::now();
    let channels: Vec<(usize, usize)> = state
        .sensors()
        .iter()
        .enumerate()
        .filter_map(|(idx, sensor)| match sensor.source {
            SensorSource::Local { channel, .. } => Some((idx, channel)),
            SensorSource::Remote { .. } => None,
        })
        .collect();
    state.with_cache(|cache| {
        for (idx, channel) in channels {
            if let Some(value) = values.get(channel) {
                cache.update(idx, SensorValue::Number(*value), now);
            }
        }
    });
    Ok(())
}

pub async fn run_local_poller(
    state: SharedState,
    mut sensor: Box<dyn LocalSensor>,
    interval: Duration,
) {
    info!(
        "local poller started (interval={})",
        humantime::format_duration(interval)
    );
    loop {
        if let Err(err) = sample_local_once(&state, sensor.as_mut()) {
            warn!("local sensor read failed, keeping previous readings: {err}");
        }
        sleep(interval).await;
    }
}
