use std::time::Duration;

use log::{info, warn};
use tokio::time::{sleep, Instant};

use crate::{
    display::{layout::draw_offline, SharedDisplay},
    state::SharedState,
    Result,
};

pub const HEARTBEAT_HALF_PERIOD: Duration = Duration::from_millis(500);
pub const LED_ON: u8 = 128;
pub const LED_OFF: u8 = 0;

/// Blink the activity LED and refresh uptime once per cycle. Never returns.
pub async fn run_heartbeat(state: SharedState, display: SharedDisplay) {
    loop {
        set_led(&display, LED_ON);
        sleep(HEARTBEAT_HALF_PERIOD).await;
        set_led(&display, LED_OFF);
        state.refresh_uptime(Instant::now());
        sleep(HEARTBEAT_HALF_PERIOD).await;
    }
}

fn set_led(display: &SharedDisplay, brightness: u8) {
    if let Err(err) = display.borrow_mut().set_led(brightness) {
        warn!("led update failed: {err}");
    }
}

/// Wait for Ctrl-C, then leave the "offline" splash on the panel.
pub async fn wait_for_shutdown(display: SharedDisplay) -> Result<()> {
    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    draw_offline(&mut *display.borrow_mut())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{display::RecordingDisplay, sensors::SensorDescriptor};
    use std::{cell::RefCell, rc::Rc};

    #[tokio::test(start_paused = true)]
    async fn heartbeat_blinks_and_updates_uptime() {
        let state = SharedState::new(vec![SensorDescriptor::local("A", "a", 0)], 1);
        let recorder = Rc::new(RefCell::new(RecordingDisplay::new()));
        let display: SharedDisplay = recorder.clone();
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                tokio::task::spawn_local(run_heartbeat(state.clone(), display));
                sleep(Duration::from_millis(250)).await;
                assert_eq!(recorder.borrow().led(), LED_ON);
                sleep(Duration::from_millis(500)).await;
                assert_eq!(recorder.borrow().led(), LED_OFF);
                sleep(Duration::from_secs(3)).await;
            })
            .await;
        assert_eq!(state.statistics().uptime_seconds, 3);
    }
}
