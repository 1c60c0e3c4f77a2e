use std::time::Duration;

use log::{debug, info};
use tokio::time::sleep;

use crate::state::SharedState;

/// How often a disabled driver checks whether autoscroll was switched on.
pub const IDLE_CHECK: Duration = Duration::from_millis(200);

/// Advance by one sensor if autoscroll is on. Returns how long to wait next.
pub fn autoscroll_step(state: &SharedState, interval: Duration) -> Duration {
    if !state.view().autoscroll() {
        return IDLE_CHECK;
    }
    let view = state.update_view(|view| view.scroll_by(1));
    debug!("autoscroll to position {}", view.scroll_position());
    interval
}

pub async fn run_autoscroll(state: SharedState, interval: Duration) {
    info!(
        "autoscroll driver started (interval={})",
        humantime::format_duration(interval)
    );
    loop {
        let pause = autoscroll_step(&state, interval);
        sleep(pause).await;
    }
}
