use std::time::Duration;

use log::{debug, info, warn};
use tokio::time::sleep;

use crate::{
    display::{
        layout::{draw_page, VisibleSensor},
        SharedDisplay,
    },
    state::{Counter, SharedState, ViewState},
    Result,
};

/// Summary of what is on screen. A redraw happens only when this changes.
///
/// While autoscrolling the values are left out, so a ticking value does not
/// trigger a redraw until the page itself moves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    items_per_page: usize,
    scroll_position: usize,
    values: Option<Vec<String>>,
}

impl Fingerprint {
    pub fn capture(view: &ViewState, values: &[String]) -> Self {
        Self {
            items_per_page: view.items_per_page(),
            scroll_position: view.scroll_position(),
            values: (!view.autoscroll()).then(|| values.to_vec()),
        }
    }
}

/// Settled/dirty redraw loop over the shared view and cache.
pub struct RenderScheduler {
    state: SharedState,
    display: SharedDisplay,
    last: Option<Fingerprint>,
    settle: Duration,
    poll: Duration,
}

impl RenderScheduler {
    pub fn new(
        state: SharedState,
        display: SharedDisplay,
        settle: Duration,
        poll: Duration,
    ) -> Self {
        Self {
            state,
            display,
            last: None,
            settle,
            poll,
        }
    }

    /// Formatted values of the sensors currently in view.
    fn visible_values(&self, view: &ViewState) -> Vec<String> {
        let sensors = self.state.sensors();
        self.state.with_cache(|cache| {
            view.visible_indices()
                .into_iter()
                .map(|idx| sensors[idx].display_value(cache.value(idx)))
                .collect()
        })
    }

    /// One scheduler tick. Returns whether a redraw happened.
    pub fn render_if_changed(&mut self) -> Result<bool> {
        let view = self.state.view();
        let values = self.visible_values(&view);
        let fingerprint = Fingerprint::capture(&view, &values);
        if self.last.as_ref() == Some(&fingerprint) {
            return Ok(false);
        }

        let sensors = self.state.sensors();
        let visible: Vec<VisibleSensor> = view
            .visible_indices()
            .into_iter()
            .zip(values)
            .map(|(idx, value)| VisibleSensor {
                title: &sensors[idx].title,
                value,
            })
            .collect();
        draw_page(&mut *self.display.borrow_mut(), &view, &visible)?;

        debug!(
            "redrew page at position {} ({} per page)",
            view.scroll_position(),
            view.items_per_page()
        );
        self.last = Some(fingerprint);
        self.state.record(Counter::ScreenRefreshes);
        Ok(true)
    }

    pub async fn run(mut self) {
        info!(
            "render scheduler started (settle={}, poll={})",
            humantime::format_duration(self.settle),
            humantime::format_duration(self.poll)
        );
        loop {
            let pause = match self.render_if_changed() {
                Ok(true) => self.settle,
                Ok(false) => self.poll,
                Err(err) => {
                    warn!("redraw failed: {err}");
                    self.settle
                }
            };
            sleep(pause).await;
        }
    }
}
