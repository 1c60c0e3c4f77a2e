use std::time::Duration;

use log::{debug, info};
use tokio::time::sleep;

use crate::{config::ButtonConfig, state::SharedState};
#[cfg(target_os = "linux")]
use crate::{Error, Result};

/// Wait after a press before polling again; doubles as debounce.
pub const PRESSED_POLL: Duration = Duration::from_millis(100);
pub const IDLE_POLL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Prev,
    Next,
    ToggleAutoscroll,
    CyclePageSize,
}

impl Button {
    pub const ALL: [Button; 4] = [
        Button::Next,
        Button::Prev,
        Button::ToggleAutoscroll,
        Button::CyclePageSize,
    ];
}

/// Level-triggered button state: `true` while the button is held.
pub trait ButtonSource {
    fn is_pressed(&mut self, button: Button) -> bool;
}

/// Used when no pins are configured or GPIO is unavailable.
pub struct NoButtons;

impl ButtonSource for NoButtons {
    fn is_pressed(&mut self, _button: Button) -> bool {
        false
    }
}

/// Active-low pushbuttons on pulled-up GPIO inputs.
#[cfg(target_os = "linux")]
pub struct GpioButtons {
    pins: Vec<(Button, rppal::gpio::InputPin)>,
}

#[cfg(target_os = "linux")]
impl GpioButtons {
    pub fn new(config: &ButtonConfig) -> Result<Self> {
        let gpio = rppal::gpio::Gpio::new().map_err(|e| Error::Io(std::io::Error::other(e)))?;
        let wanted = [
            (Button::Prev, config.prev),
            (Button::Next, config.next),
            (Button::ToggleAutoscroll, config.autoscroll),
            (Button::CyclePageSize, config.page_size),
        ];
        let mut pins = Vec::new();
        for (button, pin) in wanted {
            let Some(pin) = pin else { continue };
            let input = gpio
                .get(pin)
                .map_err(|e| Error::Io(std::io::Error::other(e)))?
                .into_input_pullup();
            pins.push((button, input));
        }
        Ok(Self { pins })
    }
}

#[cfg(target_os = "linux")]
impl ButtonSource for GpioButtons {
    fn is_pressed(&mut self, button: Button) -> bool {
        self.pins.iter().any(|(b, pin)| *b == button && pin.is_low())
    }
}

/// Pick the hardware source when pins are configured and GPIO opens.
pub fn build_buttons(config: &ButtonConfig) -> Box<dyn ButtonSource> {
    if !config.any_configured() {
        return Box::new(NoButtons);
    }
    #[cfg(target_os = "linux")]
    {
        match GpioButtons::new(config) {
            Ok(buttons) => return Box::new(buttons),
            Err(err) => log::warn!("buttons disabled: {err}"),
        }
    }
    #[cfg(not(target_os = "linux"))]
    {
        log::warn!("buttons disabled: GPIO unsupported on this platform");
    }
    Box::new(NoButtons)
}

/// Apply one press to the view state in a single step.
pub fn apply_press(state: &SharedState, button: Button) {
    let view = state.update_view(|view| match button {
        Button::Prev => view.scroll_by(-1),
        Button::Next => view.scroll_by(1),
        Button::ToggleAutoscroll => view.toggle_autoscroll(),
        Button::CyclePageSize => view.cycle_page_size(),
    });
    debug!(
        "{button:?} pressed: position={} per_page={} autoscroll={}",
        view.scroll_position(),
        view.items_per_page(),
        view.autoscroll()
    );
}

/// Poll every button once and apply the presses. Returns whether any was pressed.
pub fn poll_buttons(state: &SharedState, source: &mut dyn ButtonSource) -> bool {
    let mut pressed = false;
    for button in Button::ALL {
        if source.is_pressed(button) {
            apply_press(state, button);
            pressed = true;
        }
    }
    pressed
}

pub async fn run_input_loop(state: SharedState, mut source: Box<dyn ButtonSource>) {
    info!("input handler started");
    loop {
        let pause = if poll_buttons(&state, source.as_mut()) {
            PRESSED_POLL
        } else {
            IDLE_POLL
        };
        sleep(pause).await;
    }
}
