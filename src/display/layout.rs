use super::{Display, Font, BLACK, HEIGHT, WHITE, WIDTH};
use crate::{state::ViewState, Result};

/// Left edge of the position indicator column; sensor content uses the width before it.
const INDICATOR_X: i32 = WIDTH - 12;
const CONTENT_WIDTH: i32 = INDICATOR_X;
const MAX_INDICATOR_HEIGHT: i32 = 16;

const SINGLE_VALUE_MAX_WIDTH: i32 = 274;
const SINGLE_VALUE_START_SCALE: f32 = 3.5;
const SINGLE_VALUE_Y: i32 = 75;
const COLUMN_VALUE_START_SCALE: f32 = 2.0;
const COLUMN_VALUE_MARGIN: i32 = 10;
const COLUMN_VALUE_Y: i32 = 85;
const TITLE_LINE_HEIGHT: i32 = 18;

pub const SCALE_STEP: f32 = 0.1;
pub const MIN_SCALE: f32 = 0.5;

/// One sensor slot on the current page.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibleSensor<'a> {
    pub title: &'a str,
    pub value: String,
}

/// Largest scale, stepping down from `start`, at which `text` fits in `max_width`.
/// Stops at [`MIN_SCALE`] even if the text still overflows.
pub fn fit_scale(display: &dyn Display, text: &str, start: f32, max_width: i32) -> (f32, i32) {
    let mut scale = start;
    loop {
        let width = display.measure_text(text, scale, Font::Sans);
        if width <= max_width || scale <= MIN_SCALE {
            return (scale, width);
        }
        scale = (scale - SCALE_STEP).max(MIN_SCALE);
    }
}

/// Clear the panel and draw a complete page, then commit it.
pub fn draw_page(
    display: &mut dyn Display,
    view: &ViewState,
    visible: &[VisibleSensor],
) -> Result<()> {
    display.set_pen(WHITE);
    display.clear(WHITE);
    draw_mode_indicator(display, view.autoscroll());

    display.set_pen(BLACK);
    display.text(
        &format!("{}/PAGE", view.items_per_page()),
        130,
        120,
        1.0,
        Font::Bitmap8,
    );

    draw_position_indicators(display, view);

    if let [single] = visible {
        draw_single(display, single);
    } else {
        draw_columns(display, visible);
    }

    display.update()
}

/// Play/pause glyphs; the active mode is drawn filled.
fn draw_mode_indicator(display: &mut dyn Display, autoscroll: bool) {
    let (play_pen, pause_pen) = if autoscroll {
        (WHITE, BLACK)
    } else {
        (BLACK, WHITE)
    };
    display.set_pen(play_pen);
    display.rectangle(28, 116, 12, 12);
    display.set_pen(pause_pen);
    display.triangle((30, 118), (30, 126), (38, 122));
    display.rectangle(40, 116, 12, 12);
    display.set_pen(play_pen);
    display.rectangle(42, 118, 3, 8);
    display.rectangle(47, 118, 3, 8);
}

/// One box per sensor down the right edge; boxes for sensors on screen stay filled.
fn draw_position_indicators(display: &mut dyn Display, view: &ViewState) {
    let count = view.sensor_count() as i32;
    let visible = view.visible_indices();
    let rect_height = MAX_INDICATOR_HEIGHT.min(HEIGHT / count.max(1));
    let y_offset = (HEIGHT - rect_height * count) / 2;
    for i in 0..count {
        let top = y_offset + i * rect_height;
        display.set_pen(BLACK);
        display.rectangle(INDICATOR_X, top + 1, 12, rect_height - 2);
        if !visible.contains(&(i as usize)) {
            display.set_pen(WHITE);
            display.rectangle(INDICATOR_X + 1, top + 2, 10, rect_height - 4);
        }
    }
}

fn draw_single(display: &mut dyn Display, sensor: &VisibleSensor) {
    display.set_pen(BLACK);
    display.text(&sensor.title.replace('\n', " "), 0, 0, 3.0, Font::Bitmap8);

    let (scale, width) = fit_scale(
        display,
        &sensor.value,
        SINGLE_VALUE_START_SCALE,
        SINGLE_VALUE_MAX_WIDTH,
    );
    let x = (CONTENT_WIDTH - width) / 2;
    draw_bold(display, &sensor.value, x, SINGLE_VALUE_Y, scale, (1, 0));
}

fn draw_columns(display: &mut dyn Display, visible: &[VisibleSensor]) {
    let column_width = CONTENT_WIDTH / visible.len().max(1) as i32;
    for (position, sensor) in visible.iter().enumerate() {
        let left = column_width * position as i32;
        display.set_pen(BLACK);
        for (line_no, line) in sensor.title.split('\n').enumerate() {
            let w = display.measure_text(line, 2.0, Font::Bitmap8);
            let x = left + (column_width - w) / 2;
            display.text(line, x, TITLE_LINE_HEIGHT * line_no as i32, 2.0, Font::Bitmap8);
        }

        let (scale, width) = fit_scale(
            display,
            &sensor.value,
            COLUMN_VALUE_START_SCALE,
            column_width - COLUMN_VALUE_MARGIN,
        );
        let x = left + (column_width - width) / 2;
        draw_bold(display, &sensor.value, x, COLUMN_VALUE_Y, scale, (-1, 0));
    }
}

/// Faux bold: the value drawn three times, offset horizontally and one pixel down.
fn draw_bold(
    display: &mut dyn Display,
    text: &str,
    x: i32,
    y: i32,
    scale: f32,
    shift: (i32, i32),
) {
    display.text(text, x, y, scale, Font::Sans);
    display.text(text, x + shift.0, y + shift.1, scale, Font::Sans);
    display.text(text, x, y + 1, scale, Font::Sans);
}

pub fn draw_boot_splash(display: &mut dyn Display) -> Result<()> {
    display.set_pen(BLACK);
    display.clear(BLACK);
    display.set_pen(WHITE);
    for (i, line) in ["Loading", "Sensor", "Data..."].iter().enumerate() {
        display.text(line, 20, 20 + 30 * i as i32, 4.0, Font::Bitmap8);
    }
    display.update()
}

pub fn draw_offline(display: &mut dyn Display) -> Result<()> {
    display.set_pen(WHITE);
    display.clear(WHITE);
    display.set_pen(BLACK);
    display.text("offline", 20, 50, 4.0, Font::Bitmap8);
    display.update()
}
