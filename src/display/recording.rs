use log::debug;

use super::{Display, Font};
use crate::Result;

/// Approximate advance per character at scale 1.
const BITMAP8_ADVANCE: f32 = 6.0;
const SANS_ADVANCE: f32 = 16.0;

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Clear(u8),
    Pen(u8),
    Rectangle { x: i32, y: i32, w: i32, h: i32 },
    Triangle([(i32, i32); 3]),
    Text {
        text: String,
        x: i32,
        y: i32,
        scale: f32,
        font: Font,
    },
}

/// In-memory panel: keeps the ops of the frame being drawn and of the last
/// committed frame. Used headless and in tests.
#[derive(Debug, Default)]
pub struct RecordingDisplay {
    pending: Vec<DrawOp>,
    committed: Vec<DrawOp>,
    commits: usize,
    led: u8,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commits(&self) -> usize {
        self.commits
    }

    pub fn led(&self) -> u8 {
        self.led
    }

    pub fn last_frame(&self) -> &[DrawOp] {
        &self.committed
    }

    /// Text strings of the last committed frame, in draw order.
    pub fn last_texts(&self) -> Vec<&str> {
        self.committed
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Display for RecordingDisplay {
    fn clear(&mut self, pen: u8) {
        self.pending.clear();
        self.pending.push(DrawOp::Clear(pen));
    }

    fn set_pen(&mut self, pen: u8) {
        self.pending.push(DrawOp::Pen(pen));
    }

    fn rectangle(&mut self, x: i32, y: i32, w: i32, h: i32) {
        self.pending.push(DrawOp::Rectangle { x, y, w, h });
    }

    fn triangle(&mut self, a: (i32, i32), b: (i32, i32), c: (i32, i32)) {
        self.pending.push(DrawOp::Triangle([a, b, c]));
    }

    fn text(&mut self, text: &str, x: i32, y: i32, scale: f32, font: Font) {
        self.pending.push(DrawOp::Text {
            text: text.to_string(),
            x,
            y,
            scale,
            font,
        });
    }

    fn measure_text(&self, text: &str, scale: f32, font: Font) -> i32 {
        let advance = match font {
            Font::Bitmap8 => BITMAP8_ADVANCE,
            Font::Sans => SANS_ADVANCE,
        };
        (text.chars().count() as f32 * advance * scale).round() as i32
    }

    fn update(&mut self) -> Result<()> {
        self.committed = std::mem::take(&mut self.pending);
        self.commits += 1;
        let mut texts = self.last_texts();
        texts.dedup();
        debug!("frame {} committed: {}", self.commits, texts.join(" | "));
        Ok(())
    }

    fn set_led(&mut self, brightness: u8) -> Result<()> {
        self.led = brightness;
        Ok(())
    }
}
