//! Drawing collaborator for the badge panel and the page layout built on it.

use std::{cell::RefCell, rc::Rc};

use crate::Result;

pub mod layout;
pub mod recording;

pub use recording::{DrawOp, RecordingDisplay};

pub const WIDTH: i32 = 296;
pub const HEIGHT: i32 = 128;

/// Pen values on the 16-level e-ink palette.
pub const BLACK: u8 = 0;
pub const WHITE: u8 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    /// Fixed-width pixel font used for titles and indicators.
    Bitmap8,
    /// Scalable vector font used for values.
    Sans,
}

/// Panel primitives. Calls are synchronous and never yield to other tasks,
/// so a full redraw happens as one step.
pub trait Display {
    fn clear(&mut self, pen: u8);
    fn set_pen(&mut self, pen: u8);
    fn rectangle(&mut self, x: i32, y: i32, w: i32, h: i32);
    fn triangle(&mut self, a: (i32, i32), b: (i32, i32), c: (i32, i32));
    fn text(&mut self, text: &str, x: i32, y: i32, scale: f32, font: Font);
    fn measure_text(&self, text: &str, scale: f32, font: Font) -> i32;
    /// Push the drawn frame to the panel.
    fn update(&mut self) -> Result<()>;
    fn set_led(&mut self, brightness: u8) -> Result<()>;
}

pub type SharedDisplay = Rc<RefCell<dyn Display>>;
