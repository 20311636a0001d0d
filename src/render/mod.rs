//! Visualization side channel.
//!
//! Rendering never influences what is announced. Every well-formed
//! detection is drawn, announceable or not.

mod overlay;
mod signal;

pub use overlay::OverlayRenderer;
pub use signal::QuitSignal;

use anyhow::Result;

use crate::detect::BoundingBox;
use crate::frame::Frame;

pub trait Renderer {
    /// Draw one labelled box into the frame.
    fn draw_box(&mut self, frame: &mut Frame, bbox: &BoundingBox, text: &str);

    /// Present the annotated frame.
    fn show(&mut self, frame: &Frame) -> Result<()>;

    /// True once the user asked to quit.
    fn poll_quit_signal(&mut self) -> bool;

    /// Release display resources. Must be safe to call more than once.
    fn close(&mut self) {}
}
