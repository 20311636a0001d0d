//! Frame sources.
//!
//! - `stub://<name>`: synthetic scene, always available (tests, demos)
//! - V4L2 device nodes such as `/dev/video0` (feature: ingest-v4l2)
//!
//! Every source delivers packed RGB24 frames of a fixed, known size. Capture
//! blocks until a frame is ready; there is no timeout. A capture error is an
//! acquisition failure and ends the frame loop.

pub mod camera;
#[cfg_attr(not(feature = "ingest-v4l2"), allow(dead_code))]
mod normalize;
#[cfg(feature = "ingest-v4l2")]
mod v4l2;

pub use camera::{CameraConfig, CameraSource};

use anyhow::Result;

use crate::frame::Frame;

/// Statistics for a frame source.
#[derive(Clone, Debug)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub healthy: bool,
    pub location: String,
}

/// Producer of frames for the frame loop.
pub trait FrameSource {
    /// Open the device or stream. Called once before the first capture.
    fn start(&mut self) -> Result<()>;

    /// Block until the next frame is available.
    fn capture_frame(&mut self) -> Result<Frame>;

    /// Release the device. Must be safe to call more than once.
    fn stop(&mut self);

    fn stats(&self) -> SourceStats;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn start(&mut self) -> Result<()> {
        (**self).start()
    }

    fn capture_frame(&mut self) -> Result<Frame> {
        (**self).capture_frame()
    }

    fn stop(&mut self) {
        (**self).stop()
    }

    fn stats(&self) -> SourceStats {
        (**self).stats()
    }
}
