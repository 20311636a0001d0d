use anyhow::Result;

use crate::detect::result::Detection;
use crate::detect::vocabulary::Vocabulary;
use crate::frame::Frame;

/// Detector backend trait.
///
/// A backend turns one frame into a list of labelled, scored boxes in the
/// frame's pixel coordinates. Accuracy is the backend's concern; the
/// announcement pipeline treats it as a black box.
///
/// Errors returned from `detect` are treated as acquisition failures and stop
/// the frame loop. Backends must not retry internally on behalf of the loop.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Labels this backend can emit, fixed at initialization.
    fn vocabulary(&self) -> &Vocabulary;

    /// Run detection on a frame. Blocking.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>>;

    /// Optional warm-up hook, run once before the loop starts.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<B: DetectorBackend + ?Sized> DetectorBackend for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn vocabulary(&self) -> &Vocabulary {
        (**self).vocabulary()
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        (**self).detect(frame)
    }

    fn warm_up(&mut self) -> Result<()> {
        (**self).warm_up()
    }
}
