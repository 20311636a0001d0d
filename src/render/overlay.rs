use anyhow::Result;
#[cfg(not(feature = "snapshot"))]
use anyhow::anyhow;
use std::path::PathBuf;

use super::{QuitSignal, Renderer};
use crate::config::RenderSettings;
use crate::detect::BoundingBox;
use crate::frame::Frame;

const BOX_COLOR: [u8; 3] = [0, 255, 0];
const BOX_THICKNESS: u32 = 2;

/// Headless renderer. Draws box outlines into the frame buffer, logs the
/// captions and, with the `snapshot` feature, periodically writes the
/// annotated frame to a JPEG file.
pub struct OverlayRenderer {
    quit: QuitSignal,
    captions: Vec<String>,
    #[cfg_attr(not(feature = "snapshot"), allow(dead_code))]
    snapshot_path: Option<PathBuf>,
    #[cfg_attr(not(feature = "snapshot"), allow(dead_code))]
    snapshot_every: u64,
    shown: u64,
    closed: bool,
}

impl OverlayRenderer {
    pub fn new(quit: QuitSignal) -> Self {
        Self {
            quit,
            captions: Vec::new(),
            snapshot_path: None,
            snapshot_every: 1,
            shown: 0,
            closed: false,
        }
    }

    pub fn from_settings(settings: &RenderSettings, quit: QuitSignal) -> Result<Self> {
        let renderer = Self::new(quit);
        match &settings.snapshot_path {
            Some(path) => renderer.with_snapshots(path.clone(), settings.snapshot_every),
            None => Ok(renderer),
        }
    }

    /// Write every `every`-th shown frame to `path`, overwriting the previous snapshot.
    #[cfg(feature = "snapshot")]
    pub fn with_snapshots(mut self, path: PathBuf, every: u64) -> Result<Self> {
        self.snapshot_path = Some(path);
        self.snapshot_every = every.max(1);
        Ok(self)
    }

    #[cfg(not(feature = "snapshot"))]
    pub fn with_snapshots(self, path: PathBuf, _every: u64) -> Result<Self> {
        Err(anyhow!(
            "snapshot {} requested but the snapshot feature is disabled",
            path.display()
        ))
    }

    pub fn frames_shown(&self) -> u64 {
        self.shown
    }

    #[cfg(feature = "snapshot")]
    fn write_snapshot(&self, frame: &Frame, path: &std::path::Path) -> Result<()> {
        use anyhow::{anyhow, Context};

        let image = image::RgbImage::from_raw(frame.width, frame.height, frame.pixels().to_vec())
            .ok_or_else(|| anyhow!("frame buffer does not match its dimensions"))?;
        image
            .save(path)
            .with_context(|| format!("failed to write snapshot {}", path.display()))
    }
}

impl Renderer for OverlayRenderer {
    fn draw_box(&mut self, frame: &mut Frame, bbox: &BoundingBox, text: &str) {
        draw_rectangle(frame, bbox, BOX_COLOR, BOX_THICKNESS);
        self.captions.push(text.to_string());
    }

    fn show(&mut self, frame: &Frame) -> Result<()> {
        self.shown += 1;
        if !self.captions.is_empty() {
            log::debug!(
                "OverlayRenderer: frame {} [{}]",
                frame.sequence,
                self.captions.join("; ")
            );
        }
        self.captions.clear();

        #[cfg(feature = "snapshot")]
        if let Some(path) = &self.snapshot_path {
            if self.shown % self.snapshot_every == 0 {
                self.write_snapshot(frame, path)?;
            }
        }
        Ok(())
    }

    fn poll_quit_signal(&mut self) -> bool {
        self.quit.is_raised()
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            log::info!("OverlayRenderer: closed after {} frames", self.shown);
        }
    }
}

/// Outline `bbox` with `thickness` pixels drawn inward from its edges.
pub(crate) fn draw_rectangle(frame: &mut Frame, bbox: &BoundingBox, color: [u8; 3], thickness: u32) {
    let max_x = frame.width.saturating_sub(1);
    let max_y = frame.height.saturating_sub(1);
    let to_px = |v: f32, max: u32| -> u32 { (v.max(0.0) as u32).min(max) };
    let (x1, y1) = (to_px(bbox.x1, max_x), to_px(bbox.y1, max_y));
    let (x2, y2) = (to_px(bbox.x2, max_x), to_px(bbox.y2, max_y));
    if x1 > x2 || y1 > y2 {
        return;
    }

    for t in 0..thickness {
        let (top, bottom) = (y1.saturating_add(t).min(y2), y2.saturating_sub(t).max(y1));
        for x in x1..=x2 {
            frame.set_pixel(x, top, color);
            frame.set_pixel(x, bottom, color);
        }
        let (left, right) = (x1.saturating_add(t).min(x2), x2.saturating_sub(t).max(x1));
        for y in y1..=y2 {
            frame.set_pixel(left, y, color);
            frame.set_pixel(right, y, color);
        }
    }
}
