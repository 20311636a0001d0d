//! Camera frame source.
//!
//! `CameraSource` picks its backend from the configured location: `stub://`
//! URLs get a synthetic scene, anything else is opened as a V4L2 device.

use anyhow::{anyhow, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};

#[cfg(feature = "ingest-v4l2")]
use super::v4l2::DeviceV4l2Source;
use super::{FrameSource, SourceStats};
use crate::config::SourceSettings;
use crate::frame::Frame;

/// Configuration for a camera source.
#[derive(Clone, Debug)]
pub struct CameraConfig {
    /// `stub://<name>` or a device path (e.g. "/dev/video0").
    pub location: String,
    /// Requested frame rate. Devices may ignore it; 0 leaves the synthetic
    /// scene unpaced.
    pub target_fps: u32,
    pub width: u32,
    pub height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            location: "/dev/video0".to_string(),
            target_fps: 10,
            width: 640,
            height: 480,
        }
    }
}

impl From<&SourceSettings> for CameraConfig {
    fn from(settings: &SourceSettings) -> Self {
        Self {
            location: settings.url.clone(),
            target_fps: settings.target_fps,
            width: settings.width,
            height: settings.height,
        }
    }
}

pub struct CameraSource {
    backend: CameraBackend,
}

enum CameraBackend {
    Synthetic(SyntheticCamera),
    #[cfg(feature = "ingest-v4l2")]
    Device(DeviceV4l2Source),
}

impl CameraSource {
    pub fn new(config: CameraConfig) -> Result<Self> {
        if config.width == 0 || config.height == 0 {
            return Err(anyhow!(
                "camera frame size must be non-zero (got {}x{})",
                config.width,
                config.height
            ));
        }
        if config.location.starts_with("stub://") {
            Ok(Self {
                backend: CameraBackend::Synthetic(SyntheticCamera::new(config)),
            })
        } else {
            #[cfg(feature = "ingest-v4l2")]
            {
                Ok(Self {
                    backend: CameraBackend::Device(DeviceV4l2Source::new(config)),
                })
            }
            #[cfg(not(feature = "ingest-v4l2"))]
            {
                Err(anyhow!(
                    "camera device {} requires the ingest-v4l2 feature",
                    config.location
                ))
            }
        }
    }

    /// Active frame size. Devices may settle on a different size than requested.
    pub fn frame_size(&self) -> (u32, u32) {
        match &self.backend {
            CameraBackend::Synthetic(source) => (source.config.width, source.config.height),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(source) => source.frame_size(),
        }
    }
}

impl FrameSource for CameraSource {
    fn start(&mut self) -> Result<()> {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.connect(),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(source) => source.connect(),
        }
    }

    fn capture_frame(&mut self) -> Result<Frame> {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.next_frame(),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(source) => source.next_frame(),
        }
    }

    fn stop(&mut self) {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.disconnect(),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(source) => source.disconnect(),
        }
    }

    fn stats(&self) -> SourceStats {
        match &self.backend {
            CameraBackend::Synthetic(source) => source.stats(),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(source) => source.stats(),
        }
    }
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://)
// ----------------------------------------------------------------------------

struct SyntheticCamera {
    config: CameraConfig,
    frame_count: u64,
    connected: bool,
    /// Shifts every 50 frames so consecutive scenes differ.
    scene_state: u8,
    rng: StdRng,
    /// `None` when `target_fps` is 0 (unpaced).
    frame_interval: Option<Duration>,
    last_frame_at: Option<Instant>,
}

impl SyntheticCamera {
    fn new(config: CameraConfig) -> Self {
        let frame_interval =
            (config.target_fps > 0).then(|| Duration::from_secs(1) / config.target_fps);
        Self {
            config,
            frame_count: 0,
            connected: false,
            scene_state: 0,
            rng: StdRng::seed_from_u64(0x5eed),
            frame_interval,
            last_frame_at: None,
        }
    }

    fn connect(&mut self) -> Result<()> {
        self.connected = true;
        log::info!(
            "CameraSource: connected to {} (synthetic {}x{})",
            self.config.location,
            self.config.width,
            self.config.height
        );
        Ok(())
    }

    fn disconnect(&mut self) {
        if self.connected {
            self.connected = false;
            log::info!("CameraSource: released {}", self.config.location);
        }
    }

    fn next_frame(&mut self) -> Result<Frame> {
        if !self.connected {
            return Err(anyhow!("camera {} not started", self.config.location));
        }
        self.wait_for_next_frame();
        self.frame_count += 1;
        let pixels = self.generate_pixels();
        Frame::new(pixels, self.config.width, self.config.height, self.frame_count)
    }

    /// Sleep until one frame interval has passed since the previous frame,
    /// the way a device's blocking dequeue would.
    fn wait_for_next_frame(&mut self) {
        if let (Some(interval), Some(last)) = (self.frame_interval, self.last_frame_at) {
            let due = last + interval;
            let now = Instant::now();
            if due > now {
                std::thread::sleep(due - now);
            }
        }
        self.last_frame_at = Some(Instant::now());
    }

    /// Horizontal gradient with a little sensor-like noise.
    fn generate_pixels(&mut self) -> Vec<u8> {
        let (w, h) = (self.config.width as usize, self.config.height as usize);
        if self.frame_count % 50 == 0 {
            self.scene_state = self.scene_state.wrapping_add(1);
        }
        let mut pixels = Vec::with_capacity(w * h * 3);
        for _y in 0..h {
            for x in 0..w {
                let base = ((x * 255) / w.max(1)) as u8;
                let noise: u8 = self.rng.gen_range(0..8);
                let value = base.wrapping_add(self.scene_state).saturating_add(noise);
                pixels.extend_from_slice(&[value, value / 2, 255 - value]);
            }
        }
        pixels
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            healthy: self.connected,
            location: self.config.location.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub_config() -> CameraConfig {
        CameraConfig {
            location: "stub://test".to_string(),
            target_fps: 10,
            width: 64,
            height: 48,
        }
    }

    #[test]
    fn synthetic_source_produces_frames() -> Result<()> {
        let mut source = CameraSource::new(stub_config())?;
        source.start()?;

        let frame = source.capture_frame()?;
        assert_eq!((frame.width, frame.height), (64, 48));
        assert_eq!(frame.sequence, 1);
        assert_eq!(source.capture_frame()?.sequence, 2);
        assert_eq!(source.stats().frames_captured, 2);
        Ok(())
    }

    #[test]
    fn synthetic_source_paces_to_target_fps() -> Result<()> {
        let mut source = CameraSource::new(CameraConfig {
            target_fps: 50,
            ..stub_config()
        })?;
        source.start()?;

        let started = Instant::now();
        for _ in 0..6 {
            source.capture_frame()?;
        }
        // First frame is immediate, the other five wait 20 ms each.
        assert!(started.elapsed() >= Duration::from_millis(100));
        Ok(())
    }

    #[test]
    fn zero_fps_is_unpaced() -> Result<()> {
        let mut source = CameraSource::new(CameraConfig {
            target_fps: 0,
            ..stub_config()
        })?;
        source.start()?;

        let started = Instant::now();
        for _ in 0..20 {
            source.capture_frame()?;
        }
        assert!(started.elapsed() < Duration::from_secs(1));
        Ok(())
    }

    #[test]
    fn capture_before_start_fails() -> Result<()> {
        let mut source = CameraSource::new(stub_config())?;
        assert!(source.capture_frame().is_err());
        Ok(())
    }

    #[test]
    fn stop_is_idempotent_and_ends_capture() -> Result<()> {
        let mut source = CameraSource::new(stub_config())?;
        source.start()?;
        source.stop();
        source.stop();
        assert!(!source.stats().healthy);
        assert!(source.capture_frame().is_err());
        Ok(())
    }

    #[test]
    fn rejects_zero_size() {
        let config = CameraConfig {
            width: 0,
            ..stub_config()
        };
        assert!(CameraSource::new(config).is_err());
    }

    #[cfg(not(feature = "ingest-v4l2"))]
    #[test]
    fn device_paths_need_the_v4l2_feature() {
        let config = CameraConfig {
            location: "/dev/video0".to_string(),
            ..stub_config()
        };
        assert!(CameraSource::new(config).is_err());
    }
}
