//! Frame loop orchestrator.
//!
//! One cycle: capture → detect → drop malformed boxes → draw → filter and
//! aggregate → throttle → speak → show → poll quit. Cycles run strictly one
//! after another on the calling thread; only speech runs elsewhere.
//!
//! Capture and detection errors end the loop. Source and renderer are
//! released on every exit path, including errors and drops.

use anyhow::{Context, Result};
use std::time::{Duration, Instant};

use crate::announce::{Aggregator, AnnouncementThrottle, Clock, PhraseSet, SystemClock};
use crate::detect::{Detection, DetectorBackend};
use crate::ingest::FrameSource;
use crate::render::Renderer;
use crate::speech::SpeechDispatcher;

const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The user asked to quit.
    QuitSignal,
    /// The configured frame limit was reached.
    FrameLimit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Terminated(StopReason),
}

/// What happened in a single cycle.
#[derive(Clone, Debug, Default)]
pub struct CycleReport {
    pub frame_sequence: u64,
    /// Well-formed detections, all of which were drawn.
    pub detections: Vec<Detection>,
    /// Degenerate or out-of-frame boxes dropped before classification.
    pub discarded: usize,
    pub phrases: PhraseSet,
    /// Sentence handed to speech dispatch, if the throttle allowed one.
    pub announcement: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub frames: u64,
    pub detections: u64,
    pub discarded: u64,
    pub announcements: u64,
}

pub struct FrameLoop<S, D, R>
where
    S: FrameSource,
    D: DetectorBackend,
    R: Renderer,
{
    source: S,
    detector: D,
    renderer: R,
    aggregator: Aggregator,
    throttle: AnnouncementThrottle,
    speech: SpeechDispatcher,
    clock: Box<dyn Clock>,
    state: LoopState,
    stats: LoopStats,
    max_frames: Option<u64>,
    last_health_log: Instant,
    released: bool,
}

impl<S, D, R> FrameLoop<S, D, R>
where
    S: FrameSource,
    D: DetectorBackend,
    R: Renderer,
{
    pub fn new(
        source: S,
        detector: D,
        renderer: R,
        aggregator: Aggregator,
        speech: SpeechDispatcher,
        interval: Duration,
    ) -> Self {
        let clock: Box<dyn Clock> = Box::new(SystemClock);
        let now = clock.now();
        Self {
            source,
            detector,
            renderer,
            aggregator,
            throttle: AnnouncementThrottle::new(interval, now),
            speech,
            clock,
            state: LoopState::Idle,
            stats: LoopStats::default(),
            max_frames: None,
            last_health_log: now,
            released: false,
        }
    }

    /// Replace the time source (tests drive the throttle with a manual clock).
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        let now = self.clock.now();
        self.throttle = AnnouncementThrottle::new(self.throttle.interval(), now);
        self.last_health_log = now;
        self
    }

    /// Stop on its own after `frames` cycles.
    pub fn with_max_frames(mut self, frames: Option<u64>) -> Self {
        self.max_frames = frames;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn throttle(&self) -> &AnnouncementThrottle {
        &self.throttle
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Open the source and warm up the detector. The throttle's cooldown
    /// starts here.
    pub fn start(&mut self) -> Result<()> {
        self.source.start().context("failed to start frame source")?;
        self.released = false;
        self.detector
            .warm_up()
            .with_context(|| format!("failed to warm up {} detector", self.detector.name()))?;

        let filter = self.aggregator.filter();
        log::info!(
            "FrameLoop: announcing labels [{}]",
            filter.labels().collect::<Vec<_>>().join(", ")
        );
        for label in filter.unknown_labels(self.detector.vocabulary()) {
            log::warn!(
                "FrameLoop: announce label '{}' is not in the {} detector's vocabulary",
                label,
                self.detector.name()
            );
        }

        let now = self.clock.now();
        self.throttle = AnnouncementThrottle::new(self.throttle.interval(), now);
        self.last_health_log = now;
        self.state = LoopState::Running;
        log::info!(
            "FrameLoop: running with {} detector, {} speech ({}), interval {:.1}s",
            self.detector.name(),
            self.speech.engine_name(),
            self.speech.language(),
            self.throttle.interval().as_secs_f64()
        );
        Ok(())
    }

    /// Start, cycle until terminated, then release resources.
    pub fn run(&mut self) -> Result<StopReason> {
        let result = self.start().and_then(|()| self.run_cycles());
        self.release();
        result
    }

    fn run_cycles(&mut self) -> Result<StopReason> {
        loop {
            self.step()?;

            if let LoopState::Terminated(reason) = self.state {
                return Ok(reason);
            }
            if self.max_frames.is_some_and(|max| self.stats.frames >= max) {
                self.state = LoopState::Terminated(StopReason::FrameLimit);
                return Ok(StopReason::FrameLimit);
            }
            self.maybe_log_health();
        }
    }

    /// Run one cycle.
    pub fn step(&mut self) -> Result<CycleReport> {
        let mut frame = self
            .source
            .capture_frame()
            .context("frame capture failed")?;
        let (width, height) = (frame.width, frame.height);

        let raw = self
            .detector
            .detect(&frame)
            .with_context(|| format!("{} detection failed", self.detector.name()))?;
        let raw_count = raw.len();
        log::debug!(
            "FrameLoop: frame {} yielded {} detections {} ms after capture",
            frame.sequence,
            raw_count,
            frame.age_ms()
        );
        let detections: Vec<Detection> = raw
            .into_iter()
            .filter(|det| det.bbox.is_well_formed(width, height))
            .collect();
        let discarded = raw_count - detections.len();
        if discarded > 0 {
            log::debug!(
                "FrameLoop: frame {} dropped {} malformed detections",
                frame.sequence,
                discarded
            );
        }

        for det in &detections {
            self.renderer.draw_box(&mut frame, &det.bbox, &det.caption());
        }

        let phrases = self.aggregator.aggregate(&detections, width, height);
        let announcement = self.throttle.evaluate(&phrases, self.clock.now());
        if let Some(text) = &announcement {
            log::info!("FrameLoop: announcing: {}", text);
            self.speech.speak(text);
            self.stats.announcements += 1;
        }

        if let Err(err) = self.renderer.show(&frame) {
            log::warn!("FrameLoop: failed to show frame {}: {:#}", frame.sequence, err);
        }

        self.stats.frames += 1;
        self.stats.detections += detections.len() as u64;
        self.stats.discarded += discarded as u64;

        if self.renderer.poll_quit_signal() {
            log::info!("FrameLoop: quit requested");
            self.state = LoopState::Terminated(StopReason::QuitSignal);
        }

        Ok(CycleReport {
            frame_sequence: frame.sequence,
            detections,
            discarded,
            phrases,
            announcement,
        })
    }

    /// Stop the source and close the renderer. Idempotent.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.source.stop();
        self.renderer.close();
        log::info!(
            "FrameLoop: stopped after {} frames, {} announcements, {} malformed detections dropped",
            self.stats.frames,
            self.stats.announcements,
            self.stats.discarded
        );
    }

    fn maybe_log_health(&mut self) {
        let now = self.clock.now();
        if now.saturating_duration_since(self.last_health_log) < HEALTH_LOG_INTERVAL {
            return;
        }
        let source = self.source.stats();
        log::info!(
            "FrameLoop: source={} healthy={} captured={} frames={} announcements={}",
            source.location,
            source.healthy,
            source.frames_captured,
            self.stats.frames,
            self.stats.announcements
        );
        self.last_health_log = now;
    }
}

impl<S, D, R> Drop for FrameLoop<S, D, R>
where
    S: FrameSource,
    D: DetectorBackend,
    R: Renderer,
{
    fn drop(&mut self) {
        self.release();
    }
}
