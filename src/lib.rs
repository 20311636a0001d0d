//! Smart Vision
//!
//! Assistive perception for visually-impaired users: watch a camera feed,
//! detect objects, and periodically speak a short sentence describing which
//! relevant objects are present, where they are (left, ahead, right) and
//! whether they are near or far.
//!
//! # Architecture
//!
//! A single-threaded frame loop drives everything:
//!
//! 1. **Capture**: a `FrameSource` delivers one RGB24 frame.
//! 2. **Detect**: a `DetectorBackend` returns labelled boxes.
//! 3. **Render**: every well-formed box is drawn; rendering never affects speech.
//! 4. **Announce**: allow-listed detections become deduplicated phrases; a
//!    throttle lets at most one sentence through per interval.
//! 5. **Speak**: the sentence is synthesized and played on a detached thread.
//!
//! # Module Structure
//!
//! - `frame`: RGB24 frame buffer
//! - `ingest`: frame sources (synthetic, V4L2)
//! - `detect`: detector backends, detection types, YOLO decoding
//! - `spatial`: direction and proximity classification
//! - `announce`: label filter, phrase aggregation, throttle
//! - `speech`: speech engines and fire-and-forget dispatch
//! - `render`: overlay drawing and quit signal
//! - `pipeline`: the frame loop
//! - `config`: file, environment and default configuration
//! - `ui`: operator-facing startup progress

pub mod announce;
pub mod config;
pub mod detect;
pub mod frame;
pub mod ingest;
pub mod pipeline;
pub mod render;
pub mod spatial;
pub mod speech;
pub mod ui;

pub use announce::{
    Aggregator, AnnouncementFilter, AnnouncementThrottle, Clock, ManualClock, PhraseSet,
    SystemClock,
};
pub use config::SmartVisionConfig;
pub use detect::{build_backend, BoundingBox, Detection, DetectorBackend, Vocabulary};
pub use frame::Frame;
pub use ingest::{CameraConfig, CameraSource, FrameSource};
pub use pipeline::{CycleReport, FrameLoop, LoopState, LoopStats, StopReason};
pub use render::{OverlayRenderer, QuitSignal, Renderer};
pub use spatial::{classify, Direction, Proximity, SpatialDescription};
pub use speech::{build_engine, SpeechDispatcher, SpeechEngine};
