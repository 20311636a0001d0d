//! smart_vision - spoken spatial announcements from a camera feed
//!
//! This binary:
//! 1. Loads configuration (defaults, config file, environment, CLI flags)
//! 2. Opens the frame source and the detector backend
//! 3. Runs the frame loop until the user quits or the frame limit is reached
//! 4. Speaks a throttled summary of nearby objects as they come and go

use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use smart_vision::ui::{Ui, UiMode};
use smart_vision::{
    build_backend, build_engine, Aggregator, AnnouncementFilter, CameraConfig, CameraSource,
    FrameLoop, OverlayRenderer, QuitSignal, SmartVisionConfig, SpeechDispatcher,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON or TOML configuration file.
    #[arg(long, env = "SMART_VISION_CONFIG")]
    config: Option<PathBuf>,
    /// Frame source: `stub://<name>` or a V4L2 device path.
    #[arg(long)]
    source: Option<String>,
    /// Detector backend: `stub`, `tract` or `none`.
    #[arg(long)]
    backend: Option<String>,
    /// ONNX model path for the tract backend.
    #[arg(long)]
    model: Option<PathBuf>,
    /// Minimum seconds between announcements.
    #[arg(long)]
    interval: Option<f64>,
    /// Spoken language code passed to the synthesizer.
    #[arg(long)]
    lang: Option<String>,
    /// Speech engine: `command` or `log`.
    #[arg(long)]
    speech: Option<String>,
    /// Camera preview only: show frames, detect and announce nothing.
    #[arg(long, conflicts_with = "backend")]
    no_detect: bool,
    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<u64>,
    /// Treat `q` on stdin as a quit request.
    #[arg(long)]
    watch_stdin: bool,
    #[arg(long, value_enum, default_value_t = UiMode::Auto)]
    ui: UiMode,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let ui = Ui::for_stderr(args.ui);

    let cfg = {
        let _stage = ui.stage("load configuration");
        load_config(&args)?
    };

    let quit = QuitSignal::new();
    quit.install_ctrlc()?;
    if args.watch_stdin {
        quit.watch_stdin()?;
    }

    let source = {
        let _stage = ui.stage("open frame source");
        CameraSource::new(CameraConfig::from(&cfg.source))?
    };
    let (width, height) = source.frame_size();

    let detector = {
        let stage = ui.stage("load detector");
        match build_backend(&cfg.detector, width, height) {
            Ok(detector) => detector,
            Err(err) => {
                stage.fail();
                return Err(err);
            }
        }
    };

    let engine = build_engine(&cfg.speech)?;
    let speech = SpeechDispatcher::new(engine, cfg.announce.language.clone());
    let renderer = OverlayRenderer::from_settings(&cfg.render, quit)?;
    let aggregator = Aggregator::new(AnnouncementFilter::new(cfg.announce.labels.iter()));

    log::info!(
        "smart_vision: source={} backend={}",
        cfg.source.url,
        cfg.detector.backend
    );

    let mut frame_loop = FrameLoop::new(
        source,
        detector,
        renderer,
        aggregator,
        speech,
        cfg.announce.interval,
    )
    .with_max_frames(args.max_frames);

    let reason = frame_loop.run()?;
    ui.summary(reason, &frame_loop.stats());
    Ok(())
}

fn load_config(args: &Args) -> Result<SmartVisionConfig> {
    let mut cfg = match &args.config {
        Some(path) => SmartVisionConfig::load_from(path)?,
        None => SmartVisionConfig::load()?,
    };

    if let Some(source) = &args.source {
        cfg.source.url = source.clone();
    }
    if let Some(backend) = &args.backend {
        cfg.detector.backend = backend.clone();
    }
    if args.no_detect {
        cfg.detector.backend = "none".to_string();
    }
    if let Some(model) = &args.model {
        cfg.detector.model_path = model.clone();
    }
    if let Some(seconds) = args.interval {
        cfg.announce.interval = Duration::try_from_secs_f64(seconds)
            .map_err(|_| anyhow!("--interval must be a positive number of seconds"))?;
    }
    if let Some(lang) = &args.lang {
        cfg.announce.language = lang.clone();
    }
    if let Some(speech) = &args.speech {
        cfg.speech.engine = speech.clone();
    }

    cfg.validate()?;
    Ok(cfg)
}
