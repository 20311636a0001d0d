use anyhow::{anyhow, Result};
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_SOURCE_URL: &str = "stub://front_camera";
const DEFAULT_SOURCE_FPS: u32 = 10;
const DEFAULT_FRAME_WIDTH: u32 = 640;
const DEFAULT_FRAME_HEIGHT: u32 = 480;
const DEFAULT_BACKEND: &str = "stub";
const DEFAULT_MODEL_PATH: &str = "Models/yolov8n.onnx";
const DEFAULT_INPUT_SIZE: u32 = 640;
const DEFAULT_CONFIDENCE: f32 = 0.25;
const DEFAULT_IOU: f32 = 0.7;
const DEFAULT_INTERVAL_SECS: f64 = 8.0;
const DEFAULT_LANGUAGE: &str = "en";
const DEFAULT_SPEECH_ENGINE: &str = "command";
const DEFAULT_AUDIO_PATH: &str = "output.wav";
const DEFAULT_SNAPSHOT_EVERY: u64 = 30;

/// Labels announced when no allow-list is configured.
pub const DEFAULT_ANNOUNCE_LABELS: [&str; 4] = ["person", "cell phone", "bottle", "book"];

/// Synthesizer invocation. `{lang}`, `{audio}` and `{text}` are substituted per utterance.
pub const DEFAULT_SYNTH_COMMAND: [&str; 6] = ["espeak-ng", "-v", "{lang}", "-w", "{audio}", "{text}"];
/// Player invocation. `{audio}` is substituted.
pub const DEFAULT_PLAYER_COMMAND: [&str; 3] = ["aplay", "-q", "{audio}"];

#[derive(Debug, Deserialize, Default)]
struct SmartVisionConfigFile {
    source: Option<SourceConfigFile>,
    detector: Option<DetectorConfigFile>,
    announce: Option<AnnounceConfigFile>,
    speech: Option<SpeechConfigFile>,
    render: Option<RenderConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct SourceConfigFile {
    url: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<String>,
    model_path: Option<PathBuf>,
    labels_path: Option<PathBuf>,
    script_path: Option<PathBuf>,
    input_size: Option<u32>,
    confidence_threshold: Option<f32>,
    iou_threshold: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct AnnounceConfigFile {
    labels: Option<Vec<String>>,
    interval_secs: Option<f64>,
    language: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct SpeechConfigFile {
    engine: Option<String>,
    synth_command: Option<Vec<String>>,
    player_command: Option<Vec<String>>,
    audio_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct RenderConfigFile {
    snapshot_path: Option<PathBuf>,
    snapshot_every: Option<u64>,
}

/// Process-wide configuration, set once at startup and read-only afterwards.
#[derive(Debug, Clone)]
pub struct SmartVisionConfig {
    pub source: SourceSettings,
    pub detector: DetectorSettings,
    pub announce: AnnounceSettings,
    pub speech: SpeechSettings,
    pub render: RenderSettings,
}

#[derive(Debug, Clone)]
pub struct SourceSettings {
    /// `stub://<name>` for the synthetic scene, otherwise a V4L2 device path.
    pub url: String,
    pub target_fps: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    /// `stub` (scripted), `tract` (ONNX) or `none` (camera preview).
    pub backend: String,
    pub model_path: PathBuf,
    pub labels_path: Option<PathBuf>,
    pub script_path: Option<PathBuf>,
    pub input_size: u32,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
}

#[derive(Debug, Clone)]
pub struct AnnounceSettings {
    pub labels: Vec<String>,
    pub interval: Duration,
    pub language: String,
}

#[derive(Debug, Clone)]
pub struct SpeechSettings {
    /// `command` (external synthesizer + player) or `log`.
    pub engine: String,
    pub synth_command: Vec<String>,
    pub player_command: Vec<String>,
    pub audio_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub snapshot_path: Option<PathBuf>,
    pub snapshot_every: u64,
}

impl Default for SmartVisionConfig {
    fn default() -> Self {
        Self::from_file(SmartVisionConfigFile::default())
    }
}

impl SmartVisionConfig {
    /// Defaults, then the file named by `SMART_VISION_CONFIG`, then environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("SMART_VISION_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from an explicit file path, still honouring environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut cfg = Self::from_file(read_config_file(path)?);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: SmartVisionConfigFile) -> Self {
        let source_file = file.source.unwrap_or_default();
        let source = SourceSettings {
            url: source_file
                .url
                .unwrap_or_else(|| DEFAULT_SOURCE_URL.to_string()),
            target_fps: source_file.target_fps.unwrap_or(DEFAULT_SOURCE_FPS),
            width: source_file.width.unwrap_or(DEFAULT_FRAME_WIDTH),
            height: source_file.height.unwrap_or(DEFAULT_FRAME_HEIGHT),
        };

        let detector_file = file.detector.unwrap_or_default();
        let detector = DetectorSettings {
            backend: detector_file
                .backend
                .unwrap_or_else(|| DEFAULT_BACKEND.to_string()),
            model_path: detector_file
                .model_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
            labels_path: detector_file.labels_path,
            script_path: detector_file.script_path,
            input_size: detector_file.input_size.unwrap_or(DEFAULT_INPUT_SIZE),
            confidence_threshold: detector_file
                .confidence_threshold
                .unwrap_or(DEFAULT_CONFIDENCE),
            iou_threshold: detector_file.iou_threshold.unwrap_or(DEFAULT_IOU),
        };

        let announce_file = file.announce.unwrap_or_default();
        let interval_secs = announce_file
            .interval_secs
            .unwrap_or(DEFAULT_INTERVAL_SECS);
        let announce = AnnounceSettings {
            labels: announce_file.labels.unwrap_or_else(|| {
                DEFAULT_ANNOUNCE_LABELS
                    .iter()
                    .map(|l| l.to_string())
                    .collect()
            }),
            // Negative or non-finite values are caught in validate().
            interval: Duration::try_from_secs_f64(interval_secs).unwrap_or(Duration::ZERO),
            language: announce_file
                .language
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
        };

        let speech_file = file.speech.unwrap_or_default();
        let speech = SpeechSettings {
            engine: speech_file
                .engine
                .unwrap_or_else(|| DEFAULT_SPEECH_ENGINE.to_string()),
            synth_command: speech_file
                .synth_command
                .unwrap_or_else(|| to_strings(&DEFAULT_SYNTH_COMMAND)),
            player_command: speech_file
                .player_command
                .unwrap_or_else(|| to_strings(&DEFAULT_PLAYER_COMMAND)),
            audio_path: speech_file
                .audio_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_AUDIO_PATH)),
        };

        let render_file = file.render.unwrap_or_default();
        let render = RenderSettings {
            snapshot_path: render_file.snapshot_path,
            snapshot_every: render_file.snapshot_every.unwrap_or(DEFAULT_SNAPSHOT_EVERY),
        };

        Self {
            source,
            detector,
            announce,
            speech,
            render,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(url) = non_empty_env("SMART_VISION_SOURCE") {
            self.source.url = url;
        }
        if let Some(backend) = non_empty_env("SMART_VISION_BACKEND") {
            self.detector.backend = backend;
        }
        if let Some(path) = non_empty_env("SMART_VISION_MODEL_PATH") {
            self.detector.model_path = PathBuf::from(path);
        }
        if let Some(labels) = non_empty_env("SMART_VISION_LABELS") {
            let parsed = split_csv(&labels);
            if !parsed.is_empty() {
                self.announce.labels = parsed;
            }
        }
        if let Some(interval) = non_empty_env("SMART_VISION_INTERVAL_SECS") {
            let seconds: f64 = interval.trim().parse().map_err(|_| {
                anyhow!("SMART_VISION_INTERVAL_SECS must be a number of seconds")
            })?;
            self.announce.interval = Duration::try_from_secs_f64(seconds)
                .map_err(|_| anyhow!("SMART_VISION_INTERVAL_SECS must be a positive number"))?;
        }
        if let Some(language) = non_empty_env("SMART_VISION_LANGUAGE") {
            self.announce.language = language;
        }
        if let Some(engine) = non_empty_env("SMART_VISION_SPEECH_ENGINE") {
            self.speech.engine = engine;
        }
        if let Some(path) = non_empty_env("SMART_VISION_SNAPSHOT_PATH") {
            self.render.snapshot_path = Some(PathBuf::from(path));
        }
        Ok(())
    }

    /// Check invariants. Also normalizes the allow-list (trimmed, deduplicated).
    pub fn validate(&mut self) -> Result<()> {
        if self.source.width == 0 || self.source.height == 0 {
            return Err(anyhow!(
                "frame size must be non-zero (got {}x{})",
                self.source.width,
                self.source.height
            ));
        }
        if self.announce.interval.is_zero() {
            return Err(anyhow!("announcement interval must be greater than zero"));
        }

        let mut labels: Vec<String> = Vec::with_capacity(self.announce.labels.len());
        for label in &self.announce.labels {
            let label = label.trim();
            if !label.is_empty() && !labels.iter().any(|l| l == label) {
                labels.push(label.to_string());
            }
        }
        if labels.is_empty() {
            return Err(anyhow!("announce label allow-list must not be empty"));
        }
        self.announce.labels = labels;

        validate_language(&self.announce.language)?;

        for (name, value) in [
            ("confidence_threshold", self.detector.confidence_threshold),
            ("iou_threshold", self.detector.iou_threshold),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(anyhow!("{} must be within (0, 1], got {}", name, value));
            }
        }
        if self.detector.input_size == 0 {
            return Err(anyhow!("detector input_size must be greater than zero"));
        }
        if self.speech.engine == "command" && self.speech.synth_command.is_empty() {
            return Err(anyhow!("speech synth_command must not be empty"));
        }
        if self.render.snapshot_every == 0 {
            return Err(anyhow!("render snapshot_every must be greater than zero"));
        }
        Ok(())
    }
}

/// Accepts ISO 639 codes with an optional region, e.g. `en`, `pt-BR`.
pub fn validate_language(code: &str) -> Result<()> {
    let pattern = Regex::new(r"^[a-z]{2,3}(-[a-zA-Z]{2,4})?$")
        .map_err(|e| anyhow!("language pattern: {}", e))?;
    if !pattern.is_match(code) {
        return Err(anyhow!("invalid spoken-language code '{}'", code));
    }
    Ok(())
}

fn read_config_file(path: &Path) -> Result<SmartVisionConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.to_string())
        .collect()
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = SmartVisionConfig::default();
        assert_eq!(cfg.announce.interval, Duration::from_secs(8));
        assert_eq!(cfg.announce.language, "en");
        assert_eq!(cfg.announce.labels, DEFAULT_ANNOUNCE_LABELS);
        assert_eq!((cfg.source.width, cfg.source.height), (640, 480));
        assert_eq!(cfg.detector.backend, "stub");
    }

    #[test]
    fn validate_normalizes_labels() -> Result<()> {
        let mut cfg = SmartVisionConfig::default();
        cfg.announce.labels = vec![" person".into(), "person".into(), "".into(), "book".into()];
        cfg.validate()?;
        assert_eq!(cfg.announce.labels, vec!["person", "book"]);
        Ok(())
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut cfg = SmartVisionConfig::default();
        cfg.announce.interval = Duration::ZERO;
        assert!(cfg.validate().is_err());

        let mut cfg = SmartVisionConfig::default();
        cfg.announce.labels = vec![" ".into()];
        assert!(cfg.validate().is_err());

        let mut cfg = SmartVisionConfig::default();
        cfg.detector.confidence_threshold = 1.5;
        assert!(cfg.validate().is_err());

        let mut cfg = SmartVisionConfig::default();
        cfg.source.height = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn language_codes() {
        assert!(validate_language("en").is_ok());
        assert!(validate_language("pt-BR").is_ok());
        assert!(validate_language("EN").is_err());
        assert!(validate_language("en; rm -rf").is_err());
    }

    #[test]
    fn negative_interval_in_file_fails_validation() {
        let mut cfg = SmartVisionConfig::from_file(SmartVisionConfigFile {
            announce: Some(AnnounceConfigFile {
                interval_secs: Some(-3.0),
                ..AnnounceConfigFile::default()
            }),
            ..SmartVisionConfigFile::default()
        });
        assert!(cfg.validate().is_err());
    }
}
