use std::sync::Mutex;
use std::time::Duration;

use tempfile::NamedTempFile;

use smart_vision::config::SmartVisionConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "SMART_VISION_CONFIG",
        "SMART_VISION_SOURCE",
        "SMART_VISION_BACKEND",
        "SMART_VISION_MODEL_PATH",
        "SMART_VISION_LABELS",
        "SMART_VISION_INTERVAL_SECS",
        "SMART_VISION_LANGUAGE",
        "SMART_VISION_SPEECH_ENGINE",
        "SMART_VISION_SNAPSHOT_PATH",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "source": {
            "url": "/dev/video2",
            "target_fps": 15,
            "width": 800,
            "height": 600
        },
        "detector": {
            "backend": "tract",
            "model_path": "models/custom.onnx",
            "confidence_threshold": 0.4
        },
        "announce": {
            "labels": ["person", "chair", "person"],
            "interval_secs": 5.5,
            "language": "fr"
        },
        "speech": {
            "engine": "log"
        }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("SMART_VISION_CONFIG", file.path());
    std::env::set_var("SMART_VISION_SOURCE", "stub://hallway");
    std::env::set_var("SMART_VISION_INTERVAL_SECS", "12");

    let cfg = SmartVisionConfig::load().expect("load config");

    assert_eq!(cfg.source.url, "stub://hallway");
    assert_eq!(cfg.source.target_fps, 15);
    assert_eq!((cfg.source.width, cfg.source.height), (800, 600));
    assert_eq!(cfg.detector.backend, "tract");
    assert_eq!(cfg.detector.model_path.to_str(), Some("models/custom.onnx"));
    assert!((cfg.detector.confidence_threshold - 0.4).abs() < f32::EPSILON);
    assert_eq!(cfg.announce.labels, vec!["person", "chair"]);
    assert_eq!(cfg.announce.interval, Duration::from_secs(12));
    assert_eq!(cfg.announce.language, "fr");
    assert_eq!(cfg.speech.engine, "log");

    clear_env();
}

#[test]
fn loads_toml_config_by_extension() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config");
    let toml = r#"
        [announce]
        labels = ["bottle"]
        interval_secs = 3.0

        [render]
        snapshot_every = 10
    "#;
    std::io::Write::write_all(&mut file, toml.as_bytes()).expect("write config");

    let cfg = SmartVisionConfig::load_from(file.path()).expect("load config");
    assert_eq!(cfg.announce.labels, vec!["bottle"]);
    assert_eq!(cfg.announce.interval, Duration::from_secs(3));
    assert_eq!(cfg.render.snapshot_every, 10);
    assert_eq!(cfg.source.url, "stub://front_camera");

    clear_env();
}

#[test]
fn env_labels_replace_file_labels() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("SMART_VISION_LABELS", "car, bicycle ,,car");
    let cfg = SmartVisionConfig::load().expect("load config");
    assert_eq!(cfg.announce.labels, vec!["car", "bicycle"]);

    clear_env();
}

#[test]
fn rejects_invalid_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("SMART_VISION_INTERVAL_SECS", "soon");
    assert!(SmartVisionConfig::load().is_err());
    clear_env();

    std::env::set_var("SMART_VISION_INTERVAL_SECS", "0");
    assert!(SmartVisionConfig::load().is_err());
    clear_env();

    std::env::set_var("SMART_VISION_LANGUAGE", "english please");
    assert!(SmartVisionConfig::load().is_err());
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, br#"{ "announce": { "labels": [" "] } }"#)
        .expect("write config");
    std::env::set_var("SMART_VISION_CONFIG", file.path());
    assert!(SmartVisionConfig::load().is_err());

    clear_env();
}

#[test]
fn missing_config_file_is_an_error() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("SMART_VISION_CONFIG", "/nonexistent/smart_vision.json");
    assert!(SmartVisionConfig::load().is_err());

    clear_env();
}
