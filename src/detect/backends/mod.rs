pub mod stub;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use stub::ScriptedBackend;

#[cfg(feature = "backend-tract")]
pub use tract::TractBackend;

use anyhow::{anyhow, Result};

use crate::config::DetectorSettings;
use crate::detect::backend::DetectorBackend;
use crate::detect::vocabulary::Vocabulary;

/// Build the detector named in the configuration.
///
/// `frame_width`/`frame_height` size the built-in demo scene of the stub
/// backend; model backends resize frames to their own input.
pub fn build_backend(
    settings: &DetectorSettings,
    frame_width: u32,
    frame_height: u32,
) -> Result<Box<dyn DetectorBackend>> {
    let vocabulary = match settings.labels_path.as_deref() {
        Some(path) => Vocabulary::from_file(path)?,
        None => Vocabulary::coco(),
    };
    match settings.backend.as_str() {
        // Camera preview: frames are shown, nothing is detected or spoken.
        "none" => Ok(Box::new(
            ScriptedBackend::new(Vec::new()).with_vocabulary(vocabulary),
        )),
        "stub" => {
            let backend = match settings.script_path.as_deref() {
                Some(path) => ScriptedBackend::from_file(path)?,
                None => ScriptedBackend::demo_scene(frame_width, frame_height),
            };
            Ok(Box::new(backend.with_vocabulary(vocabulary)))
        }
        "tract" => {
            #[cfg(feature = "backend-tract")]
            {
                let backend = TractBackend::new(
                    &settings.model_path,
                    settings.input_size,
                    settings.input_size,
                    vocabulary,
                )?
                .with_thresholds(settings.confidence_threshold, settings.iou_threshold);
                Ok(Box::new(backend))
            }
            #[cfg(not(feature = "backend-tract"))]
            {
                let _ = vocabulary;
                Err(anyhow!("the tract backend requires the backend-tract feature"))
            }
        }
        other => Err(anyhow!("unknown detector backend '{}'", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn settings(backend: &str) -> DetectorSettings {
        DetectorSettings {
            backend: backend.to_string(),
            model_path: PathBuf::from("Models/yolov8n.onnx"),
            labels_path: None,
            script_path: None,
            input_size: 640,
            confidence_threshold: 0.25,
            iou_threshold: 0.7,
        }
    }

    #[test]
    fn builds_stub_backend_by_default_name() -> Result<()> {
        let backend = build_backend(&settings("stub"), 640, 480)?;
        assert_eq!(backend.name(), "stub");
        assert!(backend.vocabulary().contains("cell phone"));
        Ok(())
    }

    #[test]
    fn preview_backend_detects_nothing() -> Result<()> {
        let mut backend = build_backend(&settings("none"), 640, 480)?;
        let frame = crate::frame::Frame::filled(640, 480, [0, 0, 0], 1)?;
        for _ in 0..3 {
            assert!(backend.detect(&frame)?.is_empty());
        }
        Ok(())
    }

    #[test]
    fn rejects_unknown_backend() {
        assert!(build_backend(&settings("cuda"), 640, 480).is_err());
    }
}
