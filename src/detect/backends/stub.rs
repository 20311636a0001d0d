use anyhow::{anyhow, Context, Result};
use std::path::Path;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{BoundingBox, Detection};
use crate::detect::vocabulary::Vocabulary;
use crate::frame::Frame;

/// Scripted backend. Replays a fixed list of per-frame detections, wrapping
/// around at the end of the script.
///
/// Used for headless demos without a model and for pipeline tests.
pub struct ScriptedBackend {
    script: Vec<Vec<Detection>>,
    cursor: usize,
    vocabulary: Vocabulary,
}

impl ScriptedBackend {
    pub fn new(script: Vec<Vec<Detection>>) -> Self {
        Self {
            script,
            cursor: 0,
            vocabulary: Vocabulary::coco(),
        }
    }

    /// Load a script from a JSON file: an array of frames, each an array of
    /// `{"bbox": {"x1":..,"y1":..,"x2":..,"y2":..}, "label": "..", "confidence": ..}`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read detection script {}", path.display()))?;
        let script: Vec<Vec<Detection>> = serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid detection script {}: {}", path.display(), e))?;
        Ok(Self::new(script))
    }

    /// Built-in scene laid out in fractions of the frame so it fits any size.
    pub fn demo_scene(width: u32, height: u32) -> Self {
        let w = width as f32;
        let h = height as f32;
        let bbox = |x1: f32, y1: f32, x2: f32, y2: f32| BoundingBox::new(x1 * w, y1 * h, x2 * w, y2 * h);
        let walking_in = vec![
            Detection::new(bbox(0.02, 0.05, 0.30, 0.95), "person", 0.91),
            Detection::new(bbox(0.47, 0.40, 0.53, 0.60), "cell phone", 0.64),
            Detection::new(bbox(0.75, 0.45, 0.98, 0.70), "car", 0.58),
        ];
        let on_the_table = vec![
            Detection::new(bbox(0.40, 0.55, 0.48, 0.80), "bottle", 0.77),
            Detection::new(bbox(0.70, 0.60, 0.85, 0.75), "book", 0.70),
            Detection::new(bbox(0.72, 0.62, 0.88, 0.78), "book", 0.52),
        ];
        Self::new(vec![walking_in, on_the_table])
    }

    pub fn with_vocabulary(mut self, vocabulary: Vocabulary) -> Self {
        self.vocabulary = vocabulary;
        self
    }

    pub fn frames_replayed(&self) -> usize {
        self.cursor
    }
}

impl DetectorBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>> {
        if self.script.is_empty() {
            return Ok(Vec::new());
        }
        let detections = self.script[self.cursor % self.script.len()].clone();
        self.cursor += 1;
        Ok(detections)
    }

    fn warm_up(&mut self) -> Result<()> {
        for (frame_idx, frame) in self.script.iter().enumerate() {
            for det in frame {
                if !self.vocabulary.contains(&det.label) {
                    log::warn!(
                        "ScriptedBackend: frame {} uses label '{}' outside the vocabulary",
                        frame_idx,
                        det.label
                    );
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn frame() -> Frame {
        Frame::filled(640, 480, [0, 0, 0], 1).unwrap()
    }

    #[test]
    fn scripted_backend_wraps_around() -> Result<()> {
        let a = Detection::new(BoundingBox::new(0.0, 0.0, 10.0, 10.0), "person", 0.9);
        let b = Detection::new(BoundingBox::new(5.0, 5.0, 20.0, 20.0), "book", 0.8);
        let mut backend = ScriptedBackend::new(vec![vec![a.clone()], vec![b.clone()]]);
        let frame = frame();

        assert_eq!(backend.detect(&frame)?, vec![a.clone()]);
        assert_eq!(backend.detect(&frame)?, vec![b]);
        assert_eq!(backend.detect(&frame)?, vec![a]);
        assert_eq!(backend.frames_replayed(), 3);
        Ok(())
    }

    #[test]
    fn empty_script_detects_nothing() -> Result<()> {
        let mut backend = ScriptedBackend::new(Vec::new());
        assert!(backend.detect(&frame())?.is_empty());
        Ok(())
    }

    #[test]
    fn demo_scene_boxes_fit_the_frame() -> Result<()> {
        let mut backend = ScriptedBackend::demo_scene(640, 480);
        let frame = frame();
        for _ in 0..2 {
            for det in backend.detect(&frame)? {
                assert!(det.bbox.is_well_formed(640, 480), "{:?}", det);
            }
        }
        Ok(())
    }

    #[test]
    fn loads_script_from_json() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(
            file,
            r#"[[{{"bbox": {{"x1": 0, "y1": 0, "x2": 200, "y2": 400}}, "label": "person", "confidence": 0.9}}], []]"#
        )?;
        let mut backend = ScriptedBackend::from_file(file.path())?;
        let frame = frame();
        let first = backend.detect(&frame)?;
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].label, "person");
        assert!(backend.detect(&frame)?.is_empty());
        Ok(())
    }
}
