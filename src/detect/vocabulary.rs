use anyhow::{anyhow, Context, Result};
use std::path::Path;

/// Class names of the 80-class COCO label set used by stock YOLOv8 models,
/// indexed by class id.
pub const COCO_LABELS: [&str; 80] = [
    "person",
    "bicycle",
    "car",
    "motorcycle",
    "airplane",
    "bus",
    "train",
    "truck",
    "boat",
    "traffic light",
    "fire hydrant",
    "stop sign",
    "parking meter",
    "bench",
    "bird",
    "cat",
    "dog",
    "horse",
    "sheep",
    "cow",
    "elephant",
    "bear",
    "zebra",
    "giraffe",
    "backpack",
    "umbrella",
    "handbag",
    "tie",
    "suitcase",
    "frisbee",
    "skis",
    "snowboard",
    "sports ball",
    "kite",
    "baseball bat",
    "baseball glove",
    "skateboard",
    "surfboard",
    "tennis racket",
    "bottle",
    "wine glass",
    "cup",
    "fork",
    "knife",
    "spoon",
    "bowl",
    "banana",
    "apple",
    "sandwich",
    "orange",
    "broccoli",
    "carrot",
    "hot dog",
    "pizza",
    "donut",
    "cake",
    "chair",
    "couch",
    "potted plant",
    "bed",
    "dining table",
    "toilet",
    "tv",
    "laptop",
    "mouse",
    "remote",
    "keyboard",
    "cell phone",
    "microwave",
    "oven",
    "toaster",
    "sink",
    "refrigerator",
    "book",
    "clock",
    "vase",
    "scissors",
    "teddy bear",
    "hair drier",
    "toothbrush",
];

/// Fixed label vocabulary of a detector, resolved once at initialization.
///
/// Detectors map their class indices through this table instead of doing
/// per-frame dictionary lookups on model metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vocabulary {
    labels: Vec<String>,
}

impl Vocabulary {
    pub fn new<I, S>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Err(anyhow!("label vocabulary must not be empty"));
        }
        if let Some(blank) = labels.iter().position(|l| l.trim().is_empty()) {
            return Err(anyhow!("label vocabulary entry {} is blank", blank));
        }
        Ok(Self { labels })
    }

    pub fn coco() -> Self {
        Self {
            labels: COCO_LABELS.iter().map(|l| l.to_string()).collect(),
        }
    }

    /// Load a newline-separated labels file. Blank lines are skipped.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read labels file {}", path.display()))?;
        Self::new(
            raw.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string),
        )
        .with_context(|| format!("invalid labels file {}", path.display()))
    }

    pub fn label(&self, class_id: usize) -> Option<&str> {
        self.labels.get(class_id).map(String::as_str)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::coco()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn coco_contains_default_announce_labels() {
        let vocab = Vocabulary::coco();
        assert_eq!(vocab.len(), 80);
        for label in ["person", "cell phone", "bottle", "book"] {
            assert!(vocab.contains(label), "{label} missing");
        }
        assert_eq!(vocab.label(0), Some("person"));
        assert_eq!(vocab.label(67), Some("cell phone"));
        assert_eq!(vocab.label(80), None);
    }

    #[test]
    fn loads_labels_file_skipping_blank_lines() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "door\n\n  stairs  \nperson")?;
        let vocab = Vocabulary::from_file(file.path())?;
        assert_eq!(vocab.len(), 3);
        assert_eq!(vocab.label(1), Some("stairs"));
        Ok(())
    }

    #[test]
    fn rejects_empty_vocabulary() {
        assert!(Vocabulary::new(Vec::<String>::new()).is_err());
        assert!(Vocabulary::new(["person", " "]).is_err());
    }
}
