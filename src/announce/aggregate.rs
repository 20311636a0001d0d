use std::collections::BTreeSet;

use crate::announce::filter::AnnouncementFilter;
use crate::detect::Detection;
use crate::spatial::{classify, SpatialDescription};

/// Per-frame set of phrases such as `person to your left, near`.
///
/// Identical phrases collapse, so two books in the same zone are spoken once.
/// Ordered lexicographically so the spoken sentence is reproducible.
pub type PhraseSet = BTreeSet<String>;

pub fn phrase(label: &str, desc: SpatialDescription) -> String {
    format!("{} {}, {}", label, desc.direction, desc.proximity)
}

/// Collects announceable detections of one frame into phrases.
#[derive(Clone, Debug, Default)]
pub struct Aggregator {
    filter: AnnouncementFilter,
}

impl Aggregator {
    pub fn new(filter: AnnouncementFilter) -> Self {
        Self { filter }
    }

    pub fn filter(&self) -> &AnnouncementFilter {
        &self.filter
    }

    /// Build the phrase set for one frame.
    ///
    /// Detections must already be well-formed for the given frame size.
    pub fn aggregate<'a, I>(&self, detections: I, frame_width: u32, frame_height: u32) -> PhraseSet
    where
        I: IntoIterator<Item = &'a Detection>,
    {
        detections
            .into_iter()
            .filter(|det| self.filter.is_announceable(&det.label))
            .map(|det| phrase(&det.label, classify(&det.bbox, frame_width, frame_height)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BoundingBox;

    fn det(label: &str, x1: f32, y1: f32, x2: f32, y2: f32) -> Detection {
        Detection::new(BoundingBox::new(x1, y1, x2, y2), label, 0.8)
    }

    #[test]
    fn formats_phrases() {
        let agg = Aggregator::default();
        let dets = [
            det("person", 0.0, 0.0, 200.0, 400.0),
            det("cell phone", 300.0, 0.0, 340.0, 100.0),
        ];
        let phrases = agg.aggregate(&dets, 640, 480);
        let expected: PhraseSet = ["cell phone ahead, far", "person to your left, near"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(phrases, expected);
    }

    #[test]
    fn same_label_same_zone_collapses() {
        let agg = Aggregator::default();
        let dets = [
            det("book", 300.0, 10.0, 320.0, 40.0),
            det("book", 310.0, 200.0, 350.0, 260.0),
        ];
        let phrases = agg.aggregate(&dets, 640, 480);
        assert_eq!(phrases.len(), 1);
        assert!(phrases.contains("book ahead, far"));
    }

    #[test]
    fn aggregation_is_idempotent() {
        let agg = Aggregator::default();
        let dets = vec![
            det("person", 0.0, 0.0, 200.0, 400.0),
            det("bottle", 500.0, 0.0, 600.0, 50.0),
        ];
        let once = agg.aggregate(&dets, 640, 480);
        let doubled: Vec<Detection> = dets.iter().chain(dets.iter()).cloned().collect();
        assert_eq!(agg.aggregate(&doubled, 640, 480), once);
        assert_eq!(agg.aggregate(&dets, 640, 480), once);
    }

    #[test]
    fn non_allowed_labels_are_skipped() {
        let agg = Aggregator::default();
        let dets = [det("car", 0.0, 0.0, 200.0, 400.0)];
        assert!(agg.aggregate(&dets, 640, 480).is_empty());
    }
}
