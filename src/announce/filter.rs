use std::collections::BTreeSet;

use crate::config::DEFAULT_ANNOUNCE_LABELS;
use crate::detect::Vocabulary;

/// Label allow-list deciding which detections may be spoken.
///
/// Everything the detector finds is still drawn; only allowed labels reach
/// the aggregator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnnouncementFilter {
    labels: BTreeSet<String>,
}

impl AnnouncementFilter {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_announceable(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    /// Allowed labels the detector can never emit.
    pub fn unknown_labels<'a>(&'a self, vocabulary: &'a Vocabulary) -> impl Iterator<Item = &'a str> + 'a {
        self.labels
            .iter()
            .map(String::as_str)
            .filter(move |label| !vocabulary.contains(label))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}

impl Default for AnnouncementFilter {
    fn default() -> Self {
        Self::new(DEFAULT_ANNOUNCE_LABELS)
    }
}
