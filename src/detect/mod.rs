mod backend;
pub mod backends;
pub mod yolo;
mod result;
mod vocabulary;

pub use backend::DetectorBackend;
pub use backends::{build_backend, ScriptedBackend};
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use result::{BoundingBox, Detection};
pub use vocabulary::{Vocabulary, COCO_LABELS};
