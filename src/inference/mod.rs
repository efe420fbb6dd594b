//! Inference module
//!
//! Loads one persisted [`ModelBundle`] and maps batches of feature rows to
//! display labels through the bundle's own [`LabelMap`](crate::dataset::LabelMap).

mod bundle;
mod engine;

pub use bundle::{ModelBundle, BUNDLE_FORMAT_VERSION};
pub use engine::InferenceAdapter;
