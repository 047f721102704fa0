pub mod line_classifier;
pub mod notes_models;

pub use line_classifier::classify_document;
pub use notes_models::{ClassifiedLine, LineKind};
