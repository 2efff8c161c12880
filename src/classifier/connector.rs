// src/classifier/connector.rs
use anyhow::Result;

use super::prediction::Prediction;

/// Trait defining the interface for image classification
pub trait ImageClassifier: Send + Sync {
    /// Classify an encoded image and return predictions ranked by confidence, highest first
    fn classify(&self, image_data: &[u8]) -> Result<Vec<Prediction>>;
}

/// Something that can hand out a ready classifier. Failing here means the
/// classifier is unavailable, as opposed to failing during a classification.
pub trait ClassifierSource: Send + Sync {
    fn load(&self) -> Result<Box<dyn ImageClassifier>>;
}
