// src/classifier/mod.rs
pub mod connector;
pub mod ollama;
pub mod prediction;

pub use connector::{ClassifierSource, ImageClassifier};
pub use prediction::Prediction;
