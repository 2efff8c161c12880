// src/trigger.rs
use anyhow::Result;
use image::DynamicImage;
use log::{error, info, warn};
use std::io::Cursor;

use crate::classifier::{ClassifierSource, Prediction};

/// Everything a single classification attempt can end in
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifyOutcome {
    /// The top prediction, already formatted for display
    Labeled(String),
    /// The classifier ran but reported nothing
    NoResults,
    /// The classifier could not be obtained
    Unavailable(String),
    /// The image could not be turned into classifier input
    ConversionFailed(String),
    /// The classifier was called and failed
    InvocationFailed(String),
}

impl ClassifyOutcome {
    /// Text for the result field, or `None` if the field should be left alone
    pub fn display_text(&self) -> Option<String> {
        match self {
            ClassifyOutcome::Labeled(text) => Some(text.clone()),
            ClassifyOutcome::NoResults => None,
            ClassifyOutcome::Unavailable(reason) => {
                Some(format!("Failed to load classification model: {}", reason))
            }
            ClassifyOutcome::ConversionFailed(reason) => {
                Some(format!("Failed to prepare image for classification: {}", reason))
            }
            ClassifyOutcome::InvocationFailed(reason) => {
                Some(format!("Failed to perform image classification: {}", reason))
            }
        }
    }
}

pub fn format_classification(top: &Prediction) -> String {
    format!(
        "Classification: {} with {:.2}% confidence.",
        top.label,
        top.confidence * 100.0
    )
}

/// Encode a decoded image as PNG bytes for the classifier
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut cursor = Cursor::new(&mut buffer);
    image.write_to(&mut cursor, image::ImageOutputFormat::Png)?;
    Ok(buffer)
}

/// Run one classification attempt for `image`. Never retries.
pub fn classify_image(source: &dyn ClassifierSource, image: &DynamicImage) -> ClassifyOutcome {
    let classifier = match source.load() {
        Ok(classifier) => classifier,
        Err(e) => {
            error!("Failed to load model: {:#}", e);
            return ClassifyOutcome::Unavailable(format!("{:#}", e));
        }
    };

    let image_data = match encode_png(image) {
        Ok(data) => data,
        Err(e) => {
            error!("Failed to convert image for classification: {:#}", e);
            return ClassifyOutcome::ConversionFailed(format!("{:#}", e));
        }
    };

    match classifier.classify(&image_data) {
        Ok(predictions) => match predictions.into_iter().next() {
            Some(top) => {
                let text = format_classification(&top);
                info!("{}", text);
                ClassifyOutcome::Labeled(text)
            }
            None => {
                warn!("No results");
                ClassifyOutcome::NoResults
            }
        },
        Err(e) => {
            let outcome = ClassifyOutcome::InvocationFailed(format!("{:#}", e));
            if let Some(text) = outcome.display_text() {
                error!("{}", text);
            }
            outcome
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::classifier::ImageClassifier;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Classifier returning a canned answer, counting how often it is called
    pub struct ScriptedClassifier {
        pub answer: std::result::Result<Vec<Prediction>, String>,
        pub calls: Arc<AtomicUsize>,
    }

    impl ImageClassifier for ScriptedClassifier {
        fn classify(&self, image_data: &[u8]) -> Result<Vec<Prediction>> {
            assert!(image_data.starts_with(b"\x89PNG"));
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer.clone().map_err(|e| anyhow!(e))
        }
    }

    pub struct ScriptedSource {
        pub load_error: Option<String>,
        pub answer: std::result::Result<Vec<Prediction>, String>,
        pub calls: Arc<AtomicUsize>,
    }

    impl ScriptedSource {
        pub fn answering(predictions: Vec<Prediction>) -> Self {
            Self {
                load_error: None,
                answer: Ok(predictions),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub fn failing(message: &str) -> Self {
            Self {
                load_error: None,
                answer: Err(message.to_string()),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub fn unavailable(message: &str) -> Self {
            Self {
                load_error: Some(message.to_string()),
                answer: Ok(Vec::new()),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl ClassifierSource for ScriptedSource {
        fn load(&self) -> Result<Box<dyn ImageClassifier>> {
            if let Some(message) = &self.load_error {
                return Err(anyhow!(message.clone()));
            }
            Ok(Box::new(ScriptedClassifier {
                answer: self.answer.clone(),
                calls: Arc::clone(&self.calls),
            }))
        }
    }

    pub fn sample_image() -> DynamicImage {
        DynamicImage::ImageRgb8(image::RgbImage::from_pixel(4, 3, image::Rgb([200, 120, 40])))
    }

    #[test]
    fn formats_top_prediction_with_two_decimals() {
        let source = ScriptedSource::answering(vec![
            Prediction::new("tabby cat", 0.8734),
            Prediction::new("tiger cat", 0.05),
        ]);
        let outcome = classify_image(&source, &sample_image());
        assert_eq!(
            outcome,
            ClassifyOutcome::Labeled("Classification: tabby cat with 87.34% confidence.".to_string())
        );
        assert_eq!(
            outcome.display_text().as_deref(),
            Some("Classification: tabby cat with 87.34% confidence.")
        );
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn format_rounds_to_two_places() {
        assert_eq!(
            format_classification(&Prediction::new("espresso", 1.0)),
            "Classification: espresso with 100.00% confidence."
        );
        assert_eq!(
            format_classification(&Prediction::new("teapot", 0.0)),
            "Classification: teapot with 0.00% confidence."
        );
    }

    #[test]
    fn invocation_failure_is_shown_verbatim() {
        let source = ScriptedSource::failing("model not found");
        let outcome = classify_image(&source, &sample_image());
        assert_eq!(outcome, ClassifyOutcome::InvocationFailed("model not found".to_string()));
        assert_eq!(
            outcome.display_text().as_deref(),
            Some("Failed to perform image classification: model not found")
        );
    }

    #[test]
    fn empty_result_leaves_text_alone() {
        let source = ScriptedSource::answering(Vec::new());
        let outcome = classify_image(&source, &sample_image());
        assert_eq!(outcome, ClassifyOutcome::NoResults);
        assert_eq!(outcome.display_text(), None);
    }

    #[test]
    fn unavailable_model_is_reported_without_invoking() {
        let source = ScriptedSource::unavailable("connection refused");
        let outcome = classify_image(&source, &sample_image());
        assert_eq!(outcome, ClassifyOutcome::Unavailable("connection refused".to_string()));
        assert_eq!(
            outcome.display_text().as_deref(),
            Some("Failed to load classification model: connection refused")
        );
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    /// Fails with a two-level anyhow chain, either when loading or when classifying
    struct ChainedFailureSource {
        at_load: bool,
    }

    fn chained_error() -> anyhow::Error {
        anyhow!("connection refused").context("Could not connect to Ollama server at http://localhost:11434")
    }

    impl ImageClassifier for ChainedFailureSource {
        fn classify(&self, _image_data: &[u8]) -> Result<Vec<Prediction>> {
            Err(chained_error())
        }
    }

    impl ClassifierSource for ChainedFailureSource {
        fn load(&self) -> Result<Box<dyn ImageClassifier>> {
            if self.at_load {
                return Err(chained_error());
            }
            Ok(Box::new(ChainedFailureSource { at_load: false }))
        }
    }

    #[test]
    fn unavailable_text_keeps_the_underlying_cause() {
        let outcome = classify_image(&ChainedFailureSource { at_load: true }, &sample_image());
        assert_eq!(
            outcome.display_text().as_deref(),
            Some("Failed to load classification model: Could not connect to Ollama server at http://localhost:11434: connection refused")
        );
    }

    #[test]
    fn invocation_text_keeps_the_underlying_cause() {
        let outcome = classify_image(&ChainedFailureSource { at_load: false }, &sample_image());
        assert_eq!(
            outcome,
            ClassifyOutcome::InvocationFailed(
                "Could not connect to Ollama server at http://localhost:11434: connection refused".to_string()
            )
        );
    }

    #[test]
    fn conversion_failure_text() {
        let outcome = ClassifyOutcome::ConversionFailed("unsupported color type".to_string());
        assert_eq!(
            outcome.display_text().as_deref(),
            Some("Failed to prepare image for classification: unsupported color type")
        );
    }

    #[test]
    fn encode_png_produces_png() {
        let bytes = encode_png(&sample_image()).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 3));
    }
}
