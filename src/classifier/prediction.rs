// src/classifier/prediction.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::cmp::Ordering;

/// A single (label, confidence) pair reported by a classifier
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Prediction {
    pub label: String,
    /// Certainty for this label, in [0, 1]
    pub confidence: f32,
}

impl Prediction {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RankedResponse {
    Wrapped { predictions: Vec<Prediction> },
    Bare(Vec<Prediction>),
}

/// Sort predictions highest confidence first, dropping unusable entries.
///
/// Confidences between 1 and 100 are read as percentages, anything else is
/// clamped into [0, 1]. Entries with a blank label or a NaN confidence are
/// discarded. Equal confidences keep their original order.
pub fn rank(predictions: Vec<Prediction>) -> Vec<Prediction> {
    let mut ranked: Vec<Prediction> = predictions
        .into_iter()
        .filter(|p| !p.label.trim().is_empty() && !p.confidence.is_nan())
        .map(|p| {
            let confidence = if p.confidence > 1.0 && p.confidence <= 100.0 {
                p.confidence / 100.0
            } else {
                p.confidence.clamp(0.0, 1.0)
            };
            Prediction {
                label: p.label.trim().to_string(),
                confidence,
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });
    ranked
}

/// Parse a model's JSON answer into a ranked prediction list.
///
/// Accepts either `{"predictions": [...]}` or a bare array of
/// `{"label": .., "confidence": ..}` objects.
pub fn parse_ranked(response: &str) -> Result<Vec<Prediction>> {
    let trimmed = response.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("Model returned an empty response"));
    }

    let parsed: RankedResponse = serde_json::from_str(trimmed)
        .with_context(|| format!("Model response is not a prediction list: {}", trimmed))?;

    let predictions = match parsed {
        RankedResponse::Wrapped { predictions } => predictions,
        RankedResponse::Bare(predictions) => predictions,
    };

    Ok(rank(predictions))
}
