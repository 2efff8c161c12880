// src/state.rs
use chrono::{DateTime, Local};
use image::DynamicImage;
use log::{debug, info};

use crate::trigger::ClassifyOutcome;

/// Identifies one image selection. Results carry it back so stale ones can be dropped.
pub type Generation = u64;

#[derive(Clone)]
pub struct SelectedImage {
    pub image: DynamicImage,
    pub generation: Generation,
    /// File name shown under the preview
    pub name: String,
}

/// Messages delivered to the UI thread. Workers only ever talk to the app through these.
pub enum Event {
    ImagePicked { image: DynamicImage, name: String },
    ClassificationFinished { generation: Generation, outcome: ClassifyOutcome },
    ClearRequested,
}

/// Work the UI thread should start after applying an event
#[derive(Clone)]
pub enum Effect {
    Classify { generation: Generation, image: DynamicImage },
}

/// Owned by the UI thread only
#[derive(Default)]
pub struct AppState {
    pub selected_image: Option<SelectedImage>,
    pub classification: String,
    pub classified_at: Option<DateTime<Local>>,
    pending: Option<Generation>,
    next_generation: Generation,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_classifying(&self) -> bool {
        self.pending.is_some()
    }

    pub fn apply(&mut self, event: Event) -> Vec<Effect> {
        match event {
            Event::ImagePicked { image, name } => {
                self.next_generation += 1;
                let generation = self.next_generation;
                info!(
                    "Image selected: {} ({}x{}), generation {}",
                    name,
                    image.width(),
                    image.height(),
                    generation
                );
                self.selected_image = Some(SelectedImage {
                    image: image.clone(),
                    generation,
                    name,
                });
                self.pending = Some(generation);
                vec![Effect::Classify { generation, image }]
            }
            Event::ClassificationFinished { generation, outcome } => {
                let current = self.selected_image.as_ref().map(|s| s.generation);
                if current != Some(generation) {
                    debug!(
                        "Dropping classification result for generation {} (current {:?})",
                        generation, current
                    );
                    return Vec::new();
                }
                self.pending = None;
                if let Some(text) = outcome.display_text() {
                    self.classification = text;
                    self.classified_at = Some(Local::now());
                }
                Vec::new()
            }
            Event::ClearRequested => {
                info!("Image cleared");
                self.selected_image = None;
                self.classification.clear();
                self.classified_at = None;
                self.pending = None;
                Vec::new()
            }
        }
    }
}
