// src/worker.rs
use image::DynamicImage;
use log::{info, warn};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::classifier::ClassifierSource;
use crate::state::{Effect, Event, Generation};
use crate::trigger::classify_image;

/// Wakes the UI after an event has been queued (a repaint request in the GUI)
pub type Notify = Arc<dyn Fn() + Send + Sync>;

/// Start the work an [`Effect`] asks for. Results come back as events on `sender`.
pub fn run_effect(
    effect: Effect,
    source: Arc<dyn ClassifierSource>,
    sender: Sender<Event>,
    notify: Notify,
) -> JoinHandle<()> {
    match effect {
        Effect::Classify { generation, image } => {
            spawn_classification(source, generation, image, sender, notify)
        }
    }
}

pub fn spawn_classification(
    source: Arc<dyn ClassifierSource>,
    generation: Generation,
    image: DynamicImage,
    sender: Sender<Event>,
    notify: Notify,
) -> JoinHandle<()> {
    info!("Starting classification for generation {}", generation);
    thread::spawn(move || {
        let outcome = classify_image(source.as_ref(), &image);
        if sender
            .send(Event::ClassificationFinished { generation, outcome })
            .is_err()
        {
            warn!("UI went away before classification {} finished", generation);
            return;
        }
        notify();
    })
}
