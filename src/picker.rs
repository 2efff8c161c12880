// src/picker.rs
use anyhow::{Context, Result};
use image::DynamicImage;
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

use crate::state::Event;
use crate::worker::Notify;

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp", "tif", "tiff"];

/// Lets the user choose at most one image file
pub trait ImagePicker {
    /// `None` means the user cancelled
    fn pick_image(&self) -> Option<PathBuf>;
}

/// Native OS file dialog, restricted to image files, single selection
pub struct NativePicker;

impl ImagePicker for NativePicker {
    fn pick_image(&self) -> Option<PathBuf> {
        rfd::FileDialog::new()
            .set_title("Choose a photo")
            .add_filter("Images", IMAGE_EXTENSIONS)
            .pick_file()
    }
}

pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

pub fn decode_image(path: &Path) -> Result<DynamicImage> {
    image::open(path).with_context(|| format!("Failed to decode image {}", path.display()))
}

/// Show the picker and, if something was chosen, decode it off the UI thread.
///
/// The decoded image arrives as [`Event::ImagePicked`] on `sender`. Cancelling
/// or a file that does not decode sends nothing, so the current selection stays.
pub fn request_image(
    picker: &dyn ImagePicker,
    sender: Sender<Event>,
    notify: Notify,
) -> Option<JoinHandle<()>> {
    let path = match picker.pick_image() {
        Some(path) => path,
        None => {
            info!("Picker cancelled, keeping current selection");
            return None;
        }
    };

    if !is_image_path(&path) {
        warn!("Ignoring non-image selection: {}", path.display());
        return None;
    }

    Some(thread::spawn(move || match decode_image(&path) {
        Ok(image) => {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            if sender.send(Event::ImagePicked { image, name }).is_err() {
                warn!("UI went away before the picked image arrived");
                return;
            }
            notify();
        }
        Err(e) => {
            warn!("{:#}", e);
        }
    }))
}
