// src/gui.rs
use anyhow::Result;
use eframe::egui;
use egui::{Align, Color32, Layout, RichText, Vec2};
use log::{error, info};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

#[cfg(feature = "clipboard")]
use arboard::Clipboard;

use crate::classifier::ollama::OllamaSource;
use crate::classifier::ClassifierSource;
use crate::config::Settings;
use crate::picker::{request_image, ImagePicker, NativePicker};
use crate::state::{AppState, Event, Generation};
use crate::worker::{run_effect, Notify};

const PREVIEW_HEIGHT: f32 = 200.0;
/// Longest side of the preview texture. The classifier still gets the full image.
const PREVIEW_TEXTURE_SIDE: u32 = 512;
const CLEAR_BUTTON_SIZE: f32 = 26.0;
const WINDOW_WIDTH: f32 = 420.0;
const WINDOW_HEIGHT: f32 = 520.0;

pub struct ClassifyApp {
    state: AppState,
    events_tx: Sender<Event>,
    events_rx: Receiver<Event>,
    source: Arc<dyn ClassifierSource>,
    picker: Box<dyn ImagePicker>,
    notify: Notify,
    preview: Option<(Generation, egui::TextureHandle)>,
    model_name: String,
    was_style_initialized: bool,
}

impl ClassifyApp {
    pub fn new(ctx: egui::Context, settings: Settings) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        let notify: Notify = Arc::new(move || ctx.request_repaint());
        Self {
            state: AppState::new(),
            events_tx,
            events_rx,
            model_name: settings.model_name.clone(),
            source: Arc::new(OllamaSource::new(settings)),
            picker: Box::new(NativePicker),
            notify,
            preview: None,
            was_style_initialized: false,
        }
    }

    /// Apply one event on the UI thread and start whatever work it asks for
    fn dispatch(&mut self, event: Event) {
        for effect in self.state.apply(event) {
            run_effect(
                effect,
                Arc::clone(&self.source),
                self.events_tx.clone(),
                Arc::clone(&self.notify),
            );
        }
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.dispatch(event);
        }
    }

    fn open_picker(&mut self) {
        request_image(
            self.picker.as_ref(),
            self.events_tx.clone(),
            Arc::clone(&self.notify),
        );
    }

    fn sync_preview(&mut self, ctx: &egui::Context) {
        let Some(selected) = &self.state.selected_image else {
            self.preview = None;
            return;
        };
        if self.preview.as_ref().map(|(g, _)| *g) == Some(selected.generation) {
            return;
        }

        let max_side = ctx
            .input(|i| i.max_texture_side)
            .min(PREVIEW_TEXTURE_SIDE as usize) as u32;
        let (width, height) =
            preview_size(selected.image.width(), selected.image.height(), max_side);
        let rgba = if (width, height) == (selected.image.width(), selected.image.height()) {
            selected.image.to_rgba8()
        } else {
            selected.image.thumbnail_exact(width, height).to_rgba8()
        };
        let color_image = egui::ColorImage::from_rgba_unmultiplied(
            [width as usize, height as usize],
            rgba.as_flat_samples().as_slice(),
        );
        let texture = ctx.load_texture("selected_image", color_image, egui::TextureOptions::LINEAR);
        self.preview = Some((selected.generation, texture));
    }

    fn init_style(&mut self, ctx: &egui::Context) {
        let mut style = (*ctx.style()).clone();
        style.visuals.widgets.inactive.rounding = egui::Rounding::same(6.0);
        style.visuals.widgets.hovered.rounding = egui::Rounding::same(6.0);
        style.visuals.widgets.active.rounding = egui::Rounding::same(6.0);
        style.visuals.selection.bg_fill = Color32::from_rgb(42, 90, 170);
        style.text_styles.insert(
            egui::TextStyle::Body,
            egui::FontId::new(15.0, egui::FontFamily::Proportional),
        );
        style.text_styles.insert(
            egui::TextStyle::Button,
            egui::FontId::new(15.0, egui::FontFamily::Proportional),
        );
        ctx.set_style(style);
        self.was_style_initialized = true;
    }

    fn copy_result_to_clipboard(&self) {
        #[cfg(feature = "clipboard")]
        {
            match Clipboard::new() {
                Ok(mut clipboard) => {
                    if let Err(e) = clipboard.set_text(self.state.classification.clone()) {
                        error!("Failed to copy result to clipboard: {}", e);
                    } else {
                        info!("Result copied to clipboard");
                    }
                }
                Err(e) => {
                    error!("Failed to access clipboard: {}", e);
                }
            }
        }
        #[cfg(not(feature = "clipboard"))]
        {
            error!("Clipboard feature not enabled. Enable the 'clipboard' feature in Cargo.toml");
        }
    }
}

impl eframe::App for ClassifyApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if !self.was_style_initialized {
            self.init_style(ctx);
        }

        self.drain_events();
        self.sync_preview(ctx);

        let mut wants_clear = false;
        let mut wants_pick = false;
        let mut wants_copy = false;

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.with_layout(Layout::top_down(Align::Center), |ui| {
                ui.add_space(12.0);

                if let Some((_, texture)) = &self.preview {
                    let aspect_ratio = texture.size_vec2().x / texture.size_vec2().y;
                    let width = (PREVIEW_HEIGHT * aspect_ratio).min(ui.available_width() - 16.0);
                    let height = if aspect_ratio > 0.0 { width / aspect_ratio } else { PREVIEW_HEIGHT };
                    let response = ui.image((texture.id(), Vec2::new(width, height)));

                    let button_rect = egui::Rect::from_min_size(
                        response.rect.right_top() + egui::vec2(-CLEAR_BUTTON_SIZE - 4.0, 4.0),
                        egui::vec2(CLEAR_BUTTON_SIZE, CLEAR_BUTTON_SIZE),
                    );
                    let clear_button = egui::Button::new(RichText::new("✕").color(Color32::WHITE))
                        .fill(Color32::from_rgb(200, 40, 40))
                        .rounding(CLEAR_BUTTON_SIZE / 2.0);
                    if ui.put(button_rect, clear_button).on_hover_text("Remove image").clicked() {
                        wants_clear = true;
                    }

                    if let Some(selected) = &self.state.selected_image {
                        ui.label(RichText::new(&selected.name).small().color(Color32::GRAY));
                    }
                } else {
                    ui.add_space(PREVIEW_HEIGHT / 2.0);
                    ui.label(RichText::new("No image selected").color(Color32::GRAY));
                    ui.add_space(PREVIEW_HEIGHT / 2.0);
                }

                ui.add_space(8.0);
                if ui
                    .add_sized(
                        [56.0, 36.0],
                        egui::Button::new(RichText::new("📷").size(20.0))
                            .fill(Color32::from_rgb(42, 90, 170))
                            .rounding(8.0),
                    )
                    .on_hover_text("Choose a photo")
                    .clicked()
                {
                    wants_pick = true;
                }
                ui.add_space(8.0);

                if self.state.is_classifying() {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label(format!("Classifying with {}...", self.model_name));
                    });
                }

                if !self.state.classification.is_empty() {
                    ui.label(RichText::new(&self.state.classification).strong());
                    ui.horizontal(|ui| {
                        if let Some(at) = self.state.classified_at {
                            ui.label(
                                RichText::new(at.format("%H:%M:%S").to_string())
                                    .small()
                                    .color(Color32::from_rgb(130, 130, 130)),
                            );
                        }
                        if ui.small_button("📋 Copy").clicked() {
                            wants_copy = true;
                        }
                    });
                }
            });
        });

        if wants_clear {
            self.dispatch(Event::ClearRequested);
        }
        if wants_copy {
            self.copy_result_to_clipboard();
        }
        if wants_pick {
            self.open_picker();
        }
    }
}

/// Texture size for a `width`x`height` image so that neither side exceeds `max_side`.
/// Keeps the aspect ratio and never returns a zero side.
fn preview_size(width: u32, height: u32, max_side: u32) -> (u32, u32) {
    let max_side = max_side.max(1);
    let longest = width.max(height);
    if longest <= max_side {
        return (width, height);
    }
    let scale = max_side as f64 / longest as f64;
    let scaled = |side: u32| ((side as f64 * scale).round() as u32).clamp(1, max_side);
    (scaled(width), scaled(height))
}

pub fn run_gui(settings: Settings) -> Result<()> {
    info!(
        "SnapClassify GUI starting up with model {} at {}",
        settings.model_name, settings.ollama_url
    );

    let native_options = eframe::NativeOptions {
        initial_window_size: Some(egui::vec2(WINDOW_WIDTH, WINDOW_HEIGHT)),
        ..eframe::NativeOptions::default()
    };

    eframe::run_native(
        "SnapClassify",
        native_options,
        Box::new(move |cc| Box::new(ClassifyApp::new(cc.egui_ctx.clone(), settings))),
    )
    .map_err(|e| anyhow::anyhow!("Failed to start GUI: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_images_keep_their_size() {
        assert_eq!(preview_size(300, 200, 512), (300, 200));
        assert_eq!(preview_size(512, 512, 512), (512, 512));
    }

    #[test]
    fn panoramas_are_shrunk_below_the_texture_limit() {
        let (w, h) = preview_size(20000, 10, 8192);
        assert_eq!(w, 8192);
        assert_eq!(h, 4);

        let (w, h) = preview_size(20000, 4000, PREVIEW_TEXTURE_SIDE);
        assert_eq!((w, h), (512, 102));
    }

    #[test]
    fn tall_images_scale_by_height() {
        assert_eq!(preview_size(3000, 12000, 512), (128, 512));
    }

    #[test]
    fn thin_side_never_collapses_to_zero() {
        assert_eq!(preview_size(20000, 1, 512), (512, 1));
        assert_eq!(preview_size(20000, 10, 0), (1, 1));
    }

    #[test]
    fn thumbnail_matches_computed_size() {
        let image = image::DynamicImage::ImageRgb8(image::RgbImage::new(20000, 10));
        let (w, h) = preview_size(image.width(), image.height(), PREVIEW_TEXTURE_SIDE);
        let thumb = image.thumbnail_exact(w, h);
        assert_eq!((thumb.width(), thumb.height()), (512, 1));
        assert!(thumb.width() <= PREVIEW_TEXTURE_SIDE && thumb.height() <= PREVIEW_TEXTURE_SIDE);
    }
}
