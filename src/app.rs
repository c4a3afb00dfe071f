// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Main application state and egui App implementation.
//!
//! This module contains the main application structure that implements
//! the egui::App trait. It owns the selection session, loads videos and
//! runs crops on background threads, and routes canvas input into the
//! session's event dispatcher.

use crate::config::Settings;
use crate::crop::{self, CropSummary};
use crate::error::CropError;
use crate::io::media::{self, FirstFrame, VIDEO_EXTENSIONS};
use crate::io::{oplog, serialization};
use crate::models::project::CropPreset;
use crate::models::selection::Roi;
use crate::models::session::{CropSession, Event};
use crate::ui::{canvas, properties, toolbar};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::sync::Arc;

/// Result of background video loading.
struct LoadedVideo {
    path: PathBuf,
    first: FirstFrame,
}

/// A crop running on a background thread.
struct CropJob {
    receiver: Receiver<Result<CropSummary, CropError>>,
    cancel: Arc<AtomicBool>,
    output: PathBuf,
}

/// Give a save path the `.mp4` extension when the user typed none.
fn with_default_extension(path: PathBuf) -> PathBuf {
    if path.extension().is_some() {
        path
    } else {
        path.with_extension("mp4")
    }
}

/// Main application state.
pub struct CrprApp {
    settings: Settings,

    /// Selection session for the loaded video
    session: Option<CropSession>,

    /// Persistent square mode toggle
    square_mode: bool,

    /// Working frame texture for display
    frame_texture: Option<egui::TextureHandle>,

    /// Receiver for background first-frame loading
    video_loader: Option<Receiver<Result<LoadedVideo, String>>>,

    /// Loading state message
    loading_message: Option<String>,

    crop_job: Option<CropJob>,

    /// Status line of the last crop, as written to the operation log
    last_status: Option<String>,

    /// Error shown in a modal window until dismissed
    error_message: Option<String>,
}

impl Default for CrprApp {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl CrprApp {
    /// Create a new application instance.
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            session: None,
            square_mode: false,
            frame_texture: None,
            video_loader: None,
            loading_message: None,
            crop_job: None,
            last_status: None,
            error_message: None,
        }
    }

    fn is_busy(&self) -> bool {
        self.crop_job.is_some() || self.video_loader.is_some()
    }

    /// Decode the first frame of a video (asynchronously).
    pub fn open_video(&mut self, path: PathBuf) {
        let (sender, receiver) = channel();
        self.video_loader = Some(receiver);
        self.loading_message = Some("Loading video...".to_string());

        if !media::has_video_extension(&path) {
            log::warn!("{} does not have a known video extension", path.display());
        }

        let settings = self.settings.clone();
        std::thread::spawn(move || {
            let result = media::load_first_frame(&path, &settings)
                .map(|first| LoadedVideo {
                    path: path.clone(),
                    first,
                })
                .map_err(|e| {
                    log::error!("Failed to read {}: {}", path.display(), e);
                    "could not read video file".to_string()
                });
            let _ = sender.send(result);
        });
    }

    fn close_video(&mut self) {
        if self.session.take().is_some() {
            log::info!("Closed video session");
        }
        self.frame_texture = None;
    }

    /// Validate the selection and start cropping to a user-chosen file.
    fn confirm_selection(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let roi = match session.confirm() {
            Ok(roi) => roi,
            Err(e) => {
                log::warn!("Selection rejected: {}", e);
                self.error_message = Some(e.to_string());
                return;
            }
        };

        let stem = session
            .video_path()
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "video".to_string());
        let Some(output) = rfd::FileDialog::new()
            .add_filter("MP4 files", &["mp4"])
            .set_file_name(format!("{}_cropped.mp4", stem))
            .save_file()
        else {
            return;
        };
        let input = session.video_path().to_path_buf();
        self.start_crop(input, roi, with_default_extension(output));
    }

    fn start_crop(&mut self, input: PathBuf, roi: Roi, output: PathBuf) {
        let (sender, receiver) = channel();
        let cancel = Arc::new(AtomicBool::new(false));
        let settings = self.settings.clone();
        let flag = Arc::clone(&cancel);
        let target = output.clone();

        std::thread::spawn(move || {
            let result = crop::crop_and_log(&input, roi, &target, &settings, Some(&flag));
            let _ = sender.send(result);
        });

        self.crop_job = Some(CropJob {
            receiver,
            cancel,
            output,
        });
    }

    fn poll_background(&mut self) {
        // Check for completed video loading
        if let Some(ref receiver) = self.video_loader {
            if let Ok(result) = receiver.try_recv() {
                self.video_loader = None;
                self.loading_message = None;

                match result {
                    Ok(loaded) => {
                        log::info!(
                            "Loaded {} ({}x{} @ {:.2} fps)",
                            loaded.path.display(),
                            loaded.first.width,
                            loaded.first.height,
                            loaded.first.fps
                        );
                        let mut session =
                            CropSession::new(loaded.path, loaded.first.frame, &self.settings);
                        session.handle_event(Event::SetSquareMode(self.square_mode));
                        self.session = Some(session);
                        self.frame_texture = None;
                    }
                    Err(message) => {
                        self.error_message = Some(message);
                    }
                }
            }
        }

        // Check for a finished crop
        if let Some(job) = self.crop_job.as_ref() {
            let outcome = match job.receiver.try_recv() {
                Ok(result) => Some(result),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => {
                    Some(Err(CropError::Video(crate::error::VideoError::encode(
                        "crop worker stopped unexpectedly",
                    ))))
                }
            };
            if let Some(result) = outcome {
                let output = job.output.clone();
                self.crop_job = None;
                self.finish_crop(&output, result);
            }
        }
    }

    fn finish_crop(&mut self, output: &Path, result: Result<CropSummary, CropError>) {
        match result {
            Ok(summary) => {
                log::info!("Cropped {} frames into {}", summary.frames, output.display());
                self.last_status = Some(format!(
                    "{} ({} frames, {} × {} px)",
                    oplog::STATUS_SUCCESS,
                    summary.frames,
                    summary.width,
                    summary.height
                ));
                self.close_video();
            }
            Err(e) => {
                let status = oplog::error_status(&e);
                self.error_message = Some(status.clone());
                self.last_status = Some(status);
            }
        }
    }

    /// Export the current selection as a preset file.
    fn export_preset(&mut self, path: PathBuf) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let roi = match session.confirm() {
            Ok(roi) => roi,
            Err(e) => {
                self.error_message = Some(e.to_string());
                return;
            }
        };
        let (width, height) = session.frame_size();
        let preset = CropPreset::new(
            session.video_path().to_string_lossy().to_string(),
            width,
            height,
            roi,
        );
        match serialization::export_preset(&preset, &path) {
            Ok(()) => log::info!("Exported preset to {}", path.display()),
            Err(e) => {
                log::error!("Failed to export preset: {}", e);
                self.error_message = Some(format!("Failed to export preset: {}", e));
            }
        }
    }

    /// Apply a preset file to the current session.
    fn import_preset(&mut self, path: PathBuf) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let (width, height) = session.frame_size();
        let result = serialization::import_preset(&path)
            .and_then(|preset| preset.rectangle_for(width, height));
        match result {
            Ok(rect) => {
                session.set_selection(rect);
                log::info!("Imported preset from {}", path.display());
            }
            Err(e) => {
                log::error!("Failed to import preset: {}", e);
                self.error_message = Some(format!("Failed to import preset: {}", e));
            }
        }
    }

    /// Upload the working frame when the session redrew it.
    fn sync_texture(&mut self, ctx: &egui::Context) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !session.take_dirty() && self.frame_texture.is_some() {
            return;
        }
        let frame = session.working_frame();
        let size = [frame.width() as usize, frame.height() as usize];
        let image = egui::ColorImage::from_rgb(size, frame.as_raw());
        match self.frame_texture.as_mut() {
            Some(texture) => texture.set(image, egui::TextureOptions::LINEAR),
            None => {
                self.frame_texture =
                    Some(ctx.load_texture("working_frame", image, egui::TextureOptions::LINEAR));
            }
        }
    }

    fn pick_video(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Video files", &VIDEO_EXTENSIONS)
            .pick_file()
        {
            self.open_video(path);
        }
    }

    fn show_error_window(&mut self, ctx: &egui::Context) {
        let Some(message) = self.error_message.clone() else {
            return;
        };
        egui::Window::new("error")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(message);
                if ui.button("OK").clicked() {
                    self.error_message = None;
                }
            });
    }
}

impl eframe::App for CrprApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_background();

        // Request repaint while background work is running (to update spinner)
        if self.is_busy() {
            ctx.request_repaint();
        }

        // Top menu bar
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui
                        .add_enabled(!self.is_busy(), egui::Button::new("Open Video..."))
                        .clicked()
                    {
                        self.pick_video();
                        ui.close_menu();
                    }
                    ui.separator();
                    let has_session = self.session.is_some();
                    if ui
                        .add_enabled(has_session, egui::Button::new("Import Preset..."))
                        .clicked()
                    {
                        if let Some(path) = rfd::FileDialog::new()
                            .add_filter("Presets", &["yaml", "yml", "json"])
                            .pick_file()
                        {
                            self.import_preset(path);
                        }
                        ui.close_menu();
                    }
                    ui.menu_button("Export Preset", |ui| {
                        if ui
                            .add_enabled(has_session, egui::Button::new("Export as YAML..."))
                            .clicked()
                        {
                            if let Some(path) = rfd::FileDialog::new()
                                .add_filter("YAML", &["yaml", "yml"])
                                .set_file_name("crop_preset.yaml")
                                .save_file()
                            {
                                self.export_preset(path);
                            }
                            ui.close_menu();
                        }
                        if ui
                            .add_enabled(has_session, egui::Button::new("Export as JSON..."))
                            .clicked()
                        {
                            if let Some(path) = rfd::FileDialog::new()
                                .add_filter("JSON", &["json"])
                                .set_file_name("crop_preset.json")
                                .save_file()
                            {
                                self.export_preset(path);
                            }
                            ui.close_menu();
                        }
                    });
                    ui.separator();
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });
            });
        });

        // Toolbar
        let busy = self.is_busy();
        let has_session = self.session.is_some();
        let toolbar_action = egui::TopBottomPanel::top("toolbar")
            .show(ctx, |ui| {
                toolbar::show(ui, &mut self.square_mode, has_session, busy)
            })
            .inner;

        if let Some(session) = self.session.as_mut() {
            if session.square_mode() != self.square_mode {
                session.handle_event(Event::SetSquareMode(self.square_mode));
            }
        }

        match toolbar_action {
            toolbar::ToolbarAction::SelectVideo => self.pick_video(),
            toolbar::ToolbarAction::Confirm => self.confirm_selection(),
            toolbar::ToolbarAction::Reset => {
                if let Some(session) = self.session.as_mut() {
                    session.handle_event(Event::Reset);
                }
            }
            toolbar::ToolbarAction::Cancel => {
                if let Some(job) = self.crop_job.as_ref() {
                    log::info!("Cancelling crop into {}", job.output.display());
                    job.cancel.store(true, Ordering::Relaxed);
                }
            }
            toolbar::ToolbarAction::None => {}
        }

        // Properties panel (right side)
        egui::SidePanel::right("properties")
            .default_width(250.0)
            .show(ctx, |ui| {
                properties::show(ui, self.session.as_ref(), self.last_status.as_deref());
            });

        // Handle keyboard events
        if self.session.is_some() && !self.is_busy() && !ctx.wants_keyboard_input() {
            let (confirm, reset, close) = ctx.input(|i| {
                (
                    i.key_pressed(egui::Key::C),
                    i.key_pressed(egui::Key::R),
                    i.key_pressed(egui::Key::Escape),
                )
            });
            if confirm {
                self.confirm_selection();
            } else if reset {
                if let Some(session) = self.session.as_mut() {
                    session.handle_event(Event::Reset);
                }
            } else if close {
                self.close_video();
            }
        }

        self.sync_texture(ctx);

        // Main canvas (center)
        let frame_size = self.session.as_ref().map(|s| s.frame_size());
        let events = egui::CentralPanel::default()
            .show(ctx, |ui| {
                // Show loading overlay if loading
                if let Some(ref message) = self.loading_message {
                    ui.centered_and_justified(|ui| {
                        ui.vertical_centered(|ui| {
                            ui.add_space(20.0);
                            ui.spinner();
                            ui.add_space(10.0);
                            ui.label(
                                egui::RichText::new(message)
                                    .size(16.0)
                                    .color(egui::Color32::from_gray(200)),
                            );
                        });
                    });
                    Vec::new()
                } else {
                    canvas::show(ui, self.frame_texture.as_ref(), frame_size)
                }
            })
            .inner;

        // Canvas input is ignored while a crop is writing the selection out
        if self.crop_job.is_none() {
            if let Some(session) = self.session.as_mut() {
                for event in events {
                    session.handle_event(event);
                }
            }
        }

        self.show_error_window(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_extension() {
        assert_eq!(
            with_default_extension(PathBuf::from("/tmp/out")),
            PathBuf::from("/tmp/out.mp4")
        );
        assert_eq!(
            with_default_extension(PathBuf::from("/tmp/out.mov")),
            PathBuf::from("/tmp/out.mov")
        );
    }

    #[test]
    fn test_finish_crop_failure_keeps_session_usable() {
        let mut app = CrprApp::default();
        app.session = Some(CropSession::new(
            "clip.mp4",
            image::RgbImage::new(64, 48),
            &Settings::default(),
        ));
        let err = CropError::Video(crate::error::VideoError::encode("disk full"));
        app.finish_crop(Path::new("out.mp4"), Err(err));

        assert!(app.session.is_some());
        assert_eq!(
            app.last_status.as_deref(),
            Some("Error processing video: encode failed: disk full")
        );
        assert!(app.error_message.is_some());
    }

    #[test]
    fn test_finish_crop_success_closes_session() {
        let mut app = CrprApp::default();
        app.session = Some(CropSession::new(
            "clip.mp4",
            image::RgbImage::new(64, 48),
            &Settings::default(),
        ));
        let summary = CropSummary {
            frames: 3,
            width: 50,
            height: 40,
            fps: 25.0,
        };
        app.finish_crop(Path::new("out.mp4"), Ok(summary));

        assert!(app.session.is_none());
        assert!(app
            .last_status
            .as_deref()
            .is_some_and(|s| s.starts_with("cropped successfully")));
    }
}
