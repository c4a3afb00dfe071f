// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! crpr - video region-of-interest cropper
//!
//! A desktop tool for selecting a rectangle on the first frame of a video
//! and writing a new video that contains only that region, frame by frame.

mod app;
mod config;
mod crop;
mod error;
mod io;
mod models;
mod ui;
mod util;

use anyhow::Result;
use app::CrprApp;
use config::Settings;
use io::media::VideoBackend;

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    let settings = Settings::from_env();
    log::debug!("Starting with {:?}", settings);
    if settings.video_backend == VideoBackend::Ffmpeg && !io::ffmpeg::is_available(&settings) {
        log::warn!(
            "{} could not be started; videos will fail to open",
            settings.ffmpeg_path.display()
        );
    }

    // Configure egui options
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_min_inner_size([640.0, 480.0])
            .with_title("crpr :: tool"),
        ..Default::default()
    };

    // Run the application
    eframe::run_native(
        "crpr",
        options,
        Box::new(|_cc| Ok(Box::new(CrprApp::new(settings)))),
    )
    .map_err(|e| anyhow::anyhow!("Application error: {}", e))?;

    Ok(())
}
