// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Selection properties panel.
//!
//! Shows the live crop region in the same `key: value` form the operation
//! log uses, plus the drag state and the outcome of the last crop.

use crate::models::selection::Roi;
use crate::models::session::{CropSession, DragMode};

/// Display the properties panel.
pub fn show(ui: &mut egui::Ui, session: Option<&CropSession>, last_status: Option<&str>) {
    ui.heading("Selection");
    ui.separator();

    match session {
        Some(session) => {
            let file_name = session
                .video_path()
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_default();
            let (width, height) = session.frame_size();
            ui.label(egui::RichText::new(file_name).strong());
            ui.label(format!("frame: {} × {} px", width, height));
            ui.add_space(8.0);

            match session.selection() {
                Some(rect) => {
                    let roi = Roi::from_rect(&rect);
                    egui::Grid::new("roi_grid").num_columns(2).show(ui, |ui| {
                        ui.label("position");
                        ui.monospace(format!("({}, {})", roi.x, roi.y));
                        ui.end_row();
                        ui.label("dimensions");
                        ui.monospace(format!("{} × {} px", roi.width, roi.height));
                        ui.end_row();
                        ui.label("aspect ratio");
                        ui.monospace(roi.aspect_ratio_label());
                        ui.end_row();
                    });
                }
                None => {
                    ui.label(egui::RichText::new("Drag on the frame to select a region").weak());
                }
            }

            ui.add_space(8.0);
            let mode = match session.mode() {
                DragMode::None => "idle".to_string(),
                DragMode::Creating => "creating".to_string(),
                DragMode::Moving { .. } => "moving".to_string(),
                DragMode::Resizing { handle } => format!("resizing ({})", handle.label()),
            };
            ui.label(format!("mode: {}", mode));
        }
        None => {
            ui.label(egui::RichText::new("No video loaded").weak());
        }
    }

    if let Some(status) = last_status {
        ui.add_space(16.0);
        ui.separator();
        ui.label("Last operation");
        ui.label(egui::RichText::new(status).italics());
    }
}
