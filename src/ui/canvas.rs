// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Frame display and pointer capture.
//!
//! The canvas shows the session's working frame, scaled to fit, and turns
//! egui drag gestures into selection events in frame pixel coordinates.

use crate::models::session::Event;
use crate::util::geometry::{fit_size, screen_to_frame};

/// Display the working frame and collect pointer events for this UI pass.
pub fn show(
    ui: &mut egui::Ui,
    texture: Option<&egui::TextureHandle>,
    frame_size: Option<(u32, u32)>,
) -> Vec<Event> {
    let mut events = Vec::new();
    // Set background color
    ui.style_mut().visuals.extreme_bg_color = egui::Color32::BLACK;

    let available_size = ui.available_size();

    egui::Frame::canvas(ui.style()).show(ui, |ui| {
        ui.set_min_size(available_size);

        let (Some(texture), Some((frame_width, frame_height))) = (texture, frame_size) else {
            show_welcome(ui);
            return;
        };

        let available = ui.available_size();
        let (display_width, display_height) =
            fit_size(frame_width, frame_height, (available.x, available.y));

        // Center the frame
        let x_offset = (available.x - display_width) / 2.0;
        let y_offset = (available.y - display_height) / 2.0;
        let image_rect = egui::Rect::from_min_size(
            ui.min_rect().min + egui::vec2(x_offset, y_offset),
            egui::vec2(display_width, display_height),
        );

        ui.painter().image(
            texture.id(),
            image_rect,
            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
            egui::Color32::WHITE,
        );

        let response = ui
            .allocate_rect(image_rect, egui::Sense::click_and_drag())
            .on_hover_cursor(egui::CursorIcon::Crosshair);

        let to_frame = |pos: egui::Pos2| {
            screen_to_frame(
                (pos.x, pos.y),
                (image_rect.min.x, image_rect.min.y),
                (display_width, display_height),
                frame_width,
                frame_height,
            )
        };
        let shift = ui.input(|i| i.modifiers.shift);

        if response.drag_started() {
            // The drag is recognised after some movement; start it where the button went down.
            let origin = ui.input(|i| i.pointer.press_origin());
            if let Some(pos) = origin.or_else(|| response.interact_pointer_pos()) {
                let p = to_frame(pos);
                events.push(Event::PointerDown { x: p.x, y: p.y });
            }
        }
        if response.dragged() {
            if let Some(pos) = response.interact_pointer_pos() {
                let p = to_frame(pos);
                events.push(Event::PointerMove {
                    x: p.x,
                    y: p.y,
                    square: shift,
                });
            }
        }
        if response.drag_stopped() {
            events.push(Event::PointerUp);
        }
        if response.clicked() {
            // A click without movement still starts (and ends) a selection.
            if let Some(pos) = response.interact_pointer_pos() {
                let p = to_frame(pos);
                events.push(Event::PointerDown { x: p.x, y: p.y });
                events.push(Event::PointerUp);
            }
        }
    });

    events
}

fn show_welcome(ui: &mut egui::Ui) {
    let green = egui::Color32::from_rgb(0x33, 0xFF, 0x33);
    ui.centered_and_justified(|ui| {
        ui.vertical_centered(|ui| {
            ui.add_space(20.0);
            ui.label(
                egui::RichText::new(LOGO)
                    .monospace()
                    .color(green),
            );
            ui.add_space(20.0);
            ui.label(
                egui::RichText::new("Select a video to choose a crop region")
                    .color(egui::Color32::from_gray(180)),
            );
            ui.add_space(10.0);
            ui.label(
                egui::RichText::new("drag: select  ·  shift: square  ·  c: crop  ·  r: reset  ·  esc: close")
                    .weak()
                    .color(egui::Color32::from_gray(130)),
            );
        });
    });
}

const LOGO: &str = r"  _____ _____ ____   _____
 / ___// ___// __ \ / ___/
/ /__ / /   / /_/ // /
\___//_/   / .___//_/
          /_/";
