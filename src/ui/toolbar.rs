// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Toolbar with the video picker, square mode toggle, and crop controls.

/// Button pressed on the toolbar this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolbarAction {
    None,
    SelectVideo,
    Confirm,
    Reset,
    Cancel,
}

/// Display the toolbar. `square_mode` is edited in place.
pub fn show(
    ui: &mut egui::Ui,
    square_mode: &mut bool,
    has_session: bool,
    busy: bool,
) -> ToolbarAction {
    let mut action = ToolbarAction::None;
    let green = egui::Color32::from_rgb(0x33, 0xFF, 0x33);

    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 8.0;

        let select = egui::Button::new(egui::RichText::new("[SELECT VIDEO]").monospace().color(green));
        if ui.add_enabled(!busy, select).clicked() {
            action = ToolbarAction::SelectVideo;
        }

        let label = if *square_mode {
            "[x] SQUARE MODE"
        } else {
            "[ ] SQUARE MODE"
        };
        if ui
            .selectable_label(*square_mode, egui::RichText::new(label).monospace().color(green))
            .clicked()
        {
            *square_mode = !*square_mode;
        }

        ui.separator();

        if ui
            .add_enabled(has_session && !busy, egui::Button::new("Crop (c)"))
            .clicked()
        {
            action = ToolbarAction::Confirm;
        }
        if ui
            .add_enabled(has_session && !busy, egui::Button::new("Reset (r)"))
            .clicked()
        {
            action = ToolbarAction::Reset;
        }
        if busy {
            ui.separator();
            ui.spinner();
            if ui.button("Cancel").clicked() {
                action = ToolbarAction::Cancel;
            }
        }
    });

    action
}
