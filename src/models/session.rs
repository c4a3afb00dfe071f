// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Interactive selection session.
//!
//! A `CropSession` owns the first frame of a video and the rectangle the
//! user is dragging over it. Pointer and key events are dispatched
//! synchronously through [`CropSession::handle_event`], so the state
//! machine can be driven without a window.

use crate::config::Settings;
use crate::error::SelectionError;
use crate::models::selection::{check_minimum_size, Handle, Point, Rectangle, Roi};
use crate::util::overlay;
use image::RgbImage;
use std::path::{Path, PathBuf};

/// What the current pointer drag is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragMode {
    #[default]
    None,
    Creating,
    /// Translating the selection; `anchor` is the last pointer position.
    Moving { anchor: Point },
    Resizing { handle: Handle },
}

/// Input delivered by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    PointerDown { x: i32, y: i32 },
    /// `square` is the transient modifier (Shift held).
    PointerMove { x: i32, y: i32, square: bool },
    PointerUp,
    Reset,
    SetSquareMode(bool),
}

/// Selection state for one video.
pub struct CropSession {
    video_path: PathBuf,
    frame_width: u32,
    frame_height: u32,
    original: RgbImage,
    working: RgbImage,
    selection: Option<Rectangle>,
    mode: DragMode,
    square_mode: bool,
    min_size: u32,
    sensitivity: i32,
    handle_size: u32,
    dirty: bool,
}

impl CropSession {
    /// Start a session over the first decoded frame of `video_path`.
    pub fn new(video_path: impl Into<PathBuf>, first_frame: RgbImage, settings: &Settings) -> Self {
        let (frame_width, frame_height) = first_frame.dimensions();
        Self {
            video_path: video_path.into(),
            frame_width,
            frame_height,
            working: first_frame.clone(),
            original: first_frame,
            selection: None,
            mode: DragMode::None,
            square_mode: false,
            min_size: settings.min_selection_size,
            sensitivity: settings.handle_sensitivity,
            handle_size: settings.handle_size,
            dirty: true,
        }
    }

    pub fn video_path(&self) -> &Path {
        &self.video_path
    }

    pub fn frame_size(&self) -> (u32, u32) {
        (self.frame_width, self.frame_height)
    }

    pub fn selection(&self) -> Option<Rectangle> {
        self.selection
    }

    pub fn mode(&self) -> DragMode {
        self.mode
    }

    pub fn square_mode(&self) -> bool {
        self.square_mode
    }

    /// The frame with the selection overlay drawn on it.
    pub fn working_frame(&self) -> &RgbImage {
        &self.working
    }

    /// Returns true once after every change to the working frame.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Dispatch one input event.
    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::PointerDown { x, y } => self.pointer_down(Point::new(x, y)),
            Event::PointerMove { x, y, square } => self.pointer_move(Point::new(x, y), square),
            Event::PointerUp => {
                if self.mode != DragMode::None {
                    log::debug!("Drag finished: {:?} -> None", self.mode);
                }
                self.mode = DragMode::None;
            }
            Event::Reset => self.reset(),
            Event::SetSquareMode(on) => self.square_mode = on,
        }
    }

    /// Handle under `(x, y)`, if any. Handles only exist on a valid selection.
    pub fn handle_at(&self, x: i32, y: i32) -> Option<Handle> {
        let rect = self.selection?;
        let p = Point::new(x, y);
        Handle::ALL
            .into_iter()
            .find(|handle| handle.is_hit(&rect, p, self.sensitivity))
    }

    /// Strictly inside the selection and not on a handle.
    pub fn point_in_selection(&self, x: i32, y: i32) -> bool {
        match self.selection {
            Some(rect) => {
                self.handle_at(x, y).is_none() && rect.contains_strictly(Point::new(x, y))
            }
            None => false,
        }
    }

    /// Finalize the selection into an ROI the pipeline can use.
    pub fn confirm(&self) -> Result<Roi, SelectionError> {
        let rect = self.selection.ok_or(SelectionError::NoSelection)?;
        if !check_minimum_size(&rect, self.min_size) {
            return Err(SelectionError::TooSmall {
                width: rect.width().max(0) as u32,
                height: rect.height().max(0) as u32,
                min: self.min_size,
            });
        }
        Ok(Roi::from_rect(&rect))
    }

    /// Replace the selection, e.g. from an imported preset. The rectangle is
    /// clamped into the frame.
    pub fn set_selection(&mut self, rect: Rectangle) {
        let (w, h) = (self.frame_width, self.frame_height);
        self.selection = Some(Rectangle {
            start: rect.start.clamped(w, h),
            end: rect.end.clamped(w, h),
        });
        self.mode = DragMode::None;
        self.redraw();
    }

    fn pointer_down(&mut self, p: Point) {
        if let Some(handle) = self.handle_at(p.x, p.y) {
            // Left/top handles address `start`, right/bottom address `end`.
            self.selection = self.selection.map(|r| r.normalized());
            self.mode = DragMode::Resizing { handle };
            log::debug!("Resizing from {} handle", handle.label());
        } else if self.point_in_selection(p.x, p.y) {
            self.mode = DragMode::Moving { anchor: p };
            log::debug!("Moving selection from ({}, {})", p.x, p.y);
        } else {
            let p = p.clamped(self.frame_width, self.frame_height);
            self.selection = Some(Rectangle::at(p));
            self.mode = DragMode::Creating;
            log::debug!("Creating selection at ({}, {})", p.x, p.y);
            self.redraw();
        }
    }

    fn pointer_move(&mut self, p: Point, square_modifier: bool) {
        let Some(rect) = self.selection else {
            return;
        };
        let square = square_modifier || self.square_mode;
        let updated = match self.mode {
            DragMode::None => return,
            DragMode::Creating => self.create_to(rect, p, square),
            DragMode::Moving { anchor } => {
                self.mode = DragMode::Moving { anchor: p };
                self.move_by(rect, p.x - anchor.x, p.y - anchor.y)
            }
            DragMode::Resizing { handle } => self.resize_to(rect, handle, p, square),
        };
        debug_assert!(updated.is_within(self.frame_width, self.frame_height));
        self.selection = Some(updated);
        self.redraw();
    }

    fn create_to(&self, rect: Rectangle, p: Point, square: bool) -> Rectangle {
        let target = p.clamped(self.frame_width, self.frame_height);
        let end = if square {
            self.square_end(rect.start, target)
        } else {
            target
        };
        Rectangle {
            start: rect.start,
            end,
        }
    }

    /// End point making a square with `start`, sized by the larger pointer
    /// delta and shrunk to the room left in the drag direction.
    fn square_end(&self, start: Point, target: Point) -> Point {
        let (fw, fh) = (self.frame_width as i32, self.frame_height as i32);
        let dx = target.x - start.x;
        let dy = target.y - start.y;
        // A zero delta counts as negative unless the start sits on the
        // leading frame edge.
        let sign = |delta: i32, before: i32| match delta.signum() {
            0 if before == 0 => 1,
            0 => -1,
            s => s,
        };
        let sx = sign(dx, start.x);
        let sy = sign(dy, start.y);
        let room_x = if sx > 0 { fw - start.x } else { start.x };
        let room_y = if sy > 0 { fh - start.y } else { start.y };
        let size = dx.abs().max(dy.abs()).min(room_x).min(room_y);
        Point::new(start.x + sx * size, start.y + sy * size)
    }

    fn move_by(&self, rect: Rectangle, dx: i32, dy: i32) -> Rectangle {
        let (fw, fh) = (self.frame_width as i32, self.frame_height as i32);
        let (w, h) = (rect.width(), rect.height());
        // Slide flush against whichever bound the translation would cross.
        let x1 = (rect.left() + dx).min(fw - w).max(0);
        let y1 = (rect.top() + dy).min(fh - h).max(0);
        Rectangle::from_corners(x1, y1, x1 + w, y1 + h)
    }

    fn resize_to(&self, rect: Rectangle, handle: Handle, p: Point, square: bool) -> Rectangle {
        let (fw, fh) = (self.frame_width as i32, self.frame_height as i32);
        let p = p.clamped(self.frame_width, self.frame_height);
        let mut r = rect;
        if handle.moves_left() {
            r.start.x = p.x;
        } else if handle.moves_right() {
            r.end.x = p.x;
        }
        if handle.moves_top() {
            r.start.y = p.y;
        } else if handle.moves_bottom() {
            r.end.y = p.y;
        }

        if square && handle.is_corner() {
            let size = r.width().max(r.height());
            // The corner opposite the handle stays put.
            match handle {
                Handle::TopLeft => {
                    let size = size.min(r.end.x).min(r.end.y);
                    r.start.x = r.end.x - size;
                    r.start.y = r.end.y - size;
                }
                Handle::TopRight => {
                    let size = size.min(fw - r.start.x).min(r.end.y);
                    r.end.x = r.start.x + size;
                    r.start.y = r.end.y - size;
                }
                Handle::BottomLeft => {
                    let size = size.min(r.end.x).min(fh - r.start.y);
                    r.start.x = r.end.x - size;
                    r.end.y = r.start.y + size;
                }
                Handle::BottomRight => {
                    let size = size.min(fw - r.start.x).min(fh - r.start.y);
                    r.end.x = r.start.x + size;
                    r.end.y = r.start.y + size;
                }
                _ => {}
            }
        }
        r
    }

    fn reset(&mut self) {
        self.selection = None;
        self.mode = DragMode::None;
        self.working = self.original.clone();
        self.dirty = true;
        log::debug!("Selection reset");
    }

    /// Rebuild the working frame from the original so overlays never stack.
    fn redraw(&mut self) {
        self.working = self.original.clone();
        if let Some(rect) = self.selection {
            overlay::draw_selection(&mut self.working, &rect, self.handle_size);
        }
        self.dirty = true;
    }
}
