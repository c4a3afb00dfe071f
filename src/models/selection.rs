// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Selection geometry.
//!
//! This module defines the rectangle the user drags over a frame, the
//! eight resize handles derived from it, and the finalized region of
//! interest handed to the crop pipeline. All coordinates are frame pixels.

use serde::{Deserialize, Serialize};

/// A pointer position in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Clamp into `[0, width] x [0, height]`.
    pub fn clamped(self, width: u32, height: u32) -> Self {
        Self {
            x: self.x.clamp(0, width as i32),
            y: self.y.clamp(0, height as i32),
        }
    }
}

/// A selection rectangle stored as the two corners the user dragged between.
///
/// The corners may be in any order; readers go through the normalized
/// accessors, which always satisfy `left <= right` and `top <= bottom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rectangle {
    pub start: Point,
    pub end: Point,
}

impl Rectangle {
    /// A degenerate rectangle with both corners at `p`.
    pub fn at(p: Point) -> Self {
        Self { start: p, end: p }
    }

    pub fn from_corners(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self {
            start: Point::new(x1, y1),
            end: Point::new(x2, y2),
        }
    }

    /// Same rectangle with `start` at the top-left and `end` at the bottom-right.
    pub fn normalized(&self) -> Self {
        Self::from_corners(self.left(), self.top(), self.right(), self.bottom())
    }

    pub fn left(&self) -> i32 {
        self.start.x.min(self.end.x)
    }

    pub fn right(&self) -> i32 {
        self.start.x.max(self.end.x)
    }

    pub fn top(&self) -> i32 {
        self.start.y.min(self.end.y)
    }

    pub fn bottom(&self) -> i32 {
        self.start.y.max(self.end.y)
    }

    pub fn width(&self) -> i32 {
        self.right() - self.left()
    }

    pub fn height(&self) -> i32 {
        self.bottom() - self.top()
    }

    /// Strict interior test; points on the border are outside.
    pub fn contains_strictly(&self, p: Point) -> bool {
        self.left() < p.x && p.x < self.right() && self.top() < p.y && p.y < self.bottom()
    }

    /// Check that the rectangle lies within `[0, width] x [0, height]`.
    pub fn is_within(&self, width: u32, height: u32) -> bool {
        self.left() >= 0
            && self.top() >= 0
            && self.right() <= width as i32
            && self.bottom() <= height as i32
    }
}

/// Whether both sides of `rect` are at least `min_size` pixels long.
pub fn check_minimum_size(rect: &Rectangle, min_size: u32) -> bool {
    let min = min_size as i32;
    rect.width() >= min && rect.height() >= min
}

/// One of the eight resize handles on a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handle {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Top,
    Bottom,
    Left,
    Right,
}

impl Handle {
    /// Hit-test order. Corners are checked before edge midpoints.
    pub const ALL: [Handle; 8] = [
        Handle::TopLeft,
        Handle::TopRight,
        Handle::BottomLeft,
        Handle::BottomRight,
        Handle::Top,
        Handle::Bottom,
        Handle::Left,
        Handle::Right,
    ];

    /// Where this handle sits on `rect`.
    pub fn position(self, rect: &Rectangle) -> Point {
        let (x1, y1, x2, y2) = (rect.left(), rect.top(), rect.right(), rect.bottom());
        let mid_x = (x1 + x2).div_euclid(2);
        let mid_y = (y1 + y2).div_euclid(2);
        match self {
            Handle::TopLeft => Point::new(x1, y1),
            Handle::TopRight => Point::new(x2, y1),
            Handle::BottomLeft => Point::new(x1, y2),
            Handle::BottomRight => Point::new(x2, y2),
            Handle::Top => Point::new(mid_x, y1),
            Handle::Bottom => Point::new(mid_x, y2),
            Handle::Left => Point::new(x1, mid_y),
            Handle::Right => Point::new(x2, mid_y),
        }
    }

    /// Chebyshev test: both axis distances must be within `sensitivity`.
    pub fn is_hit(self, rect: &Rectangle, p: Point, sensitivity: i32) -> bool {
        let h = self.position(rect);
        (p.x - h.x).abs() <= sensitivity && (p.y - h.y).abs() <= sensitivity
    }

    pub fn is_corner(self) -> bool {
        matches!(
            self,
            Handle::TopLeft | Handle::TopRight | Handle::BottomLeft | Handle::BottomRight
        )
    }

    pub fn moves_left(self) -> bool {
        matches!(self, Handle::TopLeft | Handle::BottomLeft | Handle::Left)
    }

    pub fn moves_right(self) -> bool {
        matches!(self, Handle::TopRight | Handle::BottomRight | Handle::Right)
    }

    pub fn moves_top(self) -> bool {
        matches!(self, Handle::TopLeft | Handle::TopRight | Handle::Top)
    }

    pub fn moves_bottom(self) -> bool {
        matches!(self, Handle::BottomLeft | Handle::BottomRight | Handle::Bottom)
    }

    pub fn label(self) -> &'static str {
        match self {
            Handle::TopLeft => "top-left",
            Handle::TopRight => "top-right",
            Handle::BottomLeft => "bottom-left",
            Handle::BottomRight => "bottom-right",
            Handle::Top => "top",
            Handle::Bottom => "bottom",
            Handle::Left => "left",
            Handle::Right => "right",
        }
    }
}

/// The finalized crop region handed to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roi {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Roi {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// ROI of a rectangle already clamped into the frame.
    pub fn from_rect(rect: &Rectangle) -> Self {
        let to_u32 = |v: i32| v.max(0) as u32;
        Self::new(
            to_u32(rect.left()),
            to_u32(rect.top()),
            to_u32(rect.width()),
            to_u32(rect.height()),
        )
    }

    /// Width over height to three decimals, or `"N/A"` for zero height.
    pub fn aspect_ratio_label(&self) -> String {
        if self.height == 0 {
            "N/A".to_string()
        } else {
            format!("{:.3}", self.width as f64 / self.height as f64)
        }
    }

    pub fn fits_within(&self, frame_width: u32, frame_height: u32) -> bool {
        self.x
            .checked_add(self.width)
            .is_some_and(|right| right <= frame_width)
            && self
                .y
                .checked_add(self.height)
                .is_some_and(|bottom| bottom <= frame_height)
    }
}
