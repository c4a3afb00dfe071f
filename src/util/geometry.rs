// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Geometric utility functions.
//!
//! This module provides the transformations between the on-screen image
//! rectangle the canvas draws into and frame pixel coordinates.

use crate::models::selection::Point;

/// Largest size with the frame's aspect ratio that fits in `available`.
pub fn fit_size(frame_width: u32, frame_height: u32, available: (f32, f32)) -> (f32, f32) {
    let (avail_w, avail_h) = available;
    if frame_width == 0 || frame_height == 0 || avail_w <= 0.0 || avail_h <= 0.0 {
        return (0.0, 0.0);
    }
    let frame_aspect = frame_width as f32 / frame_height as f32;
    if frame_aspect > avail_w / avail_h {
        // Frame is wider - fit to width
        (avail_w, avail_w / frame_aspect)
    } else {
        // Frame is taller - fit to height
        (avail_h * frame_aspect, avail_h)
    }
}

/// Convert a screen position to frame pixels, given where the frame is drawn.
///
/// Positions outside the drawn frame map outside `[0, width] x [0, height]`;
/// the selection session does its own clamping.
pub fn screen_to_frame(
    screen: (f32, f32),
    origin: (f32, f32),
    display_size: (f32, f32),
    frame_width: u32,
    frame_height: u32,
) -> Point {
    let scale_x = frame_width as f32 / display_size.0;
    let scale_y = frame_height as f32 / display_size.1;
    Point::new(
        ((screen.0 - origin.0) * scale_x).floor() as i32,
        ((screen.1 - origin.1) * scale_y).floor() as i32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_size_letterboxes() {
        assert_eq!(fit_size(1920, 1080, (960.0, 960.0)), (960.0, 540.0));
        assert_eq!(fit_size(1080, 1920, (960.0, 960.0)), (540.0, 960.0));
        assert_eq!(fit_size(0, 1080, (960.0, 960.0)), (0.0, 0.0));
    }

    #[test]
    fn test_screen_to_frame_scales_and_offsets() {
        let origin = (50.0, 20.0);
        let display = (960.0, 540.0);
        let p = screen_to_frame((530.0, 290.0), origin, display, 1920, 1080);
        assert_eq!(p, Point::new(960, 540));

        let corner = screen_to_frame((1010.0, 560.0), origin, display, 1920, 1080);
        assert_eq!(corner, Point::new(1920, 1080));
    }

    #[test]
    fn test_screen_to_frame_outside_image() {
        let p = screen_to_frame((40.0, 10.0), (50.0, 20.0), (100.0, 100.0), 200, 200);
        assert_eq!(p, Point::new(-20, -20));
    }
}
