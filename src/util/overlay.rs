// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Selection overlay rendering onto a frame buffer.

use crate::models::selection::{Handle, Rectangle};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

const OUTLINE: Rgb<u8> = Rgb([255, 255, 255]);
const CORNER_HANDLE: Rgb<u8> = Rgb([40, 40, 40]);
const EDGE_HANDLE: Rgb<u8> = Rgb([60, 60, 60]);

/// Draw a 1px outline around `rect` plus a filled square on each handle.
pub fn draw_selection(frame: &mut RgbImage, rect: &Rectangle, handle_size: u32) {
    // Outline covers both border pixels, like an inclusive rectangle.
    let outline = Rect::at(rect.left(), rect.top())
        .of_size(rect.width() as u32 + 1, rect.height() as u32 + 1);
    draw_hollow_rect_mut(frame, outline, OUTLINE);

    let half = (handle_size / 2) as i32;
    for handle in Handle::ALL {
        let p = handle.position(rect);
        let color = if handle.is_corner() {
            CORNER_HANDLE
        } else {
            EDGE_HANDLE
        };
        let square = Rect::at(p.x - half, p.y - half).of_size(handle_size.max(1), handle_size.max(1));
        draw_filled_rect_mut(frame, square, color);
    }
}
