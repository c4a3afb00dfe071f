// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Saved crop selections.
//!
//! A preset records the ROI chosen on one video together with the frame
//! size it was chosen on, so it can be reapplied to another video of the
//! same size.

use super::selection::{Rectangle, Roi};
use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

/// Complete preset data for serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropPreset {
    pub media_file: String,
    pub frame_width: u32,
    pub frame_height: u32,
    pub roi: Roi,
}

impl CropPreset {
    /// Create a preset for `roi` on a `frame_width` x `frame_height` video.
    pub fn new(media_file: String, frame_width: u32, frame_height: u32, roi: Roi) -> Self {
        Self {
            media_file,
            frame_width,
            frame_height,
            roi,
        }
    }

    /// Selection rectangle for a video of the given size.
    pub fn rectangle_for(&self, frame_width: u32, frame_height: u32) -> Result<Rectangle> {
        ensure!(
            (self.frame_width, self.frame_height) == (frame_width, frame_height),
            "preset was made for a {}x{} video, this one is {}x{}",
            self.frame_width,
            self.frame_height,
            frame_width,
            frame_height
        );
        ensure!(
            self.roi.fits_within(frame_width, frame_height),
            "preset region does not fit inside the frame"
        );
        let Roi {
            x,
            y,
            width,
            height,
        } = self.roi;
        Ok(Rectangle::from_corners(
            x as i32,
            y as i32,
            (x + width) as i32,
            (y + height) as i32,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangle_for_matching_frame() {
        let preset = CropPreset::new("a.mp4".into(), 640, 480, Roi::new(10, 20, 100, 50));
        let rect = preset.rectangle_for(640, 480).unwrap();
        assert_eq!(rect, Rectangle::from_corners(10, 20, 110, 70));
        assert_eq!(Roi::from_rect(&rect), preset.roi);
    }

    #[test]
    fn test_rectangle_for_other_frame_size() {
        let preset = CropPreset::new("a.mp4".into(), 640, 480, Roi::new(10, 20, 100, 50));
        let err = preset.rectangle_for(1280, 720).unwrap_err();
        assert!(err.to_string().contains("640x480"));
    }

    #[test]
    fn test_rectangle_for_out_of_bounds_roi() {
        let preset = CropPreset::new("a.mp4".into(), 100, 100, Roi::new(90, 0, 20, 20));
        assert!(preset.rectangle_for(100, 100).is_err());
    }
}
