// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Application settings.
//!
//! Defaults match the behaviour users expect from the tool; a handful of
//! environment variables can override them at startup.

use crate::io::media::VideoBackend;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Smallest accepted crop width and height, in pixels.
pub const MIN_SELECTION_SIZE: u32 = 10;

/// Per-axis distance within which a pointer grabs a resize handle.
pub const HANDLE_SENSITIVITY: i32 = 10;

/// Edge length of the handle squares drawn on the working frame.
pub const HANDLE_SIZE: u32 = 6;

/// Runtime configuration shared by the session, pipeline, and UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub min_selection_size: u32,
    pub handle_sensitivity: i32,
    pub handle_size: u32,
    pub video_backend: VideoBackend,
    /// Remove the output file when a crop fails part way through.
    pub delete_partial_output: bool,
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            min_selection_size: MIN_SELECTION_SIZE,
            handle_sensitivity: HANDLE_SENSITIVITY,
            handle_size: HANDLE_SIZE,
            video_backend: VideoBackend::default(),
            delete_partial_output: true,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
        }
    }
}

impl Settings {
    /// Defaults with `CRPR_VIDEO_BACKEND`, `CRPR_FFMPEG`, and `CRPR_FFPROBE`
    /// applied on top.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(name) = lookup("CRPR_VIDEO_BACKEND") {
            match name.parse::<VideoBackend>() {
                Ok(backend) => self.video_backend = backend,
                Err(e) => log::warn!("Ignoring CRPR_VIDEO_BACKEND: {}", e),
            }
        }
        if let Some(path) = lookup("CRPR_FFMPEG") {
            self.ffmpeg_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("CRPR_FFPROBE") {
            self.ffprobe_path = PathBuf::from(path);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.min_selection_size, 10);
        assert_eq!(settings.handle_sensitivity, 10);
        assert_eq!(settings.video_backend, VideoBackend::Ffmpeg);
        assert!(settings.delete_partial_output);
    }

    #[test]
    fn test_env_overrides() {
        let settings = Settings::default().with_overrides(|key| match key {
            "CRPR_FFMPEG" => Some("/opt/ffmpeg/bin/ffmpeg".to_string()),
            "CRPR_VIDEO_BACKEND" => Some("not-a-backend".to_string()),
            _ => None,
        });
        assert_eq!(settings.ffmpeg_path, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
        assert_eq!(settings.ffprobe_path, PathBuf::from("ffprobe"));
        // Unknown backend names leave the default in place.
        assert_eq!(settings.video_backend, VideoBackend::Ffmpeg);
    }
}
