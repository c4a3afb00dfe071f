// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Video stream access.
//!
//! This module defines the decoder and encoder seams used by the crop
//! pipeline, the backend selector, and first-frame loading for the
//! selection session.

use crate::config::Settings;
use crate::error::VideoError;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Four-character codec written to every output file.
pub const OUTPUT_FOURCC: [char; 4] = ['m', 'p', '4', 'v'];

/// Extensions offered by the open dialog. The decoder has the final say.
pub const VIDEO_EXTENSIONS: [&str; 3] = ["mp4", "avi", "mov"];

/// A frame rate kept as the rational the container reports, e.g. `30000/1001`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRate {
    pub num: u32,
    pub den: u32,
}

impl FrameRate {
    pub fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }

    /// Nearest rational with a 1/1000 denominator, for backends that only
    /// report a float.
    pub fn from_f64(fps: f64) -> Self {
        if fps.fract() == 0.0 {
            Self::new(fps as u32, 1)
        } else {
            Self::new((fps * 1000.0).round() as u32, 1000)
        }
    }

    pub fn as_f64(self) -> f64 {
        if self.den == 0 {
            0.0
        } else {
            self.num as f64 / self.den as f64
        }
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// A sequential frame decoder.
pub trait FrameSource {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn fps(&self) -> f64;

    /// Exact frame rate for the encoder. Backends that only know a float
    /// fall back to an approximation of [`FrameSource::fps`].
    fn frame_rate(&self) -> FrameRate {
        FrameRate::from_f64(self.fps())
    }

    /// Next frame in display order. `Ok(None)` marks the end of the stream.
    fn read_frame(&mut self) -> Result<Option<RgbImage>, VideoError>;

    /// Release the decoder. Dropping a source also releases it, but
    /// without reporting errors.
    fn close(&mut self) -> Result<(), VideoError>;
}

/// A sequential frame encoder.
pub trait FrameSink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<(), VideoError>;

    /// Flush and finalize the container.
    fn close(&mut self) -> Result<(), VideoError>;
}

/// Which library decodes and encodes video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoBackend {
    /// `ffprobe`/`ffmpeg` child processes streaming raw RGB frames.
    #[default]
    Ffmpeg,
    /// OpenCV `VideoCapture`/`VideoWriter` (requires the `video-opencv` feature).
    OpenCv,
}

impl fmt::Display for VideoBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VideoBackend::Ffmpeg => write!(f, "ffmpeg"),
            VideoBackend::OpenCv => write!(f, "opencv"),
        }
    }
}

impl FromStr for VideoBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ffmpeg" => Ok(VideoBackend::Ffmpeg),
            "opencv" => Ok(VideoBackend::OpenCv),
            other => Err(format!("unknown video backend '{}'", other)),
        }
    }
}

/// Open `path` for decoding with the configured backend.
pub fn open_source(path: &Path, settings: &Settings) -> Result<Box<dyn FrameSource>, VideoError> {
    match settings.video_backend {
        VideoBackend::Ffmpeg => Ok(Box::new(super::ffmpeg::FfmpegSource::open(
            path, settings,
        )?)),
        #[cfg(feature = "video-opencv")]
        VideoBackend::OpenCv => Ok(Box::new(super::opencv_backend::OpenCvSource::open(path)?)),
        #[cfg(not(feature = "video-opencv"))]
        VideoBackend::OpenCv => Err(VideoError::UnsupportedBackend(VideoBackend::OpenCv.to_string())),
    }
}

/// Create an `mp4v` encoder writing `width` x `height` frames at `rate`.
pub fn open_sink(
    path: &Path,
    width: u32,
    height: u32,
    rate: FrameRate,
    settings: &Settings,
) -> Result<Box<dyn FrameSink>, VideoError> {
    match settings.video_backend {
        VideoBackend::Ffmpeg => Ok(Box::new(super::ffmpeg::FfmpegSink::create(
            path, width, height, rate, settings,
        )?)),
        #[cfg(feature = "video-opencv")]
        VideoBackend::OpenCv => Ok(Box::new(super::opencv_backend::OpenCvSink::create(
            path,
            width,
            height,
            rate.as_f64(),
        )?)),
        #[cfg(not(feature = "video-opencv"))]
        VideoBackend::OpenCv => Err(VideoError::UnsupportedBackend(VideoBackend::OpenCv.to_string())),
    }
}

/// The first decoded frame of a video and its stream metadata.
pub struct FirstFrame {
    pub frame: RgbImage,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

/// Decode only the first frame of `path`.
pub fn load_first_frame(path: &Path, settings: &Settings) -> Result<FirstFrame, VideoError> {
    let mut source = open_source(path, settings)?;
    let result = source.read_frame();
    if let Err(e) = source.close() {
        log::warn!("Failed to close {}: {}", path.display(), e);
    }
    let frame = result?.ok_or_else(|| VideoError::decode("video contains no frames"))?;

    log::info!(
        "Loaded first frame of {} ({}x{} @ {:.3} fps)",
        path.display(),
        frame.width(),
        frame.height(),
        source.fps()
    );
    Ok(FirstFrame {
        width: frame.width(),
        height: frame.height(),
        fps: source.fps(),
        frame,
    })
}

/// Whether the open dialog would offer `path`.
pub fn has_video_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            VIDEO_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_names_roundtrip() {
        for backend in [VideoBackend::Ffmpeg, VideoBackend::OpenCv] {
            assert_eq!(backend.to_string().parse::<VideoBackend>(), Ok(backend));
        }
        assert_eq!(" OpenCV ".parse::<VideoBackend>(), Ok(VideoBackend::OpenCv));
        assert!("gstreamer".parse::<VideoBackend>().is_err());
    }

    #[test]
    fn test_frame_rate_display_and_fallback() {
        let ntsc = FrameRate::new(30000, 1001);
        assert_eq!(ntsc.to_string(), "30000/1001");
        assert!((ntsc.as_f64() - 29.97).abs() < 0.01);
        assert_eq!(FrameRate::from_f64(25.0), FrameRate::new(25, 1));
        assert_eq!(FrameRate::from_f64(29.97), FrameRate::new(29970, 1000));
        assert_eq!(FrameRate::new(1, 0).as_f64(), 0.0);
    }

    #[test]
    fn test_video_extensions() {
        assert!(has_video_extension(Path::new("clip.MP4")));
        assert!(has_video_extension(Path::new("/tmp/a.mov")));
        assert!(!has_video_extension(Path::new("notes.txt")));
        assert!(!has_video_extension(Path::new("noext")));
    }

    #[cfg(not(feature = "video-opencv"))]
    #[test]
    fn test_opencv_backend_requires_feature() {
        let settings = Settings {
            video_backend: VideoBackend::OpenCv,
            ..Settings::default()
        };
        let err = load_first_frame(Path::new("missing.mp4"), &settings).err().unwrap();
        assert!(matches!(err, VideoError::UnsupportedBackend(_)));
    }

    #[test]
    fn test_missing_file_fails_to_load() {
        let settings = Settings::default();
        assert!(load_first_frame(Path::new("/definitely/not/here.mp4"), &settings).is_err());
    }
}
