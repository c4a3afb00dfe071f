// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Streaming crop pipeline.
//!
//! Frames are decoded, sliced to the ROI, and encoded one at a time, so
//! memory use is bounded by a single frame regardless of video length.

use crate::config::Settings;
use crate::error::CropError;
use crate::io::media::{self, FrameSink, FrameSource};
use crate::io::oplog;
use crate::models::selection::Roi;
use image::imageops;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

/// What a finished crop produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropSummary {
    pub frames: u64,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

fn check_bounds(roi: &Roi, frame_width: u32, frame_height: u32) -> Result<(), CropError> {
    if roi.fits_within(frame_width, frame_height) {
        Ok(())
    } else {
        Err(CropError::RoiOutOfBounds {
            x: roi.x,
            y: roi.y,
            width: roi.width,
            height: roi.height,
            frame_width,
            frame_height,
        })
    }
}

fn stream_frames(
    source: &mut dyn FrameSource,
    sink: &mut dyn FrameSink,
    roi: &Roi,
    cancel: Option<&AtomicBool>,
) -> Result<u64, CropError> {
    let mut frames = 0u64;
    loop {
        if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            return Err(CropError::Cancelled { frames });
        }
        let Some(frame) = source.read_frame()? else {
            break;
        };
        check_bounds(roi, frame.width(), frame.height())?;
        let cropped = imageops::crop_imm(&frame, roi.x, roi.y, roi.width, roi.height).to_image();
        sink.write_frame(&cropped)?;
        frames += 1;
    }
    Ok(frames)
}

/// Crop every frame of `source` into `sink`.
///
/// Both streams are closed before returning, whether or not the loop
/// succeeded. The first error wins.
pub fn crop_video(
    source: &mut dyn FrameSource,
    sink: &mut dyn FrameSink,
    roi: Roi,
    cancel: Option<&AtomicBool>,
) -> Result<CropSummary, CropError> {
    let result = check_bounds(&roi, source.width(), source.height())
        .and_then(|()| stream_frames(source, sink, &roi, cancel));
    let source_closed = source.close();
    let sink_closed = sink.close();

    let frames = result?;
    source_closed?;
    sink_closed?;
    Ok(CropSummary {
        frames,
        width: roi.width,
        height: roi.height,
        fps: source.fps(),
    })
}

/// Crop the video at `input` into a new `mp4v` file at `output`.
pub fn crop_file(
    input: &Path,
    roi: Roi,
    output: &Path,
    settings: &Settings,
    cancel: Option<&AtomicBool>,
) -> Result<CropSummary, CropError> {
    let mut source = media::open_source(input, settings)?;
    if let Err(e) = check_bounds(&roi, source.width(), source.height()) {
        let _ = source.close();
        return Err(e);
    }

    let rate = source.frame_rate();
    let mut sink = match media::open_sink(output, roi.width, roi.height, rate, settings) {
        Ok(sink) => sink,
        Err(e) => {
            let _ = source.close();
            remove_partial_output(output, settings);
            return Err(e.into());
        }
    };

    log::info!(
        "Cropping {} -> {} at ({}, {}) {}x{}",
        input.display(),
        output.display(),
        roi.x,
        roi.y,
        roi.width,
        roi.height
    );
    let result = crop_video(source.as_mut(), sink.as_mut(), roi, cancel);
    match &result {
        Ok(summary) => log::info!(
            "Wrote {} frames ({}x{} @ {:.3} fps) to {}",
            summary.frames,
            summary.width,
            summary.height,
            summary.fps,
            output.display()
        ),
        Err(e) => {
            log::error!("Crop of {} failed: {}", input.display(), e);
            remove_partial_output(output, settings);
        }
    }
    result
}

fn remove_partial_output(output: &Path, settings: &Settings) {
    if !settings.delete_partial_output || !output.exists() {
        return;
    }
    match std::fs::remove_file(output) {
        Ok(()) => log::info!("Removed partial output {}", output.display()),
        Err(e) => log::warn!("Could not remove partial output {}: {}", output.display(), e),
    }
}

/// Crop and record the outcome in the `_crop.txt` operation log.
pub fn crop_and_log(
    input: &Path,
    roi: Roi,
    output: &Path,
    settings: &Settings,
    cancel: Option<&AtomicBool>,
) -> Result<CropSummary, CropError> {
    let result = crop_file(input, roi, output, settings, cancel);
    let status = match &result {
        Ok(_) => oplog::STATUS_SUCCESS.to_string(),
        Err(e) => oplog::error_status(e),
    };
    match oplog::write_operation_log(output, &roi, &status) {
        Ok(path) => log::info!("Wrote operation log {}", path.display()),
        Err(e) => log::error!("Failed to write operation log: {}", e),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VideoError;
    use crate::io::ffmpeg::{self, FfmpegSink, FfmpegSource};
    use crate::io::media::FrameRate;
    use image::{Rgb, RgbImage};

    struct MemorySource {
        frames: Vec<RgbImage>,
        width: u32,
        height: u32,
        fps: f64,
        next: usize,
        fail_at: Option<usize>,
        closed: bool,
    }

    impl MemorySource {
        fn new(frames: Vec<RgbImage>, fps: f64) -> Self {
            let (width, height) = frames.first().map(|f| f.dimensions()).unwrap_or((100, 100));
            Self {
                frames,
                width,
                height,
                fps,
                next: 0,
                fail_at: None,
                closed: false,
            }
        }
    }

    impl FrameSource for MemorySource {
        fn width(&self) -> u32 {
            self.width
        }

        fn height(&self) -> u32 {
            self.height
        }

        fn fps(&self) -> f64 {
            self.fps
        }

        fn read_frame(&mut self) -> Result<Option<RgbImage>, VideoError> {
            if self.fail_at == Some(self.next) {
                return Err(VideoError::decode("corrupt packet"));
            }
            let frame = self.frames.get(self.next).cloned();
            self.next += 1;
            Ok(frame)
        }

        fn close(&mut self) -> Result<(), VideoError> {
            self.closed = true;
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemorySink {
        frames: Vec<RgbImage>,
        fail_at: Option<usize>,
        closed: bool,
    }

    impl FrameSink for MemorySink {
        fn write_frame(&mut self, frame: &RgbImage) -> Result<(), VideoError> {
            if self.fail_at == Some(self.frames.len()) {
                return Err(VideoError::encode("disk full"));
            }
            self.frames.push(frame.clone());
            Ok(())
        }

        fn close(&mut self) -> Result<(), VideoError> {
            self.closed = true;
            Ok(())
        }
    }

    fn pattern_frame(index: u8) -> RgbImage {
        RgbImage::from_fn(100, 100, |x, y| Rgb([x as u8, y as u8, index]))
    }

    fn three_frames() -> Vec<RgbImage> {
        (0..3).map(pattern_frame).collect()
    }

    #[test]
    fn test_crop_is_pixel_exact() {
        let mut source = MemorySource::new(three_frames(), 25.0);
        let mut sink = MemorySink::default();
        let summary = crop_video(&mut source, &mut sink, Roi::new(10, 10, 50, 50), None).unwrap();

        assert_eq!(
            summary,
            CropSummary {
                frames: 3,
                width: 50,
                height: 50,
                fps: 25.0
            }
        );
        assert_eq!(sink.frames.len(), 3);
        for (i, frame) in sink.frames.iter().enumerate() {
            let expected = imageops::crop_imm(&source.frames[i], 10, 10, 50, 50).to_image();
            assert_eq!(frame, &expected);
            assert_eq!(*frame.get_pixel(0, 0), Rgb([10, 10, i as u8]));
            assert_eq!(*frame.get_pixel(49, 49), Rgb([59, 59, i as u8]));
        }
        assert!(source.closed && sink.closed);
    }

    #[test]
    fn test_empty_source_still_closes_streams() {
        let mut source = MemorySource::new(Vec::new(), 30.0);
        let mut sink = MemorySink::default();
        let summary = crop_video(&mut source, &mut sink, Roi::new(0, 0, 20, 20), None).unwrap();
        assert_eq!(summary.frames, 0);
        assert!(source.closed && sink.closed);
    }

    #[test]
    fn test_decode_error_is_not_end_of_stream() {
        let mut source = MemorySource::new(three_frames(), 25.0);
        source.fail_at = Some(2);
        let mut sink = MemorySink::default();
        let err = crop_video(&mut source, &mut sink, Roi::new(0, 0, 50, 50), None).unwrap_err();
        assert!(matches!(err, CropError::Video(VideoError::Decode(_))));
        assert_eq!(sink.frames.len(), 2);
        assert!(source.closed && sink.closed);
    }

    #[test]
    fn test_encode_error_closes_streams() {
        let mut source = MemorySource::new(three_frames(), 25.0);
        let mut sink = MemorySink {
            fail_at: Some(1),
            ..MemorySink::default()
        };
        let err = crop_video(&mut source, &mut sink, Roi::new(0, 0, 50, 50), None).unwrap_err();
        assert!(matches!(err, CropError::Video(VideoError::Encode(_))));
        assert!(source.closed && sink.closed);
    }

    #[test]
    fn test_roi_outside_source_is_rejected() {
        let mut source = MemorySource::new(three_frames(), 25.0);
        let mut sink = MemorySink::default();
        let err = crop_video(&mut source, &mut sink, Roi::new(60, 0, 50, 50), None).unwrap_err();
        assert!(matches!(err, CropError::RoiOutOfBounds { .. }));
        assert_eq!(source.next, 0);
        assert!(sink.frames.is_empty());
        assert!(source.closed && sink.closed);
    }

    #[test]
    fn test_cancellation_stops_between_frames() {
        let mut source = MemorySource::new(three_frames(), 25.0);
        let mut sink = MemorySink::default();
        let cancel = AtomicBool::new(true);
        let err = crop_video(&mut source, &mut sink, Roi::new(0, 0, 50, 50), Some(&cancel))
            .unwrap_err();
        assert!(matches!(err, CropError::Cancelled { frames: 0 }));
        assert!(source.closed && sink.closed);
    }

    #[test]
    fn test_missing_input_creates_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.mp4");
        let result = crop_and_log(
            &dir.path().join("missing.mp4"),
            Roi::new(0, 0, 20, 20),
            &output,
            &Settings::default(),
            None,
        );
        assert!(result.is_err());
        assert!(!output.exists());

        let log = std::fs::read_to_string(dir.path().join("out_crop.txt")).unwrap();
        assert!(log.contains("status:: Error processing video:"));
    }

    /// Round trip through real ffmpeg processes when the binaries exist.
    #[test]
    fn test_ffmpeg_end_to_end() {
        let settings = Settings::default();
        if !ffmpeg::is_available(&settings) {
            eprintln!("skipping: ffmpeg not available");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("source.mp4");
        let output = dir.path().join("cropped.mp4");

        let mut sink = FfmpegSink::create(&input, 100, 100, FrameRate::new(25, 1), &settings).unwrap();
        for frame in three_frames() {
            sink.write_frame(&frame).unwrap();
        }
        sink.close().unwrap();

        let summary = crop_and_log(&input, Roi::new(10, 10, 50, 50), &output, &settings, None)
            .unwrap();
        assert_eq!(summary.frames, 3);

        let mut cropped = FfmpegSource::open(&output, &settings).unwrap();
        assert_eq!((cropped.width(), cropped.height()), (50, 50));
        assert!((cropped.fps() - 25.0).abs() < 0.01);
        let mut frames = 0;
        while cropped.read_frame().unwrap().is_some() {
            frames += 1;
        }
        assert_eq!(frames, 3);
        assert!(dir.path().join("cropped_crop.txt").exists());
    }
}
