// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! OpenCV-backed video streams (`video-opencv` feature).

use super::media::{FrameSink, FrameSource, OUTPUT_FOURCC};
use crate::error::VideoError;
use image::RgbImage;
use opencv::core::{Mat, Scalar, Size, CV_8UC3};
use opencv::prelude::*;
use opencv::videoio::{self, VideoCapture, VideoWriter};
use std::path::Path;

fn path_str(path: &Path) -> Result<&str, VideoError> {
    path.to_str()
        .ok_or_else(|| VideoError::open(path, "path is not valid UTF-8"))
}

/// OpenCV stores frames as BGR; swap into packed RGB.
fn mat_to_rgb(mat: &Mat) -> Result<RgbImage, VideoError> {
    let err = |e: opencv::Error| VideoError::decode(e.to_string());
    let continuous;
    let mat = if mat.is_continuous() {
        mat
    } else {
        continuous = mat.try_clone().map_err(err)?;
        &continuous
    };
    let (width, height) = (mat.cols() as u32, mat.rows() as u32);
    let bgr = mat.data_bytes().map_err(err)?;
    let rgb = bgr
        .chunks_exact(3)
        .flat_map(|px| [px[2], px[1], px[0]])
        .collect();
    RgbImage::from_raw(width, height, rgb)
        .ok_or_else(|| VideoError::decode("unexpected frame layout"))
}

fn rgb_to_mat(frame: &RgbImage) -> Result<Mat, VideoError> {
    let err = |e: opencv::Error| VideoError::encode(e.to_string());
    let mut mat = Mat::new_rows_cols_with_default(
        frame.height() as i32,
        frame.width() as i32,
        CV_8UC3,
        Scalar::all(0.0),
    )
    .map_err(err)?;
    let dst = mat.data_bytes_mut().map_err(err)?;
    for (out, px) in dst.chunks_exact_mut(3).zip(frame.pixels()) {
        out.copy_from_slice(&[px[2], px[1], px[0]]);
    }
    Ok(mat)
}

pub struct OpenCvSource {
    capture: Option<VideoCapture>,
    width: u32,
    height: u32,
    fps: f64,
}

impl OpenCvSource {
    pub fn open(path: &Path) -> Result<Self, VideoError> {
        let open_err = |e: opencv::Error| VideoError::open(path, e.to_string());
        let capture = VideoCapture::from_file(path_str(path)?, videoio::CAP_ANY).map_err(open_err)?;
        if !capture.is_opened().map_err(open_err)? {
            return Err(VideoError::open(path, "OpenCV could not open the file"));
        }
        let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH).map_err(open_err)? as u32;
        let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT).map_err(open_err)? as u32;
        let fps = capture.get(videoio::CAP_PROP_FPS).map_err(open_err)?;
        Ok(Self {
            capture: Some(capture),
            width,
            height,
            fps,
        })
    }
}

impl FrameSource for OpenCvSource {
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
        let Some(capture) = self.capture.as_mut() else {
            return Ok(None);
        };
        let mut mat = Mat::default();
        let grabbed = capture
            .read(&mut mat)
            .map_err(|e| VideoError::decode(e.to_string()))?;
        if !grabbed || mat.empty() {
            return Ok(None);
        }
        mat_to_rgb(&mat).map(Some)
    }

    fn close(&mut self) -> Result<(), VideoError> {
        if let Some(mut capture) = self.capture.take() {
            capture
                .release()
                .map_err(|e| VideoError::decode(e.to_string()))?;
        }
        Ok(())
    }
}

impl Drop for OpenCvSource {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

pub struct OpenCvSink {
    writer: Option<VideoWriter>,
}

impl OpenCvSink {
    pub fn create(path: &Path, width: u32, height: u32, fps: f64) -> Result<Self, VideoError> {
        let open_err = |e: opencv::Error| VideoError::open(path, e.to_string());
        let [a, b, c, d] = OUTPUT_FOURCC;
        let fourcc = VideoWriter::fourcc(a, b, c, d).map_err(open_err)?;
        let writer = VideoWriter::new(
            path_str(path)?,
            fourcc,
            fps,
            Size::new(width as i32, height as i32),
            true,
        )
        .map_err(open_err)?;
        if !writer.is_opened().map_err(open_err)? {
            return Err(VideoError::open(path, "OpenCV could not create the output file"));
        }
        Ok(Self {
            writer: Some(writer),
        })
    }
}

impl FrameSink for OpenCvSink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<(), VideoError> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| VideoError::encode("encoder already closed"))?;
        let mat = rgb_to_mat(frame)?;
        writer
            .write(&mat)
            .map_err(|e| VideoError::encode(e.to_string()))
    }

    fn close(&mut self) -> Result<(), VideoError> {
        if let Some(mut writer) = self.writer.take() {
            writer
                .release()
                .map_err(|e| VideoError::encode(e.to_string()))?;
        }
        Ok(())
    }
}

impl Drop for OpenCvSink {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
