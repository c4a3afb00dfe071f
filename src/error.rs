// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Error types for selection validation, video I/O, and cropping.

use std::path::PathBuf;

/// Reasons a selection cannot be confirmed.
///
/// These are raised before any file I/O and are always recoverable: the
/// user can adjust the rectangle and confirm again.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("select a crop region first")]
    NoSelection,

    #[error("selection too small ({width} × {height} px). please select a region of at least {min} × {min} px.")]
    TooSmall { width: u32, height: u32, min: u32 },
}

/// Failures while opening, decoding, or encoding a video stream.
#[derive(Debug, thiserror::Error)]
pub enum VideoError {
    #[error("could not open video {path}: {message}")]
    Open { path: PathBuf, message: String },

    #[error("could not read video metadata for {path}: {message}")]
    Probe { path: PathBuf, message: String },

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("encode failed: {0}")]
    Encode(String),

    #[error("video backend '{0}' is not available in this build")]
    UnsupportedBackend(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl VideoError {
    pub fn open(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Open {
            path: path.into(),
            message: msg.into(),
        }
    }

    pub fn probe(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Probe {
            path: path.into(),
            message: msg.into(),
        }
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }
}

/// Terminal failure of a crop operation.
#[derive(Debug, thiserror::Error)]
pub enum CropError {
    #[error("crop region ({x}, {y}, {width}, {height}) does not fit inside the {frame_width}x{frame_height} source")]
    RoiOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        frame_width: u32,
        frame_height: u32,
    },

    #[error("crop cancelled after {frames} frames")]
    Cancelled { frames: u64 },

    #[error(transparent)]
    Video(#[from] VideoError),
}
