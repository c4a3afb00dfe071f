// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! I/O operations for video streams, presets, and operation logs.

pub mod ffmpeg;
pub mod media;
#[cfg(feature = "video-opencv")]
pub mod opencv_backend;
pub mod oplog;
pub mod serialization;
