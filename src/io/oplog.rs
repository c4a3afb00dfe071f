// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Plain-text operation log written next to each cropped video.

use crate::models::selection::Roi;
use anyhow::{Context, Result};
use std::fmt::Display;
use std::path::{Path, PathBuf};

pub const STATUS_SUCCESS: &str = "cropped successfully";

/// Status line for a failed crop.
pub fn error_status(err: &impl Display) -> String {
    format!("Error processing video: {}", err)
}

/// `out.mp4` -> `out_crop.txt`. Paths without an extension get the suffix appended.
pub fn log_path_for(output: &Path) -> PathBuf {
    let base = if output.extension().is_some() {
        output.with_extension("")
    } else {
        output.to_path_buf()
    };
    let mut name = base.into_os_string();
    name.push("_crop.txt");
    PathBuf::from(name)
}

/// Render the log body.
pub fn render(timestamp: &str, roi: &Roi, status: &str) -> String {
    let Roi {
        x,
        y,
        width: w,
        height: h,
    } = *roi;
    format!(
        "crpr:: operation log\n\
         timestamp:: {timestamp}\n\
         status:: {status}\n\
         \n\
         roi crop: ({x}, {y}, {w}, {h})\n\
         --------------------------\n\
         position: ({x}, {y})\n\
         dimensions: {w} × {h} px\n\
         aspect ratio: {ratio}\n",
        ratio = roi.aspect_ratio_label(),
    )
}

/// Write the log for `output` and return where it went.
pub fn write_operation_log(output: &Path, roi: &Roi, status: &str) -> Result<PathBuf> {
    let path = log_path_for(output);
    let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    std::fs::write(&path, render(&timestamp, roi, status))
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}
