// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Crop preset serialization and deserialization.
//!
//! This module handles exporting and importing crop presets in YAML
//! and JSON formats, chosen by file extension.

use crate::models::project::CropPreset;
use anyhow::{bail, Result};
use std::path::Path;

/// Export a preset to YAML format.
pub fn export_yaml(data: &CropPreset, path: &Path) -> Result<()> {
    let yaml = serde_yaml::to_string(data)?;
    std::fs::write(path, yaml)?;
    Ok(())
}

/// Export a preset to JSON format.
pub fn export_json(data: &CropPreset, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(data)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Import a preset from YAML format.
pub fn import_yaml(path: &Path) -> Result<CropPreset> {
    let yaml = std::fs::read_to_string(path)?;
    let data = serde_yaml::from_str(&yaml)?;
    Ok(data)
}

/// Import a preset from JSON format.
pub fn import_json(path: &Path) -> Result<CropPreset> {
    let json = std::fs::read_to_string(path)?;
    let data = serde_json::from_str(&json)?;
    Ok(data)
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase())
}

/// Export to YAML or JSON depending on the extension of `path`.
pub fn export_preset(data: &CropPreset, path: &Path) -> Result<()> {
    match extension(path).as_deref() {
        Some("yaml") | Some("yml") => export_yaml(data, path),
        Some("json") => export_json(data, path),
        other => bail!("Unsupported file extension: {:?}", other),
    }
}

/// Import from YAML or JSON depending on the extension of `path`.
pub fn import_preset(path: &Path) -> Result<CropPreset> {
    match extension(path).as_deref() {
        Some("yaml") | Some("yml") => import_yaml(path),
        Some("json") => import_json(path),
        other => bail!("Unsupported file extension: {:?}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::selection::Roi;

    fn preset() -> CropPreset {
        CropPreset::new("/videos/clip.mov".into(), 1920, 1080, Roi::new(100, 50, 640, 360))
    }

    #[test]
    fn test_yaml_preset_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preset.yml");
        export_preset(&preset(), &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("frame_width: 1920"));
        assert_eq!(import_preset(&path).unwrap(), preset());
    }

    #[test]
    fn test_json_preset_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preset.JSON");
        export_preset(&preset(), &path).unwrap();
        assert_eq!(import_preset(&path).unwrap(), preset());
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preset.toml");
        assert!(export_preset(&preset(), &path).is_err());
        assert!(!path.exists());
    }
}
