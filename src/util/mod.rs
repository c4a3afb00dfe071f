// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Coordinate mapping and frame overlay helpers.

pub mod geometry;
pub mod overlay;
