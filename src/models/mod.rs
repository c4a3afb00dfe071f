// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Selection geometry, the interactive session, and saved presets.

pub mod project;
pub mod selection;
pub mod session;
