// SPDX-License-Identifier: GPL-3.0
// lib.rs - Copyright Phillip Potter, 2026, under GPLv3 only.

// Crate-wide lines to disable specific lints:

// Configuration objects are built through explicit constructors that set the
// format's well-known defaults, so there will be no derived Default
// implementations unless needed.
#![allow(clippy::new_without_default)]

/// This module contains the fixed disc geometry of the format family.
pub mod geometry;

/// This module contains the error type shared by every build stage.
pub mod error;

/// This module contains the track descriptor record.
pub mod track;

/// This module contains the bootstrap loader and table-of-contents patcher.
pub mod bootstrap;

/// This module contains the logical to raw sector conversion.
pub mod sector;

/// This module contains the filesystem image builder interface, and its default
/// ISO9660 implementation.
pub mod filesystem;

/// This module contains the per-area track layout planner.
pub mod layout;

/// This module contains the sector writer, which drains a filesystem image into
/// track files.
pub mod writer;

/// This module contains the image descriptor (track list) emitter.
pub mod descriptor;

/// This module contains the build configuration types.
pub mod config;

/// This module contains the build orchestrator.
pub mod builder;
