// SPDX-License-Identifier: GPL-3.0
// filesystem.rs - Copyright Phillip Potter, 2026, under GPLv3 only.

use std::{
    io::{Read, Seek},
    path::Path,
};

use chrono::{DateTime, Utc};

use super::error::BuildError;

/// This module contains the default ISO9660 implementation of the filesystem
/// builder. There may be others in future.
pub mod iso_builder;

/// The kind of structural region an extent covers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExtentKind {

    // Volume descriptors, path tables and directories.
    Header,

    // The data of one file.
    File,
}

/// A contiguous region of a built filesystem image.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Extent {
    pub offset: u64,
    pub length: u64,
    pub kind: ExtentKind,
}

/// This trait provides an implementation-opaque way of turning a source directory
/// tree into a filesystem image for one area.
pub trait FilesystemBuilder {

    type Image: FilesystemImage;

    /// Implementations must record a directory at the virtual path, creating any
    /// missing parents. An empty path refers to the root.
    fn add_directory(&mut self, path: &str, modified: DateTime<Utc>) -> Result<(), BuildError>;

    /// Implementations must record a file at the virtual path, backed by the
    /// supplied source file, and refuse a second file at the same path.
    fn add_file(&mut self, path: &str, source: &Path) -> Result<(), BuildError>;

    /// Implementations must record a file which is laid out after every other file,
    /// beginning at the absolute sector requested.
    fn add_last_file(&mut self, path: &str, source: &Path, start_sector: u32) -> Result<(), BuildError>;

    /// Implementations must lay out everything recorded so far and return the
    /// resulting image.
    fn build(self) -> Result<Self::Image, BuildError>;
}

/// This trait provides access to a built filesystem image: a seekable byte stream of
/// known length, along with the extents it is made of in stream order.
pub trait FilesystemImage: Read + Seek {

    /// Implementations must return the total length of the stream in bytes.
    fn len(&self) -> u64;

    /// Implementations must return the extents of the stream in stream order.
    fn extents(&self) -> &[Extent];

    /// Returns true for an image with no bytes at all.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
