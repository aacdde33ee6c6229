// SPDX-License-Identifier: GPL-3.0
// error.rs - Copyright Phillip Potter, 2026, under GPLv3 only.

use std::{
    io,
    path::PathBuf,
};

use thiserror::Error;

/// Every way a build can fail. None of these are retried; the caller gets a single
/// failure with a readable message.
#[derive(Debug, Error)]
pub enum BuildError {

    #[error("wrong bootstrap size for {} ({size} bytes, expected {expected}), possibly the wrong file?", .path.display())]
    InvalidBootstrapSize {
        path: PathBuf,
        size: u64,
        expected: usize,
    },

    #[error("the bootstrap requires the boot file {name}, which was not found in {}", .directory.display())]
    MissingBootBinary {
        name: String,
        directory: PathBuf,
    },

    #[error("audio track {} could not be accessed", .path.display())]
    MissingAudioTrack {
        path: PathBuf,
    },

    #[error("not enough room in the area: content must end by sector {available}, but the filesystem headers end at sector {required}")]
    InsufficientSpace {
        available: i64,
        required: u64,
    },

    #[error("failed writing {}: {source}", .path.display())]
    BuildFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid output request: {0}")]
    InvalidOutputRequest(String),

    #[error("could not read {}: {source}", .path.display())]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
