// SPDX-License-Identifier: GPL-3.0
// track.rs - Copyright Phillip Potter, 2026, under GPLv3 only.

use super::geometry::{DATA_SECTOR_SIZE, RAW_SECTOR_SIZE};
use gdbuilder_utility::sector_count;

/// The type of a track. The discriminant is the type code written into both the
/// bootstrap table of contents (as the high nibble) and the image descriptor.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum TrackKind {
    Audio = 0,
    Data = 4,
}

impl TrackKind {

    /// Returns the numeric type code of this kind.
    pub fn type_code(self) -> u8 {
        self as u8
    }

    /// Returns the size of one sector of this kind as stored in its track file.
    pub fn sector_size(self, raw_mode: bool) -> usize {
        match self {
            TrackKind::Audio => RAW_SECTOR_SIZE,
            TrackKind::Data if raw_mode => RAW_SECTOR_SIZE,
            TrackKind::Data => DATA_SECTOR_SIZE,
        }
    }
}

/// This struct describes one physical track on the disc.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Track {

    // File name of the track inside the output directory.
    pub name: String,

    // Size of the track's data region in bytes. Data tracks are counted in
    // logical sectors, audio tracks in raw sectors.
    pub size: u64,

    // Absolute LBA where the track begins.
    pub lba: u32,

    pub kind: TrackKind,
}

impl Track {

    /// Creates an audio track which hasn't been placed yet.
    pub fn audio(name: &str, size: u64) -> Self {
        Track {
            name: name.to_string(),
            size,
            lba: 0,
            kind: TrackKind::Audio,
        }
    }

    /// Creates a data track at the specified LBA.
    pub fn data(name: &str, size: u64, lba: u32) -> Self {
        Track {
            name: name.to_string(),
            size,
            lba,
            kind: TrackKind::Data,
        }
    }

    /// Returns the number of sectors the track occupies on the disc.
    pub fn sector_count(&self) -> u32 {
        let unit = match self.kind {
            TrackKind::Audio => RAW_SECTOR_SIZE,
            TrackKind::Data => DATA_SECTOR_SIZE,
        };
        sector_count(self.size, unit as u64) as u32
    }

    /// Formats this track as one line of the image descriptor.
    pub fn descriptor_line(&self, track_number: usize, raw_mode: bool) -> String {
        format!(
            "{} {} {} {} {} 0",
            track_number,
            self.lba,
            self.kind.type_code(),
            self.kind.sector_size(raw_mode),
            self.name
        )
    }
}

/// Returns the conventional name of the second high density data track, which
/// follows the first data track (track 3) and every audio track.
pub fn default_last_track_name(audio_track_count: usize) -> String {
    format!("track{:02}.bin", audio_track_count + 4)
}
