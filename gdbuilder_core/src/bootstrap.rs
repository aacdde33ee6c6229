// SPDX-License-Identifier: GPL-3.0
// bootstrap.rs - Copyright Phillip Potter, 2026, under GPLv3 only.

use std::{
    fs,
    path::Path,
};

use super::{
    error::BuildError,
    geometry::TRACK_GAP_SECTORS,
    track::Track,
};

/// Size of a bootstrap blob in bytes.
pub const BOOTSTRAP_SIZE: usize = 0x8000;

/// Offset and length of the boot binary file name field.
const BOOT_BINARY_NAME_OFFSET: usize = 0x60;
const BOOT_BINARY_NAME_LENGTH: usize = 0x0F;

/// Byte offset of the table of contents inside the bootstrap.
pub const TOC_OFFSET: usize = 0x104;

/// Number of track slots in the table of contents (tracks 3 to 99).
pub const TOC_SLOT_COUNT: usize = 97;

/// Size of one table of contents slot: a 24-bit address and a type byte.
pub const TOC_SLOT_SIZE: usize = 4;

/// Address and type written into slots with no track.
pub const ABSENT_ADDRESS: u32 = 0xFFFFFF;
pub const ABSENT_TYPE: u8 = 0xFF;

/// This struct holds the 32 KiB bootstrap blob that occupies the first sixteen
/// sectors of each area. For the high density area it also carries the table of
/// contents the firmware uses to locate every track.
pub struct Bootstrap {

    // The blob itself, always exactly BOOTSTRAP_SIZE bytes.
    data: Box<[u8; BOOTSTRAP_SIZE]>,
}

impl Bootstrap {

    /// Creates a bootstrap from an already loaded blob.
    pub fn new(data: Box<[u8; BOOTSTRAP_SIZE]>) -> Self {
        Bootstrap { data }
    }

    /// Loads a bootstrap from disk, refusing any file that isn't exactly
    /// BOOTSTRAP_SIZE bytes long.
    pub fn load(path: &Path) -> Result<Self, BuildError> {

        let unreadable = |source| BuildError::SourceUnreadable {
            path: path.to_path_buf(),
            source,
        };

        // Check the length before reading, so a wrong (possibly huge) file is
        // never pulled into memory.
        let size = fs::metadata(path).map_err(unreadable)?.len();
        if size != BOOTSTRAP_SIZE as u64 {
            return Err(BuildError::InvalidBootstrapSize {
                path: path.to_path_buf(),
                size,
                expected: BOOTSTRAP_SIZE,
            });
        }

        let bytes = fs::read(path).map_err(unreadable)?;
        let size = bytes.len() as u64;
        let data = bytes.into_boxed_slice().try_into().map_err(|_| BuildError::InvalidBootstrapSize {
            path: path.to_path_buf(),
            size,
            expected: BOOTSTRAP_SIZE,
        })?;

        Ok(Bootstrap { data })
    }

    /// Returns the name of the boot binary, which must be the last file of the
    /// area's filesystem as the firmware loads it by address.
    pub fn boot_binary_name(&self) -> String {

        let field = &self.data[BOOT_BINARY_NAME_OFFSET..BOOT_BINARY_NAME_OFFSET + BOOT_BINARY_NAME_LENGTH];
        let name: String = field
            .iter()
            .map(|&byte| if byte.is_ascii() { byte as char } else { '?' })
            .collect();

        name.trim_end_matches(|c: char| c.is_whitespace() || c == '\0').to_string()
    }

    /// Rewrites the table of contents from the supplied tracks. Slot 0 receives the
    /// first track passed in, and slots without a track receive the absent marker.
    pub fn patch_toc(&mut self, tracks: &[Track]) {

        for slot in 0..TOC_SLOT_COUNT {

            let (address, track_type) = match tracks.get(slot) {
                Some(track) => (
                    track.lba + TRACK_GAP_SECTORS,
                    (track.kind.type_code() << 4) | 0x1,
                ),
                None => (ABSENT_ADDRESS, ABSENT_TYPE),
            };

            let offset = TOC_OFFSET + slot * TOC_SLOT_SIZE;
            self.data[offset] = (address & 0xFF) as u8;
            self.data[offset + 1] = ((address >> 8) & 0xFF) as u8;
            self.data[offset + 2] = ((address >> 16) & 0xFF) as u8;
            self.data[offset + 3] = track_type;
        }
    }

    /// Reads back the address and type stored in a table of contents slot.
    pub fn toc_slot(&self, slot: usize) -> (u32, u8) {

        let offset = TOC_OFFSET + slot * TOC_SLOT_SIZE;
        let address = self.data[offset] as u32
            | (self.data[offset + 1] as u32) << 8
            | (self.data[offset + 2] as u32) << 16;

        (address, self.data[offset + 3])
    }

    /// Returns the raw bytes of the blob.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..]
    }
}
