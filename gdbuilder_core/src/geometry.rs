// SPDX-License-Identifier: GPL-3.0
// geometry.rs - Copyright Phillip Potter, 2026, under GPLv3 only.

/// Number of sectors separating two consecutive tracks.
pub const TRACK_GAP_SECTORS: u32 = 150;

/// Size of a logical (cooked) data sector in bytes.
pub const DATA_SECTOR_SIZE: usize = 2048;

/// Size of a physical (raw) sector in bytes.
pub const RAW_SECTOR_SIZE: usize = 2352;

/// Shortest data track a truncated build will produce, in sectors. This is the four
/// second minimum a CD table of contents allows.
pub const MINIMUM_TRACK_SECTORS: u32 = 300;

const SINGLE_DENSITY_AREA_LBA_START: u32 = 0;
const SINGLE_DENSITY_AREA_LBA_END: u32 = 33600;

const HIGH_DENSITY_AREA_LBA_START: u32 = 45000;
const HIGH_DENSITY_AREA_LBA_END: u32 = 549150;

/// The two regions of the disc. Each one has a fixed LBA window.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Area {
    SingleDensity,
    HighDensity,
}

impl Area {

    /// First LBA of the area's window.
    pub fn lba_start(self) -> u32 {
        match self {
            Area::SingleDensity => SINGLE_DENSITY_AREA_LBA_START,
            Area::HighDensity => HIGH_DENSITY_AREA_LBA_START,
        }
    }

    /// LBA one past the end of the area's window.
    pub fn lba_end(self) -> u32 {
        match self {
            Area::SingleDensity => SINGLE_DENSITY_AREA_LBA_END,
            Area::HighDensity => HIGH_DENSITY_AREA_LBA_END,
        }
    }

    /// Length of the window in sectors.
    pub fn sector_count(self) -> u32 {
        self.lba_end() - self.lba_start()
    }

    /// Short name used in log output.
    pub fn name(self) -> &'static str {
        match self {
            Area::SingleDensity => "SDA",
            Area::HighDensity => "HDA",
        }
    }
}
