// SPDX-License-Identifier: GPL-3.0
// iso_image.rs - Copyright Phillip Potter, 2026, under GPLv3 only.

use std::{
    fs::File,
    io::{self, BufReader, Read, Seek, SeekFrom},
    path::PathBuf,
};

use crate::filesystem::{Extent, FilesystemImage};

/// Where the bytes of a region come from.
pub(super) enum RegionData {

    // Structures generated in memory (descriptors, path tables, directories).
    Memory(Vec<u8>),

    // File data, read from the source file on demand.
    File(PathBuf),
}

/// A run of bytes at a fixed offset of the image. Bytes not covered by any region
/// read as zero.
pub(super) struct Region {
    pub offset: u64,
    pub length: u64,
    pub data: RegionData,
}

/// This struct is a lazily-evaluated ISO9660 image. Only the generated structures
/// live in memory; file contents stay in their source files until read, so an image
/// spanning a whole area costs almost nothing to hold.
pub struct IsoImage {

    // Regions sorted by offset, never overlapping.
    regions: Vec<Region>,

    // Extents in stream order, as reported to the layout planner.
    extents: Vec<Extent>,

    // Total stream length, always a whole number of sectors.
    length: u64,

    // Current read position.
    position: u64,

    // The source file currently open, keyed by region index, so that sequential
    // reads don't reopen it for every sector.
    open_file: Option<(usize, BufReader<File>)>,
}

impl IsoImage {

    /// Creates an image from its regions and extents.
    pub(super) fn new(regions: Vec<Region>, extents: Vec<Extent>, length: u64) -> Self {
        IsoImage {
            regions,
            extents,
            length,
            position: 0,
            open_file: None,
        }
    }

    /// Reads from the file region at `index`, filling with zeros if the source file
    /// turns out to be shorter than it was when the image was laid out.
    fn read_file_region(&mut self, index: usize, buffer: &mut [u8]) -> io::Result<usize> {

        let region = &self.regions[index];
        let RegionData::File(path) = &region.data else {
            return Ok(0);
        };
        let offset_in_region = self.position - region.offset;

        let reopen = !matches!(&self.open_file, Some((open_index, _)) if *open_index == index);
        if reopen {
            self.open_file = Some((index, BufReader::new(File::open(path)?)));
        }

        let Some((_, reader)) = self.open_file.as_mut() else {
            return Ok(0);
        };
        if reader.stream_position()? != offset_in_region {
            reader.seek(SeekFrom::Start(offset_in_region))?;
        }

        let read = reader.read(buffer)?;
        if read == 0 {
            buffer.fill(0);
            return Ok(buffer.len());
        }

        Ok(read)
    }
}

impl Read for IsoImage {

    fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize> {

        if self.position >= self.length || buffer.is_empty() {
            return Ok(0);
        }

        let remaining = (self.length - self.position).min(buffer.len() as u64) as usize;
        let buffer = &mut buffer[..remaining];

        // First region which ends after the current position.
        let index = self.regions.partition_point(|region| region.offset + region.length <= self.position);

        let read = match self.regions.get(index) {

            Some(region) if region.offset <= self.position => {

                let available = (region.offset + region.length - self.position).min(buffer.len() as u64) as usize;
                match &region.data {
                    RegionData::Memory(bytes) => {
                        let start = (self.position - region.offset) as usize;
                        buffer[..available].copy_from_slice(&bytes[start..start + available]);
                        available
                    },
                    RegionData::File(_) => self.read_file_region(index, &mut buffer[..available])?,
                }
            },

            // In a gap: zeros up to the next region or the end of the stream.
            next => {
                let gap_end = next.map_or(self.length, |region| region.offset);
                let available = (gap_end - self.position).min(buffer.len() as u64) as usize;
                buffer[..available].fill(0);
                available
            },
        };

        self.position += read as u64;
        Ok(read)
    }
}

impl Seek for IsoImage {

    fn seek(&mut self, position: SeekFrom) -> io::Result<u64> {

        let target = match position {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(delta) => self.length.checked_add_signed(delta),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
        };

        match target {
            Some(target) => {
                self.position = target;
                Ok(target)
            },
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position"
            )),
        }
    }
}

impl FilesystemImage for IsoImage {

    fn len(&self) -> u64 {
        self.length
    }

    fn extents(&self) -> &[Extent] {
        &self.extents
    }
}
