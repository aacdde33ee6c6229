// SPDX-License-Identifier: GPL-3.0
// writer.rs - Copyright Phillip Potter, 2026, under GPLv3 only.

use std::{
    fs::File,
    io::{self, BufWriter, ErrorKind, Read, Seek, SeekFrom, Write},
    path::Path,
};

use super::{
    bootstrap::{BOOTSTRAP_SIZE, Bootstrap},
    error::BuildError,
    geometry::DATA_SECTOR_SIZE,
    sector::to_raw_mode1,
    track::Track,
};

/// Number of sector writes between two progress calculations.
const PROGRESS_INTERVAL: u32 = 10;

/// This struct turns a running byte count into percentage notifications. It only
/// calculates every few sectors, and only calls back when the percentage has gone
/// up, so the callback sees a strictly increasing sequence.
pub struct ProgressReporter<'a> {
    callback: &'a mut dyn FnMut(u32),
    total_bytes: u64,
    pending_writes: u32,
    last_percent: u32,
}

impl<'a> ProgressReporter<'a> {

    pub fn new(callback: &'a mut dyn FnMut(u32), total_bytes: u64) -> Self {
        ProgressReporter {
            callback,
            total_bytes,
            pending_writes: 0,
            last_percent: 0,
        }
    }

    /// Records one sector write, with `bytes` being the position reached in the
    /// source stream.
    pub fn sector_written(&mut self, bytes: u64) {

        self.pending_writes += 1;
        if self.pending_writes < PROGRESS_INTERVAL {
            return;
        }
        self.pending_writes = 0;

        if self.total_bytes == 0 {
            return;
        }

        let percent = (bytes.saturating_mul(100) / self.total_bytes).min(100) as u32;
        if percent > self.last_percent {
            self.last_percent = percent;
            (self.callback)(percent);
        }
    }
}

/// This struct drains a filesystem stream into the data track files of one area,
/// converting every logical sector to a raw one when asked to.
pub struct SectorWriter<'a> {
    raw_mode: bool,
    progress: ProgressReporter<'a>,

    // Position reached in the source stream, for progress purposes.
    position: u64,
}

impl<'a> SectorWriter<'a> {

    /// Creates a writer for a stream of `total_bytes` bytes. One writer covers
    /// every track of an area, so progress runs from 0 to 100 once per area.
    pub fn new(raw_mode: bool, total_bytes: u64, callback: &'a mut dyn FnMut(u32)) -> Self {
        SectorWriter {
            raw_mode,
            progress: ProgressReporter::new(callback, total_bytes),
            position: 0,
        }
    }

    /// Writes the first (or only) data track: the bootstrap, then the stream from
    /// the end of the system area until the track is full or the stream runs out.
    pub fn write_first_track<S, W>(
        &mut self,
        source: &mut S,
        destination: &mut W,
        bootstrap: &Bootstrap,
        track: &Track
    ) -> io::Result<()>
    where
        S: Read + Seek,
        W: Write,
    {
        let mut lba = track.lba;
        let mut written = 0_u64;
        let mut buffer = [0_u8; DATA_SECTOR_SIZE];

        for chunk in bootstrap.as_bytes().chunks_exact(DATA_SECTOR_SIZE) {
            buffer.copy_from_slice(chunk);
            self.write_sector(destination, &buffer, lba)?;
            self.advance(DATA_SECTOR_SIZE as u64);
            lba += 1;
            written += DATA_SECTOR_SIZE as u64;
        }

        source.seek(SeekFrom::Start(BOOTSTRAP_SIZE as u64))?;
        self.position = BOOTSTRAP_SIZE as u64;

        while written < track.size {
            let read = read_sector(source, &mut buffer)?;
            if read == 0 {
                break;
            }
            self.write_sector(destination, &buffer, lba)?;
            self.advance(read as u64);
            lba += 1;
            written += DATA_SECTOR_SIZE as u64;
        }

        Ok(())
    }

    /// Writes the second data track of a split area: everything from the first
    /// file's sector to the end of the stream.
    pub fn write_last_track<S, W>(
        &mut self,
        source: &mut S,
        destination: &mut W,
        track: &Track,
        first_file_start: u32
    ) -> io::Result<()>
    where
        S: Read + Seek,
        W: Write,
    {
        let mut lba = track.lba;
        let mut buffer = [0_u8; DATA_SECTOR_SIZE];

        self.position = first_file_start as u64 * DATA_SECTOR_SIZE as u64;
        source.seek(SeekFrom::Start(self.position))?;

        loop {
            let read = read_sector(source, &mut buffer)?;
            if read == 0 {
                break;
            }
            self.write_sector(destination, &buffer, lba)?;
            self.advance(read as u64);
            lba += 1;
        }

        Ok(())
    }

    fn write_sector<W: Write>(&mut self, destination: &mut W, sector: &[u8; DATA_SECTOR_SIZE], lba: u32) -> io::Result<()> {
        if self.raw_mode {
            destination.write_all(&to_raw_mode1(sector, lba))
        } else {
            destination.write_all(sector)
        }
    }

    fn advance(&mut self, bytes: u64) {
        self.position += bytes;
        self.progress.sector_written(self.position);
    }
}

/// Fills the buffer with the next sector of the source, zero-padding a short final
/// sector. Returns the number of bytes actually read, zero at the end of the stream.
fn read_sector<S: Read>(source: &mut S, buffer: &mut [u8; DATA_SECTOR_SIZE]) -> io::Result<usize> {

    let mut filled = 0;
    while filled < buffer.len() {
        match source.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(read) => filled += read,
            Err(error) if error.kind() == ErrorKind::Interrupted => continue,
            Err(error) => return Err(error),
        }
    }
    buffer[filled..].fill(0);

    Ok(filled)
}

/// Creates (or truncates) a track file and hands a buffered writer for it to the
/// supplied function. Any I/O failure, including those of the function, is
/// reported against the track file.
pub fn write_track_file<F>(path: &Path, write: F) -> Result<(), BuildError>
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    let failed = |source| BuildError::BuildFailed {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(failed)?;
    let mut writer = BufWriter::new(file);
    write(&mut writer).map_err(failed)?;
    writer.flush().map_err(failed)
}
