// SPDX-License-Identifier: GPL-3.0
// iso_builder.rs - Copyright Phillip Potter, 2026, under GPLv3 only.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use log::debug;

use super::{Extent, ExtentKind, FilesystemBuilder};
use crate::{
    config::VolumeIdentifiers,
    error::BuildError,
    geometry::{Area, DATA_SECTOR_SIZE},
};
use gdbuilder_utility::sector_count;
use iso_image::{Region, RegionData};
use records::{
    MAX_IDENTIFIER_LENGTH, VolumeDescriptorFields, directory_record, directory_record_length,
    path_table_record, path_table_record_length, volume_descriptor_set,
};

/// This module contains the lazily-read image produced by the builder.
mod iso_image;

/// This module contains the on-disc record formats.
mod records;

pub use iso_image::IsoImage;

/// Sector of the primary volume descriptor. Everything before it is the system
/// area, which holds the bootstrap.
const VOLUME_DESCRIPTOR_SECTOR: u64 = 16;

/// The descriptor set is the primary volume descriptor plus a terminator.
const VOLUME_DESCRIPTOR_SECTORS: u64 = 2;

/// Index of the root directory in the directory arena.
const ROOT: usize = 0;

const SECTOR: u64 = DATA_SECTOR_SIZE as u64;

/// This struct models one directory of the tree being built.
struct DirectoryNode {

    // ISO identifier (empty for the root).
    identifier: String,

    // Arena index of the parent (the root is its own parent).
    parent: usize,

    modified: DateTime<Utc>,

    // Children, keyed by identifier so they come out sorted.
    subdirectories: BTreeMap<String, usize>,
    files: BTreeMap<String, usize>,
}

/// This struct models one file of the tree being built.
struct FileNode {
    source: PathBuf,
    length: u64,
    modified: DateTime<Utc>,
}

/// A child of a directory, as it appears in the directory's records.
enum DirectoryEntry {
    Directory(usize),
    File(usize),
}

/// This struct builds a minimal ISO9660 image for one area. Addresses recorded in
/// the image are absolute disc LBAs, while the stream itself starts at the first
/// sector of the area.
pub struct IsoBuilder {

    // First LBA of the area, and one past its last.
    lba_offset: u32,
    end_sector: u32,

    volume: VolumeIdentifiers,

    // Directory arena, with the root at index 0.
    directories: Vec<DirectoryNode>,

    files: Vec<FileNode>,

    // Index of the file placed last, and its absolute start sector.
    last_file: Option<(usize, u32)>,
}

impl IsoBuilder {

    /// Creates a builder for the specified area.
    pub fn new(area: Area, volume: &VolumeIdentifiers) -> Self {
        IsoBuilder {
            lba_offset: area.lba_start(),
            end_sector: area.lba_end(),
            volume: volume.clone(),
            directories: vec![DirectoryNode {
                identifier: String::new(),
                parent: ROOT,
                modified: DateTime::<Utc>::default(),
                subdirectories: BTreeMap::new(),
                files: BTreeMap::new(),
            }],
            files: vec![],
            last_file: None,
        }
    }

    /// Returns the arena index of the directory at the supplied path components,
    /// creating it and any missing parents.
    fn directory_at(&mut self, components: &[String], modified: DateTime<Utc>) -> Result<usize, BuildError> {

        let mut current = ROOT;
        for component in components {
            current = match self.directories[current].subdirectories.get(component) {
                Some(&index) => index,
                None => {
                    check_identifier_length(component)?;
                    let index = self.directories.len();
                    self.directories.push(DirectoryNode {
                        identifier: component.clone(),
                        parent: current,
                        modified,
                        subdirectories: BTreeMap::new(),
                        files: BTreeMap::new(),
                    });
                    self.directories[current].subdirectories.insert(component.clone(), index);
                    index
                },
            };
        }

        Ok(current)
    }

    /// Records a file and returns its index.
    fn insert_file(&mut self, path: &str, source: &Path) -> Result<usize, BuildError> {

        let metadata = fs::metadata(source).map_err(|source_error| BuildError::SourceUnreadable {
            path: source.to_path_buf(),
            source: source_error,
        })?;
        let modified = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_default();

        let mut components = split_path(path);
        let Some(name) = components.pop() else {
            return Err(BuildError::SourceUnreadable {
                path: source.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty virtual path"),
            });
        };
        let directory = self.directory_at(&components, modified)?;

        let identifier = file_identifier(&name);
        check_identifier_length(&identifier)?;
        if self.directories[directory].files.contains_key(&identifier) {
            return Err(BuildError::InvalidOutputRequest(format!(
                "{} clashes with another file named {} once converted to an ISO identifier",
                source.display(),
                identifier
            )));
        }

        let index = self.files.len();
        self.files.push(FileNode {
            source: source.to_path_buf(),
            length: metadata.len(),
            modified,
        });
        self.directories[directory].files.insert(identifier, index);

        Ok(index)
    }

    /// Lists the directories breadth first, children in identifier order. This is
    /// the order of the path tables and of the directory extents.
    fn breadth_first_order(&self) -> Vec<usize> {

        let mut order = vec![ROOT];
        let mut next = 0;
        while next < order.len() {
            let directory = &self.directories[order[next]];
            order.extend(directory.subdirectories.values().copied());
            next += 1;
        }

        order
    }

    /// Lists the children of a directory, sorted by identifier.
    fn entries(&self, directory: usize) -> Vec<(String, DirectoryEntry)> {

        let node = &self.directories[directory];
        let mut entries: Vec<(String, DirectoryEntry)> = node
            .subdirectories
            .iter()
            .map(|(identifier, &index)| (identifier.clone(), DirectoryEntry::Directory(index)))
            .chain(
                node.files
                    .iter()
                    .map(|(identifier, &index)| (identifier.clone(), DirectoryEntry::File(index)))
            )
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        entries
    }

    /// Returns the size in bytes of a directory's extent. Records never straddle a
    /// sector boundary.
    fn directory_size(&self, directory: usize) -> u64 {

        // The '.' and '..' records come first, with single byte identifiers.
        let entries = self.entries(directory);
        let lengths = [1, 1]
            .into_iter()
            .chain(entries.iter().map(|(identifier, _)| identifier.len()))
            .map(directory_record_length);

        let mut size = 0_u64;
        for length in lengths {
            let length = length as u64;
            if size % SECTOR + length > SECTOR {
                size = size.next_multiple_of(SECTOR);
            }
            size += length;
        }

        size.next_multiple_of(SECTOR)
    }

    /// Newest timestamp in the tree, used as the volume creation date so the same
    /// inputs always produce the same image.
    fn newest_timestamp(&self) -> DateTime<Utc> {

        let directories = self.directories.iter().map(|directory| directory.modified);
        let files = self.files.iter().map(|file| file.modified);

        directories.chain(files).max().unwrap_or_default()
    }
}

impl FilesystemBuilder for IsoBuilder {

    type Image = IsoImage;

    fn add_directory(&mut self, path: &str, modified: DateTime<Utc>) -> Result<(), BuildError> {

        let components = split_path(path);
        let directory = self.directory_at(&components, modified)?;
        self.directories[directory].modified = modified;

        Ok(())
    }

    fn add_file(&mut self, path: &str, source: &Path) -> Result<(), BuildError> {
        self.insert_file(path, source).map(|_| ())
    }

    fn add_last_file(&mut self, path: &str, source: &Path, start_sector: u32) -> Result<(), BuildError> {
        let index = self.insert_file(path, source)?;
        self.last_file = Some((index, start_sector));
        Ok(())
    }

    fn build(self) -> Result<IsoImage, BuildError> {

        let order = self.breadth_first_order();
        let offset = self.lba_offset as u64;

        // Path table directory numbers are 1-based positions in breadth first order.
        let mut directory_numbers = vec![0_u16; self.directories.len()];
        for (position, &directory) in order.iter().enumerate() {
            directory_numbers[directory] = position as u16 + 1;
        }

        let path_table_size: u64 = order
            .iter()
            .map(|&directory| path_table_record_length(self.directories[directory].identifier.len().max(1)) as u64)
            .sum();
        let path_table_sectors = sector_count(path_table_size, SECTOR);

        // Allocate the header structures, in local sectors.
        let mut cursor = VOLUME_DESCRIPTOR_SECTOR + VOLUME_DESCRIPTOR_SECTORS;
        let l_path_table_sector = cursor;
        cursor += path_table_sectors;
        let m_path_table_sector = cursor;
        cursor += path_table_sectors;

        let mut directory_sectors = vec![0_u64; self.directories.len()];
        let mut directory_sizes = vec![0_u64; self.directories.len()];
        for &directory in &order {
            directory_sectors[directory] = cursor;
            directory_sizes[directory] = self.directory_size(directory);
            cursor += directory_sizes[directory] / SECTOR;
        }
        let header_end = cursor;

        // Allocate the files. With a last file, everything is packed so that it
        // starts exactly where requested.
        let last_index = self.last_file.map(|(index, _)| index);
        let mut file_order: Vec<usize> = (0..self.files.len()).filter(|&index| Some(index) != last_index).collect();
        let mut file_cursor = header_end;
        if let Some((index, start_sector)) = self.last_file {

            let other_sectors: u64 = file_order
                .iter()
                .map(|&file| sector_count(self.files[file].length, SECTOR))
                .sum();
            let first_file = start_sector as i64 - offset as i64 - other_sectors as i64;
            if first_file < header_end as i64 {
                return Err(BuildError::InsufficientSpace {
                    available: first_file + offset as i64,
                    required: header_end + offset,
                });
            }

            file_cursor = first_file as u64;
            file_order.push(index);
        }

        let mut file_sectors = vec![0_u64; self.files.len()];
        for &file in &file_order {
            file_sectors[file] = file_cursor;
            file_cursor += sector_count(self.files[file].length, SECTOR);
        }

        debug!(
            "ISO layout: headers end at sector {}, files span {}..{}",
            header_end + offset,
            file_order.first().map_or(file_cursor, |&file| file_sectors[file]) + offset,
            file_cursor + offset
        );

        // Now every address is known, generate the structures.
        let record_for = |entry: &DirectoryEntry, identifier: &[u8]| match *entry {
            DirectoryEntry::Directory(index) => directory_record(
                identifier,
                (directory_sectors[index] + offset) as u32,
                directory_sizes[index] as u32,
                &self.directories[index].modified,
                true
            ),
            DirectoryEntry::File(index) => directory_record(
                identifier,
                (file_sectors[index] + offset) as u32,
                self.files[index].length as u32,
                &self.files[index].modified,
                false
            ),
        };

        let mut regions = vec![];
        let mut extents = vec![];
        let mut push_header = |sector: u64, bytes: Vec<u8>| {
            let length = bytes.len() as u64;
            extents.push(Extent { offset: sector * SECTOR, length, kind: ExtentKind::Header });
            regions.push(Region { offset: sector * SECTOR, length, data: RegionData::Memory(bytes) });
        };

        let root_record = record_for(&DirectoryEntry::Directory(ROOT), &[0]);
        push_header(VOLUME_DESCRIPTOR_SECTOR, volume_descriptor_set(&VolumeDescriptorFields {
            volume_space_size: self.end_sector,
            path_table_size: path_table_size as u32,
            l_path_table_lba: (l_path_table_sector + offset) as u32,
            m_path_table_lba: (m_path_table_sector + offset) as u32,
            root_record: &root_record,
            identifiers: &self.volume,
            created: self.newest_timestamp(),
        }));

        for big_endian in [false, true] {
            let mut table = vec![];
            for &directory in &order {
                let node = &self.directories[directory];
                let identifier: &[u8] = if directory == ROOT { &[0] } else { node.identifier.as_bytes() };
                table.extend(path_table_record(
                    identifier,
                    (directory_sectors[directory] + offset) as u32,
                    directory_numbers[node.parent],
                    big_endian
                ));
            }
            let sector = if big_endian { m_path_table_sector } else { l_path_table_sector };
            push_header(sector, table);
        }

        for &directory in &order {

            let parent = self.directories[directory].parent;
            let mut records = vec![
                record_for(&DirectoryEntry::Directory(directory), &[0]),
                record_for(&DirectoryEntry::Directory(parent), &[1]),
            ];
            for (identifier, entry) in self.entries(directory) {
                records.push(record_for(&entry, identifier.as_bytes()));
            }

            let mut bytes: Vec<u8> = vec![];
            for record in records {
                let used = bytes.len() as u64 % SECTOR;
                if used + record.len() as u64 > SECTOR {
                    bytes.resize((bytes.len() as u64).next_multiple_of(SECTOR) as usize, 0);
                }
                bytes.extend(record);
            }
            bytes.resize(directory_sizes[directory] as usize, 0);

            push_header(directory_sectors[directory], bytes);
        }

        for &file in &file_order {
            let node = &self.files[file];
            if node.length == 0 {
                continue;
            }
            let byte_offset = file_sectors[file] * SECTOR;
            extents.push(Extent { offset: byte_offset, length: node.length, kind: ExtentKind::File });
            regions.push(Region {
                offset: byte_offset,
                length: node.length,
                data: RegionData::File(node.source.clone()),
            });
        }

        let length = header_end.max(file_cursor) * SECTOR;
        Ok(IsoImage::new(regions, extents, length))
    }
}

/// Splits a virtual path on either separator, dropping empty components and
/// converting to upper case.
fn split_path(path: &str) -> Vec<String> {
    path.split(['/', '\\'])
        .filter(|component| !component.is_empty())
        .map(|component| component.to_ascii_uppercase())
        .collect()
}

/// Refuses identifiers too long for a directory record's one byte length field.
fn check_identifier_length(identifier: &str) -> Result<(), BuildError> {
    if identifier.len() > MAX_IDENTIFIER_LENGTH {
        return Err(BuildError::InvalidOutputRequest(format!(
            "the name {} is longer than {} bytes",
            identifier,
            MAX_IDENTIFIER_LENGTH
        )));
    }
    Ok(())
}

/// Turns a file name into its ISO identifier: a mandatory dot and the version
/// suffix.
fn file_identifier(name: &str) -> String {

    let mut identifier = name.to_ascii_uppercase();
    if !identifier.contains('.') {
        identifier.push('.');
    }
    identifier.push_str(";1");

    identifier
}
