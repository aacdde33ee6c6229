// SPDX-License-Identifier: GPL-3.0
// builder.rs - Copyright Phillip Potter, 2026, under GPLv3 only.

use std::{
    fs::{self, File},
    io::{self, BufReader, Write},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use super::{
    bootstrap::Bootstrap,
    config::BuildConfig,
    descriptor::ImageDescriptor,
    error::BuildError,
    filesystem::{FilesystemBuilder, FilesystemImage, iso_builder::IsoBuilder},
    geometry::{Area, DATA_SECTOR_SIZE, RAW_SECTOR_SIZE, TRACK_GAP_SECTORS},
    layout::{AreaLayout, LayoutRequest, plan_area},
    track::Track,
    writer::{SectorWriter, write_track_file},
};
use gdbuilder_utility::{round_up, sector_count};

/// What a finished build produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildReport {
    pub single_density: Vec<Track>,
    pub high_density: Vec<Track>,
    pub descriptor_path: PathBuf,
}

/// The inputs of one area, gathered from whichever area config applies.
struct AreaInputs<'a> {
    area: Area,
    data_directory: &'a Path,
    bootstrap: &'a Path,
    audio_tracks: &'a [PathBuf],
    first_track_name: &'a str,
    last_track_name: Option<&'a str>,
}

/// An audio track source, found and measured but not yet copied.
struct AudioSource {
    path: PathBuf,
    name: String,
    length: u64,
}

/// An area which has been read and planned, with its table of contents patched,
/// and only needs writing out.
struct PlannedArea<I> {
    area: Area,
    bootstrap: Bootstrap,
    image: I,
    layout: AreaLayout,
    audio_sources: Vec<AudioSource>,
}

/// This struct runs a whole build: each area in turn, then the image descriptor.
pub struct GdBuilder {
    config: BuildConfig,
}

impl GdBuilder {

    pub fn new(config: BuildConfig) -> Self {
        GdBuilder { config }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Runs the build with the default ISO9660 filesystem builder. Progress is
    /// reported as a percentage, restarting from zero for each area.
    pub fn execute(&self, progress: &mut dyn FnMut(u32)) -> Result<BuildReport, BuildError> {
        self.execute_with(|area| IsoBuilder::new(area, &self.config.volume), progress)
    }

    /// Runs the build, obtaining a fresh filesystem builder for each area from the
    /// supplied factory. Every area is read and planned before the output
    /// directory is created, so a failed check leaves the disk untouched.
    pub fn execute_with<F, B>(&self, mut factory: F, progress: &mut dyn FnMut(u32)) -> Result<BuildReport, BuildError>
    where
        F: FnMut(Area) -> B,
        B: FilesystemBuilder,
    {
        let config = &self.config;
        config.check_track_names()?;

        let single_density = match &config.single_density {
            Some(single_density) => {
                let audio_tracks: Vec<PathBuf> = single_density.audio_track.iter().cloned().collect();
                let inputs = AreaInputs {
                    area: Area::SingleDensity,
                    data_directory: &single_density.data_directory,
                    bootstrap: &single_density.bootstrap,
                    audio_tracks: &audio_tracks,
                    first_track_name: &single_density.data_track_name,
                    last_track_name: None,
                };
                Some(self.prepare_area(&inputs, factory(Area::SingleDensity))?)
            },
            None => None,
        };

        let high_density = &config.high_density;
        let inputs = AreaInputs {
            area: Area::HighDensity,
            data_directory: &high_density.data_directory,
            bootstrap: &high_density.bootstrap,
            audio_tracks: &high_density.audio_tracks,
            first_track_name: &high_density.first_track_name,
            last_track_name: high_density.last_track_name.as_deref(),
        };
        let high_density = self.prepare_area(&inputs, factory(Area::HighDensity))?;

        for path in config.existing_outputs() {
            warn!("{} already exists and will be overwritten", path.display());
        }

        fs::create_dir_all(&config.output_directory).map_err(|source| BuildError::BuildFailed {
            path: config.output_directory.clone(),
            source,
        })?;

        let single_density = match single_density {
            Some(planned) => self.write_area(planned, progress)?,
            None => vec![],
        };
        let high_density = self.write_area(high_density, progress)?;

        let descriptor = ImageDescriptor::new(single_density.clone(), high_density.clone(), config.raw_mode);
        descriptor.write(config.mode(), &config.descriptor_path)?;
        info!("Wrote image descriptor {}", config.descriptor_path.display());

        Ok(BuildReport {
            single_density,
            high_density,
            descriptor_path: config.descriptor_path.clone(),
        })
    }

    /// Reads one area's inputs and plans it: bootstrap, audio tracks, filesystem,
    /// layout and table of contents. Nothing is written.
    fn prepare_area<B: FilesystemBuilder>(
        &self,
        inputs: &AreaInputs,
        mut filesystem: B
    ) -> Result<PlannedArea<B::Image>, BuildError> {

        let area = inputs.area;
        info!("Reading {} from {}", area.name(), inputs.data_directory.display());

        let mut bootstrap = Bootstrap::load(inputs.bootstrap)?;
        let boot_binary = bootstrap.boot_binary_name();
        debug!("{} boot binary is {}", area.name(), boot_binary);

        let audio_sources = self.find_audio_tracks(inputs.audio_tracks)?;
        let audio_tracks = audio_sources
            .iter()
            .map(|source| Track::audio(&source.name, round_up(source.length, RAW_SECTOR_SIZE as u64)))
            .collect();

        // Only the high density area needs its boot binary at a known address.
        let hint = match area {
            Area::HighDensity => Some(boot_binary.as_str()),
            Area::SingleDensity => None,
        };
        populate_from_directory(&mut filesystem, inputs.data_directory, hint, area)?;
        let image = filesystem.build()?;

        let layout = plan_area(LayoutRequest {
            area,
            extents: image.extents(),
            stream_length: image.len(),
            audio_tracks,
            first_track_name: inputs.first_track_name.to_string(),
            last_track_name: inputs.last_track_name.map(str::to_string),
            truncate: self.config.truncate,
        })?;

        if area == Area::HighDensity {
            bootstrap.patch_toc(&layout.tracks);
        }

        Ok(PlannedArea {
            area,
            bootstrap,
            image,
            layout,
            audio_sources,
        })
    }

    /// Writes a planned area: its audio tracks, then its data track files.
    /// Returns the area's track list.
    fn write_area<I: FilesystemImage>(
        &self,
        planned: PlannedArea<I>,
        progress: &mut dyn FnMut(u32)
    ) -> Result<Vec<Track>, BuildError> {

        let PlannedArea { area, bootstrap, mut image, layout, audio_sources } = planned;
        let output_directory = &self.config.output_directory;
        info!("Building {} in {}", area.name(), output_directory.display());

        for source in &audio_sources {
            let destination = output_directory.join(&source.name);
            if !same_file(&source.path, &destination) {
                info!("Copying audio track {} to {}", source.path.display(), destination.display());
                copy_padded(&source.path, &destination, source.length)?;
            }
        }

        let mut writer = SectorWriter::new(self.config.raw_mode, image.len(), progress);

        let first_track = layout.first_track();
        info!("Writing {} ({} sectors)", first_track.name, first_track.sector_count());
        write_track_file(&output_directory.join(&first_track.name), |destination| {
            writer.write_first_track(&mut image, destination, &bootstrap, first_track)
        })?;

        if let Some(last_track) = layout.last_track() {
            info!("Writing {} ({} sectors)", last_track.name, last_track.sector_count());
            write_track_file(&output_directory.join(&last_track.name), |destination| {
                writer.write_last_track(&mut image, destination, last_track, layout.first_file_start)
            })?;
        }

        Ok(layout.tracks)
    }

    /// Resolves and measures the audio track sources, without copying anything. A
    /// relative path is looked up in the output directory first.
    fn find_audio_tracks(&self, sources: &[PathBuf]) -> Result<Vec<AudioSource>, BuildError> {

        let output_directory = &self.config.output_directory;
        let mut found = Vec::with_capacity(sources.len());

        for source in sources {

            let in_output = output_directory.join(source);
            let path = if in_output.is_file() {
                in_output
            } else if source.is_file() {
                source.clone()
            } else {
                return Err(BuildError::MissingAudioTrack { path: source.clone() });
            };

            let Some(name) = path.file_name().map(|name| name.to_string_lossy().into_owned()) else {
                return Err(BuildError::MissingAudioTrack { path: source.clone() });
            };
            let length = fs::metadata(&path)
                .map_err(|_| BuildError::MissingAudioTrack { path: source.clone() })?
                .len();

            found.push(AudioSource { path, name, length });
        }

        Ok(found)
    }
}

/// Adds the contents of `root` to the filesystem builder. If a boot binary name is
/// given, the matching file at the root is held back and added last, placed so it
/// ends one gap before the end of the area.
fn populate_from_directory<B: FilesystemBuilder>(
    filesystem: &mut B,
    root: &Path,
    boot_binary: Option<&str>,
    area: Area
) -> Result<(), BuildError> {

    filesystem.add_directory("", modified_time(root)?)?;

    let mut boot_file = None;
    add_directory_contents(filesystem, root, "", boot_binary, &mut boot_file)?;

    let Some(name) = boot_binary else {
        return Ok(());
    };
    let Some(source) = boot_file else {
        return Err(BuildError::MissingBootBinary {
            name: name.to_string(),
            directory: root.to_path_buf(),
        });
    };

    let length = fs::metadata(&source).map_err(|error| unreadable(&source, error))?.len();
    let sectors = sector_count(length, DATA_SECTOR_SIZE as u64);
    let start_sector = area.lba_end() as i64 - TRACK_GAP_SECTORS as i64 - sectors as i64;
    if start_sector < area.lba_start() as i64 {
        return Err(BuildError::InsufficientSpace {
            available: start_sector,
            required: area.lba_start() as u64,
        });
    }
    debug!("Placing {} at sector {}", name, start_sector);

    filesystem.add_last_file(name, &source, start_sector as u32)
}

/// Adds the files of a directory, then its subdirectories recursively, each in
/// name order. The boot binary is only looked for at the top level.
fn add_directory_contents<B: FilesystemBuilder>(
    filesystem: &mut B,
    directory: &Path,
    virtual_path: &str,
    boot_binary: Option<&str>,
    boot_file: &mut Option<PathBuf>
) -> Result<(), BuildError> {

    let (files, directories) = sorted_entries(directory)?;

    for (name, path) in files {
        if boot_binary.is_some_and(|boot_binary| name.eq_ignore_ascii_case(boot_binary)) {
            *boot_file = Some(path);
            continue;
        }
        filesystem.add_file(&join_virtual(virtual_path, &name), &path)?;
    }

    for (name, path) in directories {
        let child = join_virtual(virtual_path, &name);
        filesystem.add_directory(&child, modified_time(&path)?)?;
        add_directory_contents(filesystem, &path, &child, None, boot_file)?;
    }

    Ok(())
}

/// Lists the files and the subdirectories of a directory, both sorted by name.
/// Symbolic links are followed.
fn sorted_entries(directory: &Path) -> Result<(Vec<(String, PathBuf)>, Vec<(String, PathBuf)>), BuildError> {

    let mut files = vec![];
    let mut directories = vec![];

    for entry in fs::read_dir(directory).map_err(|error| unreadable(directory, error))? {
        let entry = entry.map_err(|error| unreadable(directory, error))?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        let metadata = fs::metadata(&path).map_err(|error| unreadable(&path, error))?;

        if metadata.is_dir() {
            directories.push((name, path));
        } else if metadata.is_file() {
            files.push((name, path));
        }
    }

    files.sort();
    directories.sort();

    Ok((files, directories))
}

fn join_virtual(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

fn modified_time(path: &Path) -> Result<DateTime<Utc>, BuildError> {
    let metadata = fs::metadata(path).map_err(|error| unreadable(path, error))?;
    Ok(metadata.modified().map(DateTime::<Utc>::from).unwrap_or_default())
}

fn unreadable(path: &Path, source: io::Error) -> BuildError {
    BuildError::SourceUnreadable {
        path: path.to_path_buf(),
        source,
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Copies an audio track, padding it with silence to a whole number of sectors.
fn copy_padded(source: &Path, destination: &Path, length: u64) -> Result<(), BuildError> {

    let file = File::open(source).map_err(|_| BuildError::MissingAudioTrack { path: source.to_path_buf() })?;
    let mut reader = BufReader::new(file);
    let padding = (round_up(length, RAW_SECTOR_SIZE as u64) - length) as usize;

    write_track_file(destination, |writer| {
        io::copy(&mut reader, writer)?;
        writer.write_all(&vec![0_u8; padding])
    })
}

#[cfg(test)]
mod tests;
