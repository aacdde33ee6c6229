// SPDX-License-Identifier: GPL-3.0
// config.rs - Copyright Phillip Potter, 2026, under GPLv3 only.

use std::{
    collections::BTreeSet,
    path::{self, Path, PathBuf},
};

use super::{
    error::BuildError,
    geometry::Area,
    layout::is_split,
    track::default_last_track_name,
};

/// Volume identifier used when none is supplied.
pub const DEFAULT_VOLUME_IDENTIFIER: &str = "DREAMCAST";

/// Identifier strings written by the official mastering tools, which some software
/// checks for.
pub const GD_WORKSHOP_DATA_PREPARER: &str = "CPL GDWORKSHOP VERSION 2_7_0F FIRM WARE VERSION 2_7_0C";
pub const GD_WORKSHOP_APPLICATION: &str = "GD WORKSHOP COPYRIGHT CROSS PRODUCTS 1998";

/// Name of the image descriptor inside the output directory, unless overridden.
pub const DEFAULT_DESCRIPTOR_NAME: &str = "disc.gdi";

const DEFAULT_SINGLE_DENSITY_DATA_TRACK: &str = "track01.bin";
const DEFAULT_SINGLE_DENSITY_AUDIO_TRACK: &str = "track02.raw";
const DEFAULT_HIGH_DENSITY_FIRST_TRACK: &str = "track03.bin";

/// The text fields of the primary volume descriptor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VolumeIdentifiers {
    pub volume: String,
    pub system: String,
    pub volume_set: String,
    pub publisher: String,
    pub data_preparer: String,
    pub application: String,
}

impl VolumeIdentifiers {

    /// Creates a set of identifiers with the default volume name and everything
    /// else blank.
    pub fn new() -> Self {
        VolumeIdentifiers {
            volume: DEFAULT_VOLUME_IDENTIFIER.to_string(),
            system: String::new(),
            volume_set: String::new(),
            publisher: String::new(),
            data_preparer: String::new(),
            application: String::new(),
        }
    }

    /// Creates a set of identifiers matching what the official tools write.
    pub fn gd_workshop() -> Self {
        VolumeIdentifiers {
            data_preparer: GD_WORKSHOP_DATA_PREPARER.to_string(),
            application: GD_WORKSHOP_APPLICATION.to_string(),
            ..VolumeIdentifiers::new()
        }
    }
}

/// Inputs and output names of the single density area.
#[derive(Clone, Debug)]
pub struct SingleDensityConfig {
    pub data_directory: PathBuf,
    pub bootstrap: PathBuf,

    // The area holds at most one audio track.
    pub audio_track: Option<PathBuf>,

    pub data_track_name: String,
}

impl SingleDensityConfig {

    /// Creates a config with the conventional track names.
    pub fn new(data_directory: &Path, bootstrap: &Path) -> Self {
        SingleDensityConfig {
            data_directory: data_directory.to_path_buf(),
            bootstrap: bootstrap.to_path_buf(),
            audio_track: Some(PathBuf::from(DEFAULT_SINGLE_DENSITY_AUDIO_TRACK)),
            data_track_name: DEFAULT_SINGLE_DENSITY_DATA_TRACK.to_string(),
        }
    }
}

/// Inputs and output names of the high density area.
#[derive(Clone, Debug)]
pub struct HighDensityConfig {
    pub data_directory: PathBuf,
    pub bootstrap: PathBuf,

    // Audio tracks in disc order.
    pub audio_tracks: Vec<PathBuf>,

    pub first_track_name: String,

    // Only set when the caller asked for a specific name.
    pub last_track_name: Option<String>,
}

impl HighDensityConfig {

    /// Creates a config with the conventional track names.
    pub fn new(data_directory: &Path, bootstrap: &Path, audio_tracks: Vec<PathBuf>) -> Self {
        HighDensityConfig {
            data_directory: data_directory.to_path_buf(),
            bootstrap: bootstrap.to_path_buf(),
            audio_tracks,
            first_track_name: DEFAULT_HIGH_DENSITY_FIRST_TRACK.to_string(),
            last_track_name: None,
        }
    }

    /// Returns the name the second data track gets if the area is split.
    pub fn resolved_last_track_name(&self) -> String {
        self.last_track_name
            .clone()
            .unwrap_or_else(|| default_last_track_name(self.audio_tracks.len()))
    }
}

/// Which areas a build produces.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BuildMode {

    // Both areas, with a freshly generated descriptor.
    Everything,

    // The high density area only, keeping the single density lines of an
    // existing descriptor.
    HighDensityOnly,
}

/// Where the caller asked the data tracks to be written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputRequest {
    Directory(PathBuf),
    SingleFile(PathBuf),
    SplitFiles(PathBuf, PathBuf),
}

impl OutputRequest {

    /// Interprets a list of output paths. One path is a directory if it ends with
    /// a separator or has no extension, and a data track file otherwise. Two paths
    /// are the first and last data track files, and must both have extensions.
    pub fn from_paths(paths: &[PathBuf]) -> Result<Self, BuildError> {
        match paths {
            [] => Err(BuildError::InvalidOutputRequest("no output specified".to_string())),
            [path] if ends_with_separator(path) || path.extension().is_none() => {
                Ok(OutputRequest::Directory(path.clone()))
            },
            [path] => Ok(OutputRequest::SingleFile(path.clone())),
            [first, last] if first.extension().is_some() && last.extension().is_some() => {
                Ok(OutputRequest::SplitFiles(first.clone(), last.clone()))
            },
            [_, _] => Err(BuildError::InvalidOutputRequest(
                "output file names are not valid, both need an extension".to_string()
            )),
            _ => Err(BuildError::InvalidOutputRequest("too many outputs specified".to_string())),
        }
    }
}

/// This struct holds everything a build needs, resolved up front so that no
/// stage has to look anything up elsewhere.
#[derive(Clone, Debug)]
pub struct BuildConfig {
    pub output_directory: PathBuf,
    pub descriptor_path: PathBuf,
    pub single_density: Option<SingleDensityConfig>,
    pub high_density: HighDensityConfig,
    pub volume: VolumeIdentifiers,
    pub raw_mode: bool,
    pub truncate: bool,
}

impl BuildConfig {

    /// Creates a high density only config, applying the output request to the
    /// area's track names. Requests that contradict the audio tracks or the
    /// truncate setting are refused here, before anything touches the disk.
    pub fn new(
        output: OutputRequest,
        mut high_density: HighDensityConfig,
        truncate: bool
    ) -> Result<Self, BuildError> {

        let output_directory = match output {
            OutputRequest::Directory(directory) => directory,
            OutputRequest::SingleFile(file) => {
                if !high_density.audio_tracks.is_empty() {
                    return Err(BuildError::InvalidOutputRequest(
                        "can't output a single track when audio tracks are specified".to_string()
                    ));
                }
                high_density.first_track_name = file_name(&file)?;
                parent_directory(&file)
            },
            OutputRequest::SplitFiles(first, last) => {
                if high_density.audio_tracks.is_empty() && !truncate {
                    return Err(BuildError::InvalidOutputRequest(
                        "two output tracks need audio tracks or truncation to split the data".to_string()
                    ));
                }
                high_density.first_track_name = file_name(&first)?;
                high_density.last_track_name = Some(file_name(&last)?);
                parent_directory(&first)
            },
        };

        Ok(BuildConfig {
            descriptor_path: output_directory.join(DEFAULT_DESCRIPTOR_NAME),
            output_directory,
            single_density: None,
            high_density,
            volume: VolumeIdentifiers::new(),
            raw_mode: false,
            truncate,
        })
    }

    /// Returns the build mode implied by the presence of a single density area.
    pub fn mode(&self) -> BuildMode {
        match self.single_density {
            Some(_) => BuildMode::Everything,
            None => BuildMode::HighDensityOnly,
        }
    }

    /// Returns true if the high density data track will be written as two files.
    pub fn high_density_split(&self) -> bool {
        is_split(
            Area::HighDensity,
            self.high_density.audio_tracks.len(),
            self.truncate,
            self.high_density.last_track_name.is_some()
        )
    }

    /// Lists the data track files this build will overwrite.
    pub fn existing_outputs(&self) -> Vec<PathBuf> {
        self.data_track_names()
            .into_iter()
            .map(|name| self.output_directory.join(name))
            .filter(|path| path.exists())
            .collect()
    }

    /// Checks that no two tracks of the build, data or audio, would be written to
    /// the same file, and that none would overwrite the descriptor. Audio tracks
    /// land in the output directory under their own file names. Nothing is read
    /// from disk.
    pub fn check_track_names(&self) -> Result<(), BuildError> {

        let audio_tracks = self
            .single_density
            .iter()
            .filter_map(|single_density| single_density.audio_track.as_ref())
            .chain(&self.high_density.audio_tracks)
            .filter_map(|path| path.file_name())
            .map(|name| name.to_string_lossy().into_owned());

        let mut seen = BTreeSet::new();
        for name in self.data_track_names().into_iter().chain(audio_tracks) {
            if self.output_directory.join(&name) == self.descriptor_path {
                return Err(BuildError::InvalidOutputRequest(format!(
                    "track {} would overwrite the image descriptor",
                    name
                )));
            }
            if !seen.insert(name.clone()) {
                return Err(BuildError::InvalidOutputRequest(format!(
                    "more than one track would be written to {}",
                    name
                )));
            }
        }

        Ok(())
    }

    /// Names of the data track files, in disc order.
    fn data_track_names(&self) -> Vec<String> {

        let mut names = vec![];
        if let Some(single_density) = &self.single_density {
            names.push(single_density.data_track_name.clone());
        }
        names.push(self.high_density.first_track_name.clone());
        if self.high_density_split() {
            names.push(self.high_density.resolved_last_track_name());
        }

        names
    }
}

fn ends_with_separator(path: &Path) -> bool {
    path.as_os_str()
        .to_string_lossy()
        .chars()
        .next_back()
        .is_some_and(path::is_separator)
}

fn file_name(path: &Path) -> Result<String, BuildError> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| BuildError::InvalidOutputRequest(format!("{} is not a file name", path.display())))
}

fn parent_directory(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
