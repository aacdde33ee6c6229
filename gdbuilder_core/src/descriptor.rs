// SPDX-License-Identifier: GPL-3.0
// descriptor.rs - Copyright Phillip Potter, 2026, under GPLv3 only.

use std::{
    fs,
    path::Path,
};

use log::debug;

use super::{
    config::BuildMode,
    error::BuildError,
    track::Track,
};

/// Number of single density tracks a descriptor always accounts for.
const SINGLE_DENSITY_TRACK_COUNT: usize = 2;

/// Number of the first high density track.
const FIRST_HIGH_DENSITY_TRACK: usize = SINGLE_DENSITY_TRACK_COUNT + 1;

/// This struct holds the final track lists of a build, and renders them as the
/// textual image descriptor: a track count line followed by one line per track.
pub struct ImageDescriptor {
    single_density: Vec<Track>,
    high_density: Vec<Track>,
    raw_mode: bool,
}

impl ImageDescriptor {

    pub fn new(single_density: Vec<Track>, high_density: Vec<Track>, raw_mode: bool) -> Self {
        ImageDescriptor {
            single_density,
            high_density,
            raw_mode,
        }
    }

    /// Renders the descriptor. In high density only mode, the single density lines
    /// of `existing` are carried over verbatim when it has them; in every other
    /// case they are generated from the single density track list.
    pub fn render(&self, mode: BuildMode, existing: Option<&str>) -> String {

        let mut lines = vec![(SINGLE_DENSITY_TRACK_COUNT + self.high_density.len()).to_string()];

        let preserved: Vec<&str> = match (mode, existing) {
            (BuildMode::HighDensityOnly, Some(existing)) => existing.lines().collect(),
            _ => vec![],
        };

        if preserved.len() > SINGLE_DENSITY_TRACK_COUNT {
            lines.extend(preserved[1..=SINGLE_DENSITY_TRACK_COUNT].iter().map(|line| line.to_string()));
        } else if mode == BuildMode::Everything {
            lines.extend(
                self.single_density
                    .iter()
                    .enumerate()
                    .map(|(index, track)| track.descriptor_line(index + 1, self.raw_mode))
            );
        }

        lines.extend(
            self.high_density
                .iter()
                .enumerate()
                .map(|(index, track)| track.descriptor_line(index + FIRST_HIGH_DENSITY_TRACK, self.raw_mode))
        );

        let mut output = lines.join("\n");
        output.push('\n');

        output
    }

    /// Writes the descriptor to `path`. In high density only mode, an existing
    /// file at `path` provides the single density lines.
    pub fn write(&self, mode: BuildMode, path: &Path) -> Result<(), BuildError> {

        let existing = match mode {
            BuildMode::HighDensityOnly if path.is_file() => {
                debug!("Keeping single density lines of {}", path.display());
                Some(fs::read_to_string(path).map_err(|source| BuildError::SourceUnreadable {
                    path: path.to_path_buf(),
                    source,
                })?)
            },
            _ => None,
        };

        fs::write(path, self.render(mode, existing.as_deref())).map_err(|source| BuildError::BuildFailed {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {

    use std::fs;

    use super::ImageDescriptor;
    use crate::{
        config::BuildMode,
        track::Track,
    };

    fn high_density_tracks() -> Vec<Track> {
        vec![
            Track::data("track03.bin", 300 * 2048, 45000),
            Track { lba: 45450, ..Track::audio("track04.raw", 2352 * 750) },
            Track::data("track05.bin", 4150 * 2048, 545000),
        ]
    }

    fn single_density_tracks() -> Vec<Track> {
        vec![
            Track::data("track01.bin", 33024 * 2048, 0),
            Track { lba: 33174, ..Track::audio("track02.raw", 2352 * 426) },
        ]
    }

    #[test]
    fn everything_mode_should_number_from_one() {

        let descriptor = ImageDescriptor::new(single_density_tracks(), high_density_tracks(), false);

        let text = descriptor.render(BuildMode::Everything, None);

        assert_eq!(text, "5\n\
            1 0 4 2048 track01.bin 0\n\
            2 33174 0 2352 track02.raw 0\n\
            3 45000 4 2048 track03.bin 0\n\
            4 45450 0 2352 track04.raw 0\n\
            5 545000 4 2048 track05.bin 0\n");
    }

    #[test]
    fn high_density_only_should_keep_existing_single_density_lines() {

        let descriptor = ImageDescriptor::new(vec![], high_density_tracks(), true);
        let existing = "3\n1 0 4 2352 track01.bin 0\n2 600 0 2352 track02.raw 0\n3 45000 4 2352 old.bin 0\n";

        let text = descriptor.render(BuildMode::HighDensityOnly, Some(existing));

        assert_eq!(text, "5\n\
            1 0 4 2352 track01.bin 0\n\
            2 600 0 2352 track02.raw 0\n\
            3 45000 4 2352 track03.bin 0\n\
            4 45450 0 2352 track04.raw 0\n\
            5 545000 4 2352 track05.bin 0\n");
    }

    #[test]
    fn high_density_only_without_usable_file_should_start_at_three() {

        let descriptor = ImageDescriptor::new(vec![], vec![Track::data("track03.bin", 2048, 45000)], false);

        let fresh = descriptor.render(BuildMode::HighDensityOnly, None);
        let short = descriptor.render(BuildMode::HighDensityOnly, Some("3\n1 0 4 2048 track01.bin 0\n"));

        assert_eq!(fresh, "3\n3 45000 4 2048 track03.bin 0\n");
        assert_eq!(short, fresh);
    }

    #[test]
    fn track_numbers_should_be_toc_slot_plus_three() {

        let descriptor = ImageDescriptor::new(vec![], high_density_tracks(), false);

        let text = descriptor.render(BuildMode::HighDensityOnly, None);

        for (slot, line) in text.lines().skip(1).enumerate() {
            let number: usize = line.split(' ').next().unwrap().parse().unwrap();
            assert_eq!(number, slot + 3);
        }
    }

    #[test]
    fn write_should_read_back_existing_file() {

        // Given a previous descriptor on disk.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disc.gdi");
        fs::write(&path, "3\r\n1 0 4 2048 track01.bin 0\r\n2 600 0 2352 track02.raw 0\r\n").unwrap();

        let descriptor = ImageDescriptor::new(vec![], vec![Track::data("track03.bin", 2048, 45000)], false);
        descriptor.write(BuildMode::HighDensityOnly, &path).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "3\n1 0 4 2048 track01.bin 0\n2 600 0 2352 track02.raw 0\n3 45000 4 2048 track03.bin 0\n"
        );
    }
}
