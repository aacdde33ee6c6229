// SPDX-License-Identifier: GPL-3.0
// tests.rs - Copyright Phillip Potter, 2026, under GPLv3 only.

use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use tempfile::TempDir;

use super::{GdBuilder, populate_from_directory};
use crate::{
    bootstrap::{BOOTSTRAP_SIZE, Bootstrap},
    config::{BuildConfig, HighDensityConfig, OutputRequest, SingleDensityConfig},
    error::BuildError,
    filesystem::{FilesystemBuilder, iso_builder::IsoImage},
    geometry::Area,
};

// End to end tests for the build orchestrator. These all truncate and split the
// high density data track, so the first track stays at the 300 sector minimum and
// the second holds only the packed file data.

const SECTOR: usize = 2048;
const RAW_SECTOR: usize = 2352;

/// A data directory holding a 2 sector boot binary (in lower case, to check the
/// name match ignores case), a 1 sector readme and a 3 sector file in a
/// subdirectory, plus a bootstrap naming the boot binary.
struct Fixture {
    root: TempDir,
    data: PathBuf,
    bootstrap: PathBuf,
    output: PathBuf,
}

fn fixture() -> Fixture {

    let root = tempfile::tempdir().unwrap();
    let data = root.path().join("data");
    fs::create_dir_all(data.join("sound")).unwrap();
    fs::write(data.join("1st_read.bin"), vec![0x77; 2 * SECTOR]).unwrap();
    fs::write(data.join("readme.txt"), vec![b'r'; 100]).unwrap();
    fs::write(data.join("sound").join("a.bin"), vec![0x5A; 5000]).unwrap();

    let mut ip = vec![0x20; BOOTSTRAP_SIZE];
    ip[0x60..0x60 + 12].copy_from_slice(b"1ST_READ.BIN");
    let bootstrap = root.path().join("IP.BIN");
    fs::write(&bootstrap, ip).unwrap();

    let output = root.path().join("out");

    Fixture { data, bootstrap, output, root }
}

fn split_config(fixture: &Fixture, audio_tracks: Vec<PathBuf>) -> BuildConfig {
    let output = OutputRequest::SplitFiles(fixture.output.join("track03.bin"), fixture.output.join("track04.bin"));
    let high_density = HighDensityConfig::new(&fixture.data, &fixture.bootstrap, audio_tracks);
    BuildConfig::new(output, high_density, true).unwrap()
}

fn bootstrap_of(track: &Path) -> Bootstrap {
    let bytes = fs::read(track).unwrap();
    let data: Box<[u8; BOOTSTRAP_SIZE]> = bytes[..BOOTSTRAP_SIZE].to_vec().into_boxed_slice().try_into().unwrap();
    Bootstrap::new(data)
}

fn ignore_progress(_: u32) {}

// Files are packed so that the boot binary starts at 549150 - 150 - 2 = 548998,
// after 4 sectors of other files: the second data track starts at 548994.
const LAST_TRACK_LBA: u32 = 548_994;

#[test]
fn high_density_build_should_write_tracks_and_descriptor() {

    let fixture = fixture();
    let builder = GdBuilder::new(split_config(&fixture, vec![]));

    let report = builder.execute(&mut ignore_progress).unwrap();

    let first = fixture.output.join("track03.bin");
    let last = fixture.output.join("track04.bin");
    assert_eq!(fs::metadata(&first).unwrap().len(), 300 * SECTOR as u64);

    // The second track runs from the first file to the end of the boot binary.
    let last_bytes = fs::read(&last).unwrap();
    assert_eq!(last_bytes.len(), 6 * SECTOR);
    assert!(last_bytes[4 * SECTOR..].iter().all(|&byte| byte == 0x77));
    assert!(last_bytes[..100].iter().all(|&byte| byte == b'r'));

    assert_eq!(report.high_density.len(), 2);
    assert_eq!(report.high_density[1].lba, LAST_TRACK_LBA);
    assert!(report.single_density.is_empty());

    let descriptor = fs::read_to_string(fixture.output.join("disc.gdi")).unwrap();
    assert_eq!(descriptor, format!("4\n3 45000 4 2048 track03.bin 0\n4 {} 4 2048 track04.bin 0\n", LAST_TRACK_LBA));
}

#[test]
fn high_density_bootstrap_should_carry_table_of_contents() {

    let fixture = fixture();
    GdBuilder::new(split_config(&fixture, vec![])).execute(&mut ignore_progress).unwrap();

    let bootstrap = bootstrap_of(&fixture.output.join("track03.bin"));

    assert_eq!(bootstrap.toc_slot(0), (45150, 0x41));
    assert_eq!(bootstrap.toc_slot(1), (LAST_TRACK_LBA + 150, 0x41));
    assert_eq!(bootstrap.toc_slot(2), (0xFFFFFF, 0xFF));
    assert_eq!(bootstrap.boot_binary_name(), "1ST_READ.BIN");
}

#[test]
fn rebuilding_should_produce_identical_output() {

    let fixture = fixture();
    let builder = GdBuilder::new(split_config(&fixture, vec![]));
    let names = ["track03.bin", "track04.bin", "disc.gdi"];

    builder.execute(&mut ignore_progress).unwrap();
    let first_run: Vec<Vec<u8>> = names.iter().map(|name| fs::read(fixture.output.join(name)).unwrap()).collect();

    builder.execute(&mut ignore_progress).unwrap();
    let second_run: Vec<Vec<u8>> = names.iter().map(|name| fs::read(fixture.output.join(name)).unwrap()).collect();

    assert_eq!(first_run, second_run);
}

#[test]
fn audio_tracks_should_be_copied_and_placed() {

    // Given an audio track outside the output directory, 100 bytes over 10 sectors.
    let fixture = fixture();
    let music = fixture.root.path().join("music");
    fs::create_dir_all(&music).unwrap();
    fs::write(music.join("song.raw"), vec![0x66; 10 * RAW_SECTOR + 100]).unwrap();

    let output = OutputRequest::Directory(fixture.output.clone());
    let high_density = HighDensityConfig::new(&fixture.data, &fixture.bootstrap, vec![music.join("song.raw")]);
    let config = BuildConfig::new(output, high_density, true).unwrap();

    let report = GdBuilder::new(config).execute(&mut ignore_progress).unwrap();

    // The copy is padded with silence to whole sectors.
    let copy = fs::read(fixture.output.join("song.raw")).unwrap();
    assert_eq!(copy.len(), 11 * RAW_SECTOR);
    assert!(copy[10 * RAW_SECTOR + 100..].iter().all(|&byte| byte == 0));

    // The audio starts one gap after the truncated first track.
    let names: Vec<&str> = report.high_density.iter().map(|track| track.name.as_str()).collect();
    assert_eq!(names, vec!["track03.bin", "song.raw", "track05.bin"]);
    assert_eq!(report.high_density[1].lba, 45450);

    let descriptor = fs::read_to_string(fixture.output.join("disc.gdi")).unwrap();
    assert_eq!(descriptor, format!(
        "5\n3 45000 4 2048 track03.bin 0\n4 45450 0 2352 song.raw 0\n5 {} 4 2048 track05.bin 0\n",
        LAST_TRACK_LBA
    ));

    let bootstrap = bootstrap_of(&fixture.output.join("track03.bin"));
    assert_eq!(bootstrap.toc_slot(1), (45600, 0x01));
    assert_eq!(bootstrap.toc_slot(2), (LAST_TRACK_LBA + 150, 0x41));
}

#[test]
fn audio_track_in_output_directory_should_be_found_by_name() {

    let fixture = fixture();
    fs::create_dir_all(&fixture.output).unwrap();
    fs::write(fixture.output.join("track04.raw"), vec![0x66; RAW_SECTOR]).unwrap();

    let output = OutputRequest::Directory(fixture.output.clone());
    let high_density = HighDensityConfig::new(&fixture.data, &fixture.bootstrap, vec![PathBuf::from("track04.raw")]);
    let config = BuildConfig::new(output, high_density, true).unwrap();

    let report = GdBuilder::new(config).execute(&mut ignore_progress).unwrap();

    assert_eq!(report.high_density[1].name, "track04.raw");
    assert_eq!(fs::read(fixture.output.join("track04.raw")).unwrap(), vec![0x66; RAW_SECTOR]);
}

#[test]
fn everything_mode_should_build_both_areas() {

    // Given a single density area with one small file and its audio track already
    // in the output directory.
    let fixture = fixture();
    let sda = fixture.root.path().join("sda");
    fs::create_dir_all(&sda).unwrap();
    fs::write(sda.join("abstract.txt"), b"hello").unwrap();
    fs::create_dir_all(&fixture.output).unwrap();
    fs::write(fixture.output.join("track02.raw"), vec![0; 300 * RAW_SECTOR]).unwrap();

    let mut config = split_config(&fixture, vec![]);
    config.single_density = Some(SingleDensityConfig::new(&sda, &fixture.bootstrap));

    let report = GdBuilder::new(config).execute(&mut ignore_progress).unwrap();

    // The track is declared at the 300 sector minimum, but the file stops where
    // the 22 sector stream does.
    assert_eq!(report.single_density[0].size, 300 * SECTOR as u64);
    assert_eq!(fs::metadata(fixture.output.join("track01.bin")).unwrap().len(), 22 * SECTOR as u64);
    assert_eq!(report.single_density[1].lba, 33300);

    let descriptor = fs::read_to_string(fixture.output.join("disc.gdi")).unwrap();
    assert_eq!(descriptor, format!(
        "4\n1 0 4 2048 track01.bin 0\n2 33300 0 2352 track02.raw 0\n3 45000 4 2048 track03.bin 0\n4 {} 4 2048 track04.bin 0\n",
        LAST_TRACK_LBA
    ));

    // The single density bootstrap is written untouched.
    let single_density_bootstrap = fs::read(fixture.output.join("track01.bin")).unwrap();
    assert_eq!(&single_density_bootstrap[..BOOTSTRAP_SIZE], &fs::read(&fixture.bootstrap).unwrap()[..]);
}

#[test]
fn high_density_only_should_keep_existing_single_density_lines() {

    let fixture = fixture();
    fs::create_dir_all(&fixture.output).unwrap();
    fs::write(
        fixture.output.join("disc.gdi"),
        "4\n1 0 4 2352 track01.bin 0\n2 8000 0 2352 track02.raw 0\n3 45000 4 2352 old.bin 0\n"
    ).unwrap();

    GdBuilder::new(split_config(&fixture, vec![])).execute(&mut ignore_progress).unwrap();

    let descriptor = fs::read_to_string(fixture.output.join("disc.gdi")).unwrap();
    assert!(descriptor.starts_with("4\n1 0 4 2352 track01.bin 0\n2 8000 0 2352 track02.raw 0\n3 45000 4 2048 track03.bin 0\n"));
}

#[test]
fn raw_mode_should_write_raw_sectors() {

    let fixture = fixture();
    let mut config = split_config(&fixture, vec![]);
    config.raw_mode = true;

    GdBuilder::new(config).execute(&mut ignore_progress).unwrap();

    assert_eq!(fs::metadata(fixture.output.join("track03.bin")).unwrap().len(), 300 * RAW_SECTOR as u64);
    assert_eq!(fs::metadata(fixture.output.join("track04.bin")).unwrap().len(), 6 * RAW_SECTOR as u64);

    let descriptor = fs::read_to_string(fixture.output.join("disc.gdi")).unwrap();
    assert!(descriptor.contains("3 45000 4 2352 track03.bin 0"));
}

#[test]
fn volume_name_should_reach_the_filesystem() {

    let fixture = fixture();
    let mut config = split_config(&fixture, vec![]);
    config.volume.volume = "TESTDISC".to_string();

    GdBuilder::new(config).execute(&mut ignore_progress).unwrap();

    let track = fs::read(fixture.output.join("track03.bin")).unwrap();
    assert_eq!(&track[16 * SECTOR + 40..16 * SECTOR + 49], b"TESTDISC ");
}

#[test]
fn missing_boot_binary_should_fail() {

    let fixture = fixture();
    fs::remove_file(fixture.data.join("1st_read.bin")).unwrap();

    let result = GdBuilder::new(split_config(&fixture, vec![])).execute(&mut ignore_progress);

    match result {
        Err(BuildError::MissingBootBinary { name, .. }) => assert_eq!(name, "1ST_READ.BIN"),
        _ => panic!("expected a missing boot binary"),
    }
}

#[test]
fn wrong_bootstrap_size_should_fail() {

    let fixture = fixture();
    fs::write(&fixture.bootstrap, vec![0; 100]).unwrap();

    let result = GdBuilder::new(split_config(&fixture, vec![])).execute(&mut ignore_progress);

    assert!(matches!(result, Err(BuildError::InvalidBootstrapSize { size: 100, .. })));
}

#[test]
fn missing_audio_track_should_fail() {

    let fixture = fixture();

    let result = GdBuilder::new(split_config(&fixture, vec![PathBuf::from("nope.raw")])).execute(&mut ignore_progress);

    assert!(matches!(result, Err(BuildError::MissingAudioTrack { .. })));
}

/// Creates a sparse file of the given length, so oversized inputs cost no space.
fn sparse_file(path: &Path, length: u64) {
    File::create(path).unwrap().set_len(length).unwrap();
}

#[test]
fn bad_high_density_bootstrap_should_fail_before_single_density_is_written() {

    // Given a valid single density area, but a truncated high density bootstrap.
    let fixture = fixture();
    let sda = fixture.root.path().join("sda");
    fs::create_dir_all(&sda).unwrap();
    fs::write(sda.join("abstract.txt"), b"hello").unwrap();
    let sda_bootstrap = fixture.root.path().join("IP0000.BIN");
    fs::copy(&fixture.bootstrap, &sda_bootstrap).unwrap();
    fs::write(&fixture.bootstrap, vec![0; 100]).unwrap();

    let mut config = split_config(&fixture, vec![]);
    let mut single_density = SingleDensityConfig::new(&sda, &sda_bootstrap);
    single_density.audio_track = None;
    config.single_density = Some(single_density);

    let result = GdBuilder::new(config).execute(&mut ignore_progress);

    assert!(matches!(result, Err(BuildError::InvalidBootstrapSize { size: 100, .. })));
    assert!(!fixture.output.exists());
}

#[test]
fn missing_boot_binary_should_fail_before_audio_is_copied() {

    let fixture = fixture();
    let music = fixture.root.path().join("music");
    fs::create_dir_all(&music).unwrap();
    fs::write(music.join("song.raw"), vec![0x66; RAW_SECTOR]).unwrap();
    fs::remove_file(fixture.data.join("1st_read.bin")).unwrap();

    let output = OutputRequest::Directory(fixture.output.clone());
    let high_density = HighDensityConfig::new(&fixture.data, &fixture.bootstrap, vec![music.join("song.raw")]);
    let config = BuildConfig::new(output, high_density, true).unwrap();

    let result = GdBuilder::new(config).execute(&mut ignore_progress);

    assert!(matches!(result, Err(BuildError::MissingBootBinary { .. })));
    assert!(!fixture.output.join("song.raw").exists());
}

#[test]
fn insufficient_space_should_fail_before_any_track_is_opened() {

    // Given a single density audio track longer than the whole area.
    let fixture = fixture();
    let sda = fixture.root.path().join("sda");
    fs::create_dir_all(&sda).unwrap();
    fs::write(sda.join("abstract.txt"), b"hello").unwrap();
    let audio = fixture.root.path().join("long.raw");
    sparse_file(&audio, 34_000 * RAW_SECTOR as u64);

    let mut config = split_config(&fixture, vec![]);
    let mut single_density = SingleDensityConfig::new(&sda, &fixture.bootstrap);
    single_density.audio_track = Some(audio);
    config.single_density = Some(single_density);

    let result = GdBuilder::new(config).execute(&mut ignore_progress);

    assert!(matches!(result, Err(BuildError::InsufficientSpace { .. })));
    assert!(!fixture.output.exists());
}

#[test]
fn audio_tracks_with_the_same_name_should_fail_before_anything_is_written() {

    // Given two different audio tracks both called song.raw.
    let fixture = fixture();
    for (directory, sectors) in [("a", 1), ("b", 2)] {
        fs::create_dir_all(fixture.root.path().join(directory)).unwrap();
        fs::write(fixture.root.path().join(directory).join("song.raw"), vec![0x66; sectors * RAW_SECTOR]).unwrap();
    }
    let audio_tracks = vec![
        fixture.root.path().join("a").join("song.raw"),
        fixture.root.path().join("b").join("song.raw"),
    ];

    let output = OutputRequest::Directory(fixture.output.clone());
    let high_density = HighDensityConfig::new(&fixture.data, &fixture.bootstrap, audio_tracks);
    let config = BuildConfig::new(output, high_density, true).unwrap();

    let result = GdBuilder::new(config).execute(&mut ignore_progress);

    assert!(matches!(result, Err(BuildError::InvalidOutputRequest(_))));
    assert!(!fixture.output.exists());
}

#[test]
fn data_files_clashing_once_upper_cased_should_fail() {

    let fixture = fixture();
    fs::write(fixture.data.join("README.TXT"), b"other").unwrap();

    let result = GdBuilder::new(split_config(&fixture, vec![])).execute(&mut ignore_progress);

    assert!(matches!(result, Err(BuildError::InvalidOutputRequest(_))));
    assert!(!fixture.output.exists());
}

#[test]
fn missing_data_directory_should_fail() {

    let fixture = fixture();
    fs::remove_dir_all(&fixture.data).unwrap();

    let result = GdBuilder::new(split_config(&fixture, vec![])).execute(&mut ignore_progress);

    assert!(matches!(result, Err(BuildError::SourceUnreadable { .. })));
}

/// Records the calls made to it instead of building anything.
struct RecordingBuilder {
    calls: Vec<String>,
}

impl FilesystemBuilder for RecordingBuilder {

    type Image = IsoImage;

    fn add_directory(&mut self, path: &str, _: DateTime<Utc>) -> Result<(), BuildError> {
        self.calls.push(format!("directory {}", path));
        Ok(())
    }

    fn add_file(&mut self, path: &str, _: &Path) -> Result<(), BuildError> {
        self.calls.push(format!("file {}", path));
        Ok(())
    }

    fn add_last_file(&mut self, path: &str, _: &Path, start_sector: u32) -> Result<(), BuildError> {
        self.calls.push(format!("last {} {}", path, start_sector));
        Ok(())
    }

    fn build(self) -> Result<IsoImage, BuildError> {
        Err(BuildError::InvalidOutputRequest("recording only".to_string()))
    }
}

#[test]
fn population_should_add_files_then_directories_then_boot_binary() {

    let fixture = fixture();
    fs::write(fixture.data.join("zebra.txt"), b"z").unwrap();
    let mut recorder = RecordingBuilder { calls: vec![] };

    populate_from_directory(&mut recorder, &fixture.data, Some("1ST_READ.BIN"), Area::HighDensity).unwrap();

    assert_eq!(recorder.calls, vec![
        "directory ",
        "file readme.txt",
        "file zebra.txt",
        "directory sound",
        "file sound/a.bin",
        "last 1ST_READ.BIN 548998",
    ]);
}

#[test]
fn population_without_boot_binary_should_not_place_last_file() {

    let fixture = fixture();
    let mut recorder = RecordingBuilder { calls: vec![] };

    populate_from_directory(&mut recorder, &fixture.data, None, Area::SingleDensity).unwrap();

    assert!(recorder.calls.contains(&"file 1st_read.bin".to_string()));
    assert!(!recorder.calls.iter().any(|call| call.starts_with("last")));
}

#[test]
fn boot_binary_larger_than_the_area_should_be_insufficient_space() {

    // Given a boot binary of more sectors than the single density area holds.
    let fixture = fixture();
    sparse_file(&fixture.data.join("1st_read.bin"), 34_000 * SECTOR as u64);
    let mut recorder = RecordingBuilder { calls: vec![] };

    let result = populate_from_directory(&mut recorder, &fixture.data, Some("1ST_READ.BIN"), Area::SingleDensity);

    assert!(matches!(result, Err(BuildError::InsufficientSpace { available: -550, required: 0 })));
    assert!(!recorder.calls.iter().any(|call| call.starts_with("last")));
}
