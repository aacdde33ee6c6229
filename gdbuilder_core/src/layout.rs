// SPDX-License-Identifier: GPL-3.0
// layout.rs - Copyright Phillip Potter, 2026, under GPLv3 only.

use log::debug;

use super::{
    error::BuildError,
    filesystem::{Extent, ExtentKind},
    geometry::{Area, DATA_SECTOR_SIZE, MINIMUM_TRACK_SECTORS, TRACK_GAP_SECTORS},
    track::{Track, default_last_track_name},
};
use gdbuilder_utility::{round_up, sector_count};

const SECTOR: u64 = DATA_SECTOR_SIZE as u64;
const GAP: i64 = TRACK_GAP_SECTORS as i64;

/// Everything the planner needs to know about one area.
pub struct LayoutRequest<'a> {
    pub area: Area,

    // Extents of the built filesystem stream, in stream order.
    pub extents: &'a [Extent],
    pub stream_length: u64,

    // Audio tracks in disc order, not yet placed.
    pub audio_tracks: Vec<Track>,

    pub first_track_name: String,

    // An explicitly requested name for the second data track.
    pub last_track_name: Option<String>,

    pub truncate: bool,
}

/// The planned track list of one area.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AreaLayout {

    // First data track, then audio tracks, then the second data track if split.
    pub tracks: Vec<Track>,

    // Sector (relative to the area) of the first file's data, where the second
    // data track starts.
    pub first_file_start: u32,

    // Sector (relative to the area) where the filesystem headers end.
    pub last_header_end: u32,

    pub split: bool,
}

impl AreaLayout {

    pub fn first_track(&self) -> &Track {
        &self.tracks[0]
    }

    pub fn last_track(&self) -> Option<&Track> {
        if self.split { self.tracks.last() } else { None }
    }

    pub fn audio_tracks(&self) -> &[Track] {
        let end = if self.split { self.tracks.len() - 1 } else { self.tracks.len() };
        &self.tracks[1..end]
    }
}

/// Decides whether an area's data track is written as two tracks around its audio
/// tracks. Only the high density area ever splits: always when it carries audio,
/// and when truncating with an explicit name for the second track.
pub fn is_split(area: Area, audio_track_count: usize, truncate: bool, explicit_last_name: bool) -> bool {
    area == Area::HighDensity && (audio_track_count > 0 || (truncate && explicit_last_name))
}

/// Plans the tracks of an area: where the data track ends, where each audio track
/// begins, and whether the data is split into a second track holding the file
/// data. Every returned LBA is absolute.
pub fn plan_area(request: LayoutRequest) -> Result<AreaLayout, BuildError> {

    let LayoutRequest {
        area,
        extents,
        stream_length,
        mut audio_tracks,
        first_track_name,
        last_track_name,
        truncate,
    } = request;

    let split = is_split(area, audio_tracks.len(), truncate, last_track_name.is_some());
    let (last_header_end, first_file_start) = measure_extents(extents, stream_length);
    let start = area.lba_start();
    let window = area.sector_count() as i64;
    let insufficient = |track_end: i64| BuildError::InsufficientSpace {
        available: track_end + start as i64,
        required: last_header_end as u64 + start as u64,
    };

    let mut track_end = window;

    if area == Area::SingleDensity {

        if audio_tracks.len() > 1 {
            return Err(BuildError::InvalidOutputRequest(
                "the single density area holds at most one audio track".to_string()
            ));
        }

        // The audio track sits at the very end of the area, one gap after the data.
        if let Some(audio) = audio_tracks.first_mut() {
            track_end = window - audio.sector_count() as i64 - GAP;
            audio.lba = start + (track_end + GAP).max(0) as u32;
        }

        if track_end < last_header_end {
            return Err(insufficient(track_end));
        }
    }

    if split {

        // Audio goes between the headers and the file data, with a gap either side.
        track_end = place_backwards(&mut audio_tracks, start, first_file_start - GAP) - GAP;
        if track_end < last_header_end {
            return Err(insufficient(track_end));
        }
    }

    if truncate {

        // A split area keeps its file data in the second track, so the first only
        // needs the headers. Otherwise everything the stream holds stays.
        let content_end = if split { last_header_end } else { sector_count(stream_length, SECTOR) as i64 };
        track_end = content_end.max(MINIMUM_TRACK_SECTORS as i64).min(track_end);

        if split {
            let audio_sectors: i64 = audio_tracks.iter().map(|track| track.sector_count() as i64).sum();
            place_backwards(&mut audio_tracks, start, track_end + GAP + audio_sectors);
        }
    }

    debug!(
        "{} layout: headers end at {}, files start at {}, first data track is {} sectors, split: {}",
        area.name(),
        last_header_end,
        first_file_start,
        track_end,
        split
    );

    let mut tracks = Vec::with_capacity(audio_tracks.len() + 2);
    tracks.push(Track::data(&first_track_name, track_end as u64 * SECTOR, start));
    tracks.append(&mut audio_tracks);

    if split {
        let name = last_track_name.unwrap_or_else(|| default_last_track_name(tracks.len() - 1));
        tracks.push(Track::data(
            &name,
            (window - first_file_start) as u64 * SECTOR,
            start + first_file_start as u32
        ));
    }

    Ok(AreaLayout {
        tracks,
        first_file_start: first_file_start as u32,
        last_header_end: last_header_end as u32,
        split,
    })
}

/// Finds where the headers end and where the first file begins, in sectors
/// relative to the start of the stream. A stream without files is treated as if
/// its first file started right at the end.
fn measure_extents(extents: &[Extent], stream_length: u64) -> (i64, i64) {

    let mut last_header_end = 0;
    for extent in extents {
        match extent.kind {
            ExtentKind::File => return (last_header_end, (extent.offset / SECTOR) as i64),
            ExtentKind::Header => {
                last_header_end = (extent.offset + round_up(extent.length, SECTOR)) as i64 / SECTOR as i64;
            },
        }
    }

    (last_header_end, sector_count(stream_length, SECTOR) as i64)
}

/// Places tracks back to back so that the last one ends at `end` (relative to the
/// area), and returns the relative sector where the first one begins.
fn place_backwards(tracks: &mut [Track], area_start: u32, end: i64) -> i64 {

    let mut cursor = end;
    for track in tracks.iter_mut().rev() {
        cursor -= track.sector_count() as i64;
        track.lba = (area_start as i64 + cursor).max(0) as u32;
    }

    cursor
}
