// SPDX-License-Identifier: GPL-3.0
// records.rs - Copyright Phillip Potter, 2026, under GPLv3 only.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use chrono::{DateTime, Datelike, Timelike, Utc};

use crate::{
    config::VolumeIdentifiers,
    geometry::DATA_SECTOR_SIZE,
};
use gdbuilder_utility::BothEndian;

/// Standard identifier present in every volume descriptor.
const STANDARD_IDENTIFIER: &[u8; 5] = b"CD001";

const PRIMARY_VOLUME_DESCRIPTOR_TYPE: u8 = 1;
const TERMINATOR_TYPE: u8 = 255;

/// Directory record flag marking a directory.
const DIRECTORY_FLAG: u8 = 0x02;

/// Length of the fixed part of a directory record.
const DIRECTORY_RECORD_FIXED_LENGTH: usize = 33;

/// Longest identifier whose directory record, padding included, still fits in 255
/// bytes.
pub(super) const MAX_IDENTIFIER_LENGTH: usize = 221;

/// Length of the fixed part of a path table record.
const PATH_TABLE_RECORD_FIXED_LENGTH: usize = 8;

/// The fields of the primary volume descriptor which vary between images.
pub(super) struct VolumeDescriptorFields<'a> {
    pub volume_space_size: u32,
    pub path_table_size: u32,
    pub l_path_table_lba: u32,
    pub m_path_table_lba: u32,
    pub root_record: &'a [u8],
    pub identifiers: &'a VolumeIdentifiers,
    pub created: DateTime<Utc>,
}

/// Returns the length of a directory record, including its padding byte.
pub(super) fn directory_record_length(identifier_length: usize) -> usize {
    let length = DIRECTORY_RECORD_FIXED_LENGTH + identifier_length;
    length + length % 2
}

/// Returns the length of a path table record, including its padding byte.
pub(super) fn path_table_record_length(identifier_length: usize) -> usize {
    let length = PATH_TABLE_RECORD_FIXED_LENGTH + identifier_length;
    length + length % 2
}

/// Serialises a directory record.
pub(super) fn directory_record(
    identifier: &[u8],
    location: u32,
    data_length: u32,
    recorded: &DateTime<Utc>,
    is_directory: bool
) -> Vec<u8> {

    let length = directory_record_length(identifier.len());
    let mut record = vec![0; length];

    record[0] = length as u8;
    record[2..10].copy_from_slice(&location.both_endian());
    record[10..18].copy_from_slice(&data_length.both_endian());
    record[18..25].copy_from_slice(&short_datetime(recorded));
    record[25] = if is_directory { DIRECTORY_FLAG } else { 0 };
    record[28..32].copy_from_slice(&1_u16.both_endian());
    record[32] = identifier.len() as u8;
    record[33..33 + identifier.len()].copy_from_slice(identifier);

    record
}

/// Serialises a path table record, either for the little-endian (type L) or the
/// big-endian (type M) table.
pub(super) fn path_table_record(
    identifier: &[u8],
    location: u32,
    parent_number: u16,
    big_endian: bool
) -> Vec<u8> {

    let mut record = vec![0; path_table_record_length(identifier.len())];

    record[0] = identifier.len() as u8;
    if big_endian {
        BigEndian::write_u32(&mut record[2..6], location);
        BigEndian::write_u16(&mut record[6..8], parent_number);
    } else {
        LittleEndian::write_u32(&mut record[2..6], location);
        LittleEndian::write_u16(&mut record[6..8], parent_number);
    }
    record[8..8 + identifier.len()].copy_from_slice(identifier);

    record
}

/// Serialises the primary volume descriptor followed by the set terminator.
pub(super) fn volume_descriptor_set(fields: &VolumeDescriptorFields) -> Vec<u8> {

    let mut set = vec![0; 2 * DATA_SECTOR_SIZE];
    let (primary, terminator) = set.split_at_mut(DATA_SECTOR_SIZE);

    primary[0] = PRIMARY_VOLUME_DESCRIPTOR_TYPE;
    primary[1..6].copy_from_slice(STANDARD_IDENTIFIER);
    primary[6] = 1;
    write_text(&mut primary[8..40], &fields.identifiers.system);
    write_text(&mut primary[40..72], &fields.identifiers.volume);
    primary[80..88].copy_from_slice(&fields.volume_space_size.both_endian());
    primary[120..124].copy_from_slice(&1_u16.both_endian());
    primary[124..128].copy_from_slice(&1_u16.both_endian());
    primary[128..132].copy_from_slice(&(DATA_SECTOR_SIZE as u16).both_endian());
    primary[132..140].copy_from_slice(&fields.path_table_size.both_endian());
    LittleEndian::write_u32(&mut primary[140..144], fields.l_path_table_lba);
    BigEndian::write_u32(&mut primary[148..152], fields.m_path_table_lba);
    primary[156..156 + fields.root_record.len()].copy_from_slice(fields.root_record);
    write_text(&mut primary[190..318], &fields.identifiers.volume_set);
    write_text(&mut primary[318..446], &fields.identifiers.publisher);
    write_text(&mut primary[446..574], &fields.identifiers.data_preparer);
    write_text(&mut primary[574..702], &fields.identifiers.application);
    write_text(&mut primary[702..739], "");
    write_text(&mut primary[739..776], "");
    write_text(&mut primary[776..813], "");
    primary[813..830].copy_from_slice(&long_datetime(Some(&fields.created)));
    primary[830..847].copy_from_slice(&long_datetime(Some(&fields.created)));
    primary[847..864].copy_from_slice(&long_datetime(None));
    primary[864..881].copy_from_slice(&long_datetime(None));
    primary[881] = 1;

    terminator[0] = TERMINATOR_TYPE;
    terminator[1..6].copy_from_slice(STANDARD_IDENTIFIER);
    terminator[6] = 1;

    set
}

/// Writes space-padded ASCII text into a fixed-width field. Anything outside
/// printable ASCII is replaced with an underscore, and overlong text is cut.
fn write_text(field: &mut [u8], text: &str) {

    field.fill(b' ');
    for (slot, character) in field.iter_mut().zip(text.chars()) {
        *slot = if character.is_ascii_graphic() || character == ' ' {
            character as u8
        } else {
            b'_'
        };
    }
}

/// The 7-byte date format of directory records.
pub(super) fn short_datetime(time: &DateTime<Utc>) -> [u8; 7] {
    [
        (time.year() - 1900).clamp(0, 255) as u8,
        time.month() as u8,
        time.day() as u8,
        time.hour() as u8,
        time.minute() as u8,
        time.second() as u8,
        0,
    ]
}

/// The 17-byte date format of volume descriptors. An unset date is all '0'
/// digits with a zero offset.
pub(super) fn long_datetime(time: Option<&DateTime<Utc>>) -> [u8; 17] {

    let mut output = [b'0'; 17];
    output[16] = 0;

    if let Some(time) = time {
        let centiseconds = (time.nanosecond() / 10_000_000).min(99);
        let text = format!(
            "{:04}{:02}{:02}{:02}{:02}{:02}{:02}",
            time.year().clamp(0, 9999),
            time.month(),
            time.day(),
            time.hour(),
            time.minute(),
            time.second(),
            centiseconds
        );
        output[..16].copy_from_slice(&text.as_bytes()[..16]);
    }

    output
}
