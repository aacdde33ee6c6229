// SPDX-License-Identifier: GPL-3.0
// sector.rs - Copyright Phillip Potter, 2026, under GPLv3 only.

use super::geometry::{DATA_SECTOR_SIZE, RAW_SECTOR_SIZE, TRACK_GAP_SECTORS};
use gdbuilder_utility::to_bcd;

/// The 12-byte synchronisation pattern that opens every raw data sector.
pub const SYNC_PATTERN: [u8; 12] = [
    0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00,
];

/// Layout of a Mode 1 sector.
const HEADER_OFFSET: usize = 0x00C;
const USER_DATA_OFFSET: usize = 0x010;
const EDC_OFFSET: usize = 0x810;
const P_PARITY_OFFSET: usize = 0x81C;
const Q_PARITY_OFFSET: usize = 0x8C8;

const MODE_1: u8 = 0x01;

const FRAMES_PER_SECOND: u32 = 75;
const SECONDS_PER_MINUTE: u32 = 60;

/// Reversed form of the EDC polynomial (x^32 + x^31 + x^16 + x^15 + x^4 + x^3 + x + 1).
const EDC_POLYNOMIAL: u32 = 0xD801_8001;

/// Lookup table for the EDC checksum.
const EDC_TABLE: [u32; 256] = build_edc_table();

/// Forward and backward lookup tables for the GF(2^8) arithmetic used by the
/// Reed-Solomon product code.
const ECC_TABLES: ([u8; 256], [u8; 256]) = build_ecc_tables();

const fn build_edc_table() -> [u32; 256] {

    let mut table = [0_u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut edc = i as u32;
        let mut bit = 0;
        while bit < 8 {
            edc = (edc >> 1) ^ if edc & 1 != 0 { EDC_POLYNOMIAL } else { 0 };
            bit += 1;
        }
        table[i] = edc;
        i += 1;
    }

    table
}

const fn build_ecc_tables() -> ([u8; 256], [u8; 256]) {

    let mut forward = [0_u8; 256];
    let mut backward = [0_u8; 256];
    let mut i = 0;
    while i < 256 {
        let j = (i << 1) ^ if i & 0x80 != 0 { 0x11D } else { 0 };
        forward[i] = j as u8;
        backward[i ^ j] = i as u8;
        i += 1;
    }

    (forward, backward)
}

/// Converts an LBA into the (minute, second, frame) address stored in a sector
/// header. Physical addresses run two seconds ahead of logical ones.
pub fn lba_to_msf(lba: u32) -> (u8, u8, u8) {

    let address = lba + TRACK_GAP_SECTORS;
    let minutes = address / (FRAMES_PER_SECOND * SECONDS_PER_MINUTE);
    let seconds = (address / FRAMES_PER_SECOND) % SECONDS_PER_MINUTE;
    let frames = address % FRAMES_PER_SECOND;

    (minutes as u8, seconds as u8, frames as u8)
}

/// Computes the error detection code over the supplied bytes.
pub fn compute_edc(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0, |edc, &byte| {
        (edc >> 8) ^ EDC_TABLE[((edc ^ byte as u32) & 0xFF) as usize]
    })
}

/// Computes one of the two Reed-Solomon parity blocks over the sector, starting at
/// the header, and stores it at `parity_offset`. P parity covers 86 columns of 24
/// bytes, Q parity 52 diagonals of 43 bytes.
fn compute_parity(
    sector: &mut [u8; RAW_SECTOR_SIZE],
    major_count: usize,
    minor_count: usize,
    major_mult: usize,
    minor_inc: usize,
    parity_offset: usize
) {

    let (forward, backward) = &ECC_TABLES;
    let size = major_count * minor_count;
    let source = &sector[HEADER_OFFSET..HEADER_OFFSET + size];
    let mut parity = [0_u8; 2 * 86];

    for major in 0..major_count {

        let mut index = (major >> 1) * major_mult + (major & 1);
        let mut ecc_a = 0_u8;
        let mut ecc_b = 0_u8;

        for _ in 0..minor_count {
            let value = source[index];
            index += minor_inc;
            if index >= size {
                index -= size;
            }
            ecc_a ^= value;
            ecc_b ^= value;
            ecc_a = forward[ecc_a as usize];
        }

        ecc_a = backward[(forward[ecc_a as usize] ^ ecc_b) as usize];
        parity[major] = ecc_a;
        parity[major + major_count] = ecc_a ^ ecc_b;
    }

    sector[parity_offset..parity_offset + 2 * major_count].copy_from_slice(&parity[..2 * major_count]);
}

/// Converts a logical sector into a raw Mode 1 sector at the specified LBA: sync
/// pattern, header, user data, EDC, a zeroed intermediate field, then P and Q
/// parity.
pub fn to_raw_mode1(logical_sector: &[u8; DATA_SECTOR_SIZE], lba: u32) -> [u8; RAW_SECTOR_SIZE] {

    let mut sector = [0_u8; RAW_SECTOR_SIZE];

    sector[..HEADER_OFFSET].copy_from_slice(&SYNC_PATTERN);

    let (minutes, seconds, frames) = lba_to_msf(lba);
    sector[HEADER_OFFSET] = to_bcd(minutes);
    sector[HEADER_OFFSET + 1] = to_bcd(seconds);
    sector[HEADER_OFFSET + 2] = to_bcd(frames);
    sector[HEADER_OFFSET + 3] = MODE_1;

    sector[USER_DATA_OFFSET..EDC_OFFSET].copy_from_slice(logical_sector);

    let edc = compute_edc(&sector[..EDC_OFFSET]);
    sector[EDC_OFFSET..EDC_OFFSET + 4].copy_from_slice(&edc.to_le_bytes());

    compute_parity(&mut sector, 86, 24, 2, 86, P_PARITY_OFFSET);
    compute_parity(&mut sector, 52, 43, 86, 88, Q_PARITY_OFFSET);

    sector
}

/// Returns the 2048 bytes of user data carried by a raw Mode 1 sector.
pub fn user_data(raw_sector: &[u8; RAW_SECTOR_SIZE]) -> &[u8] {
    &raw_sector[USER_DATA_OFFSET..EDC_OFFSET]
}
