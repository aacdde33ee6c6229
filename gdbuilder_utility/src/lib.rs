// SPDX-License-Identifier: GPL-3.0
// lib.rs - Copyright Phillip Potter, 2026, under GPLv3 only.

// This crate contains small helper functions shared by the image builder crates.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

/// Rounds `value` up to the next multiple of `unit`.
#[inline(always)]
pub fn round_up(value: u64, unit: u64) -> u64 {
    value.div_ceil(unit) * unit
}

/// Returns the number of whole sectors of `sector_size` bytes needed to hold `bytes`.
#[inline(always)]
pub fn sector_count(bytes: u64, sector_size: u64) -> u64 {
    bytes.div_ceil(sector_size)
}

/// Converts a decimal value below 100 into packed binary-coded decimal, as used by
/// sector headers.
#[inline(always)]
pub fn to_bcd(value: u8) -> u8 {
    ((value / 10) << 4) | (value % 10)
}

/// This trait exists to allow us to encode integers in the 'both-byte orders' form
/// that ISO9660 uses for most numeric fields: the little-endian encoding
/// immediately followed by the big-endian one.
pub trait BothEndian {

    type Output;

    /// This function should return the little-endian bytes followed by the
    /// big-endian bytes of the value.
    fn both_endian(self) -> Self::Output;
}

impl BothEndian for u16 {

    type Output = [u8; 4];

    /// Encodes as 2 little-endian bytes then 2 big-endian bytes.
    #[inline(always)]
    fn both_endian(self) -> Self::Output {
        let mut output = [0; 4];
        LittleEndian::write_u16(&mut output[0..2], self);
        BigEndian::write_u16(&mut output[2..4], self);
        output
    }
}

impl BothEndian for u32 {

    type Output = [u8; 8];

    /// Encodes as 4 little-endian bytes then 4 big-endian bytes.
    #[inline(always)]
    fn both_endian(self) -> Self::Output {
        let mut output = [0; 8];
        LittleEndian::write_u32(&mut output[0..4], self);
        BigEndian::write_u32(&mut output[4..8], self);
        output
    }
}
