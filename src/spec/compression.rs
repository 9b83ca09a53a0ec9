// Copyright (c) 2021 Harry [Majored] [hello@majored.pw]
// MIT License (https://github.com/Majored/rs-async-zip/blob/main/LICENSE)

use crate::error::{Result, ZipError};

/// A compression method supported by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Stored,
    Deflate,
}

impl TryFrom<u16> for Compression {
    type Error = ZipError;

    // Convert a u16 stored with little endianness into a supported compression method.
    // https://github.com/Majored/rs-async-zip/blob/main/SPECIFICATION.md#445
    fn try_from(value: u16) -> Result<Self> {
        match value {
            0 => Ok(Compression::Stored),
            8 => Ok(Compression::Deflate),
            _ => Err(ZipError::CompressionNotSupported(value)),
        }
    }
}

impl From<&Compression> for u16 {
    // Convert a supported compression method into its relevant u16 stored with little endianness.
    // https://github.com/Majored/rs-async-zip/blob/main/SPECIFICATION.md#445
    fn from(compression: &Compression) -> u16 {
        match compression {
            Compression::Stored => 0,
            Compression::Deflate => 8,
        }
    }
}

impl From<Compression> for u16 {
    fn from(compression: Compression) -> u16 {
        (&compression).into()
    }
}

/// Level of compression data should be compressed with for deflate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeflateOption {
    // Normal (-en) compression option was used.
    Normal,

    // Maximum (-exx/-ex) compression option was used.
    Maximum,

    // Fast (-ef) compression option was used.
    Fast,

    // Super Fast (-es) compression option was used.
    Super,

    /// Other implementation defined level.
    Other(u32),
}

impl DeflateOption {
    pub(crate) fn into_level(self) -> flate2::Compression {
        match self {
            DeflateOption::Normal => flate2::Compression::default(),
            DeflateOption::Maximum => flate2::Compression::best(),
            DeflateOption::Fast => flate2::Compression::new(2),
            DeflateOption::Super => flate2::Compression::fast(),
            DeflateOption::Other(level) => flate2::Compression::new(level.min(9)),
        }
    }

    /// The general purpose flag bits (1 & 2) advertising this level for deflate entries.
    ///
    /// https://github.com/Majored/rs-async-zip/blob/main/SPECIFICATION.md#444
    pub(crate) fn flag_bits(self) -> u16 {
        match self {
            DeflateOption::Normal | DeflateOption::Other(_) => 0b000,
            DeflateOption::Maximum => 0b010,
            DeflateOption::Fast => 0b100,
            DeflateOption::Super => 0b110,
        }
    }
}

impl Default for DeflateOption {
    fn default() -> Self {
        DeflateOption::Maximum
    }
}
