// Copyright (c) 2024 Harry [Majored] [hello@majored.pw]
// MIT License (https://github.com/Majored/rs-async-zip/blob/main/LICENSE)

//! Size and offset values which may need more than the 32 bits a classic header gives them.
//!
//! A header slot holding [`NON_ZIP64_MAX_SIZE`] means the real value lives in a Zip64 structure. Rather than
//! comparing against that sentinel wherever a size or offset is used, headers are resolved into a [`ZipField`] once
//! when parsed, and a [`ZipField`] decides its own on-disk representation when written.

use crate::spec::consts::NON_ZIP64_MAX_SIZE;

/// A size or offset value together with the width it is (or must be) encoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZipField {
    /// Stored directly within the 32-bit header slot.
    Narrow(u32),
    /// Stored within a Zip64 structure; the header slot holds the sentinel.
    Wide(u64),
}

impl ZipField {
    /// Picks the narrowest encoding able to represent the value.
    pub fn new(value: u64) -> Self {
        match u32::try_from(value) {
            Ok(narrow) if narrow != NON_ZIP64_MAX_SIZE => ZipField::Narrow(narrow),
            _ => ZipField::Wide(value),
        }
    }

    /// Returns the logical value regardless of encoding.
    pub fn get(self) -> u64 {
        match self {
            ZipField::Narrow(value) => value.into(),
            ZipField::Wide(value) => value,
        }
    }

    /// Returns whether this value needs a Zip64 structure.
    pub fn is_wide(self) -> bool {
        matches!(self, ZipField::Wide(_))
    }

    /// Returns the value to store within the 32-bit header slot.
    pub fn header_value(self) -> u32 {
        match self {
            ZipField::Narrow(value) => value,
            ZipField::Wide(_) => NON_ZIP64_MAX_SIZE,
        }
    }

    /// Returns the value to store within a Zip64 extended information field, if one is needed.
    pub fn extra_value(self) -> Option<u64> {
        match self {
            ZipField::Narrow(_) => None,
            ZipField::Wide(value) => Some(value),
        }
    }
}

impl Default for ZipField {
    fn default() -> Self {
        ZipField::Narrow(0)
    }
}

impl From<ZipField> for u64 {
    fn from(field: ZipField) -> u64 {
        field.get()
    }
}
