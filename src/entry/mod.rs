// Copyright (c) 2022 Harry [Majored] [hello@majored.pw]
// MIT License (https://github.com/Majored/rs-async-zip/blob/main/LICENSE)

use crate::date::ZipDateTime;
use crate::error::{Result, ZipError};
use crate::spec::consts::{
    TORRENTZIP_COMPRESSION, TORRENTZIP_FLAGS, TORRENTZIP_VERSION_NEEDED, TORRENTZIP_VERSION_NEEDED_ZIP64,
};
use crate::spec::field::ZipField;
use crate::spec::header::GeneralPurposeFlag;
use crate::spec::Compression;

/// An entry within a ZIP archive: one archived item and where it lives within the container.
///
/// Entries are owned by the [`Archive`](crate::Archive) which parsed or wrote them and are addressed by index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ZipEntry {
    pub(crate) filename: String,
    pub(crate) filename_raw: Vec<u8>,
    pub(crate) compression: u16,
    pub(crate) flags: GeneralPurposeFlag,
    pub(crate) version_needed: u16,
    pub(crate) crc32: u32,
    pub(crate) uncompressed_size: ZipField,
    pub(crate) compressed_size: ZipField,
    pub(crate) last_modification_date: ZipDateTime,
    pub(crate) header_offset: ZipField,
    pub(crate) data_offset: u64,
    pub(crate) zip64: bool,
    pub(crate) torrentzip: bool,
    pub(crate) md5: Option<[u8; 16]>,
    pub(crate) sha1: Option<[u8; 20]>,
}

impl ZipEntry {
    /// Returns the entry's filename.
    ///
    /// # Note
    /// This will return the raw filename stored during ZIP creation. If calling this method on entries retrieved from
    /// untrusted ZIP files, the filename should be sanitised before being used as a path to prevent [directory
    /// travesal attacks](https://en.wikipedia.org/wiki/Directory_traversal_attack).
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Returns the filename exactly as stored within the archive.
    pub fn filename_raw(&self) -> &[u8] {
        &self.filename_raw
    }

    /// Returns the entry's raw compression method identifier.
    pub fn compression_method(&self) -> u16 {
        self.compression
    }

    /// Returns the entry's compression method, if this crate can stream it.
    pub fn compression(&self) -> Result<Compression> {
        Compression::try_from(self.compression)
    }

    /// Returns the entry's general purpose bit flag.
    pub fn flags(&self) -> u16 {
        self.flags.0
    }

    /// Returns the entry's CRC32 value.
    pub fn crc32(&self) -> u32 {
        self.crc32
    }

    /// Returns the entry's uncompressed size.
    pub fn uncompressed_size(&self) -> u64 {
        self.uncompressed_size.get()
    }

    /// Returns the entry's compressed size.
    pub fn compressed_size(&self) -> u64 {
        self.compressed_size.get()
    }

    /// Returns the entry's last modification time & date.
    pub fn last_modification_date(&self) -> ZipDateTime {
        self.last_modification_date
    }

    /// Returns the offset of the entry's local file header, or `None` when it needed a Zip64 encoding.
    pub fn header_offset(&self) -> Option<u64> {
        match self.header_offset {
            ZipField::Narrow(offset) => Some(offset.into()),
            ZipField::Wide(_) => None,
        }
    }

    /// Returns the offset of the entry's local file header regardless of its encoding.
    pub fn header_offset_raw(&self) -> u64 {
        self.header_offset.get()
    }

    /// Returns the offset of the entry's (possibly compressed) data.
    pub fn data_offset(&self) -> u64 {
        self.data_offset
    }

    /// Returns whether any of this entry's sizes or offsets needed a Zip64 encoding.
    pub fn zip64(&self) -> bool {
        self.zip64
    }

    /// Returns whether this entry's local header carries the fixed TorrentZip fields.
    pub fn torrentzip(&self) -> bool {
        self.torrentzip
    }

    /// Returns whether or not the entry represents a directory.
    pub fn dir(&self) -> bool {
        self.filename.ends_with('/')
    }

    /// Returns the MD5 digest of the entry's uncompressed data, if a deep scan has populated it.
    pub fn md5(&self) -> Option<&[u8; 16]> {
        self.md5.as_ref()
    }

    /// Returns the SHA1 digest of the entry's uncompressed data, if a deep scan has populated it.
    pub fn sha1(&self) -> Option<&[u8; 20]> {
        self.sha1.as_ref()
    }

    /// Whether the stored version/flags/method/stamp are the canonical TorrentZip values.
    ///
    /// The UTF-8 name flag is tolerated, as it's the only way to store a non-ASCII name unambiguously.
    pub(crate) fn has_torrentzip_fields(&self) -> bool {
        let version = self.version_needed == TORRENTZIP_VERSION_NEEDED
            || (self.zip64 && self.version_needed == TORRENTZIP_VERSION_NEEDED_ZIP64);

        version
            && self.flags.0 & !GeneralPurposeFlag::FILENAME_UNICODE == TORRENTZIP_FLAGS
            && self.compression == TORRENTZIP_COMPRESSION
            && self.last_modification_date == ZipDateTime::TORRENTZIP
    }
}

/// Validate a name for writing and return its stored bytes.
pub(crate) fn filename_bytes(filename: &str) -> Result<Vec<u8>> {
    if filename.is_empty() || filename.starts_with('/') || filename.contains('\\') || filename.contains('\0') {
        return Err(ZipError::InvalidFileName(filename.to_string()));
    }
    if filename.len() > u16::MAX as usize {
        return Err(ZipError::FileNameTooLarge);
    }

    Ok(filename.as_bytes().to_vec())
}

/// Decode a stored filename; names which aren't valid UTF-8 are decoded lossily.
pub(crate) fn filename_from_bytes(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}
