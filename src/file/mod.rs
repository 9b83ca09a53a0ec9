// Copyright (c) 2022 Harry [Majored] [hello@majored.pw]
// MIT License (https://github.com/Majored/rs-async-zip/blob/main/LICENSE)

use crate::entry::ZipEntry;
use crate::torrentzip::TorrentZipViolation;

/// Where the central directory sits and how large it is, as resolved from the trailing records.
///
/// Recomputed whenever an archive is opened for reading or closed after writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CentralDirectorySummary {
    pub(crate) entries: u64,
    pub(crate) size: u64,
    pub(crate) offset: u64,
    pub(crate) zip64_eocdr_offset: Option<u64>,
    pub(crate) crc32: u32,
}

impl CentralDirectorySummary {
    /// Returns the number of entries the central directory advertises.
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Returns the size of the central directory in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Returns the offset of the first central directory record.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Returns the offset of the Zip64 end of central directory record, if the archive has one.
    pub fn zip64_eocdr_offset(&self) -> Option<u64> {
        self.zip64_eocdr_offset
    }

    /// Returns the CRC32 of the raw central directory bytes.
    pub fn crc32(&self) -> u32 {
        self.crc32
    }
}

/// An immutable store of data about a ZIP file.
#[derive(Clone, Debug)]
pub struct ZipFile {
    pub(crate) entries: Vec<ZipEntry>,
    pub(crate) zip64: bool,
    pub(crate) comment: Vec<u8>,
    pub(crate) directory: CentralDirectorySummary,
    pub(crate) torrentzip: Option<TorrentZipViolation>,
}

impl ZipFile {
    /// Returns a list of this ZIP file's entries.
    pub fn entries(&self) -> &[ZipEntry] {
        &self.entries
    }

    /// Returns this ZIP file's trailing comment.
    pub fn comment(&self) -> &[u8] {
        &self.comment
    }

    /// Returns whether or not this ZIP file carries Zip64 structures.
    pub fn zip64(&self) -> bool {
        self.zip64
    }

    pub fn central_directory(&self) -> &CentralDirectorySummary {
        &self.directory
    }

    /// Returns whether this ZIP file passed every TorrentZip check.
    pub fn torrentzip(&self) -> bool {
        self.torrentzip.is_none()
    }

    /// Returns the first TorrentZip check this ZIP file failed, if any.
    pub fn torrentzip_violation(&self) -> Option<TorrentZipViolation> {
        self.torrentzip
    }
}
