// Copyright (c) 2021 Harry [Majored] [hello@majored.pw]
// MIT License (https://github.com/Majored/rs-async-zip/blob/main/LICENSE)

use crate::date::ZipDateTime;
use crate::spec::{Compression, DeflateOption};

/// Options an entry is written with.
///
/// The defaults produce TorrentZip entries: maximum deflate compression and the fixed TorrentZip stamp.
///
/// ```
/// # use romzip::{Compression, EntryOptions};
/// let opts = EntryOptions::new().compression(Compression::Stored);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryOptions {
    pub(crate) compression: Compression,
    pub(crate) deflate_option: DeflateOption,
    pub(crate) raw: bool,
    pub(crate) last_modification_date: ZipDateTime,
}

impl EntryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the entry's compression method.
    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Sets the level deflate entries are compressed with.
    pub fn deflate_option(mut self, deflate_option: DeflateOption) -> Self {
        self.deflate_option = deflate_option;
        self
    }

    /// Sets whether the caller writes already-compressed bytes.
    ///
    /// Raw entries are copied as-is; neither their size nor their CRC32 is checked against the data written.
    pub fn raw(mut self, raw: bool) -> Self {
        self.raw = raw;
        self
    }

    /// Sets the entry's last modification date.
    pub fn last_modification_date(mut self, date: ZipDateTime) -> Self {
        self.last_modification_date = date;
        self
    }
}

impl Default for EntryOptions {
    fn default() -> Self {
        Self {
            compression: Compression::Deflate,
            deflate_option: DeflateOption::Maximum,
            raw: false,
            last_modification_date: ZipDateTime::TORRENTZIP,
        }
    }
}
