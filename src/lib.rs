// Copyright (c) 2021-2024 Harry [Majored] [hello@majored.pw]
// MIT License (https://github.com/Majored/rs-async-zip/blob/main/LICENSE)

//! # romzip
//!
//! A synchronous ZIP archive engine built for ROM depots.
//!
//! ## Features
//! - A strict open/mutate/close session over a single file ([`Archive`]).
//! - Central directory records cross-checked against every local file header on open.
//! - Zip64 support for archives over 4 GiB or 65535 entries.
//! - TorrentZip verification on read, and canonical TorrentZip output on write.
//! - Raw entry streams for copying compressed data between archives without recompressing.
//! - Aims for reasonable [specification](https://pkware.cachefly.net/webdocs/casestudies/APPNOTE.TXT) compliance.
//!
//! Encrypted entries and spanned archives aren't supported.

pub mod archive;
pub mod date;
pub mod entry;
pub mod error;
pub mod file;
pub mod opts;
pub mod read;
pub mod spec;
pub mod torrentzip;
pub(crate) mod utils;
pub mod write;

#[cfg(test)]
pub(crate) mod tests;

pub use crate::archive::{Archive, OpenMode};
pub use crate::date::ZipDateTime;
pub use crate::entry::ZipEntry;
pub use crate::file::{CentralDirectorySummary, ZipFile};
pub use crate::opts::EntryOptions;
pub use crate::read::ZipEntryReader;
pub use crate::spec::{Compression, DeflateOption, ZipField};
pub use crate::torrentzip::{compare_names, TorrentZipViolation};
pub use crate::write::EntryWriter;
