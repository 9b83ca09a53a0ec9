// Copyright (c) 2024 Harry [Majored] [hello@majored.pw]
// MIT License (https://github.com/Majored/rs-async-zip/blob/main/LICENSE)

//! Verification and production of TorrentZip archives.
//!
//! A TorrentZip archive is a ZIP file whose bytes are fully determined by its logical contents. Every entry carries the
//! same fixed header fields, entries are ordered by [`compare_names`], entries are laid out back to back, and the
//! archive comment holds the CRC32 of the raw central directory:
//!
//! ```text
//! TORRENTZIPPED-1A2B3C4D
//! ```
//!
//! Failing any of these checks only clears the compliance flag; the archive remains readable.

use crate::entry::ZipEntry;
use crate::spec::consts::{TORRENTZIP_COMMENT_LENGTH, TORRENTZIP_COMMENT_PREFIX};

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

/// The first TorrentZip check an archive failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TorrentZipViolation {
    /// The comment is missing or isn't a well-formed TorrentZip comment.
    Comment,
    /// The comment is well formed but holds a different CRC32 than the central directory hashes to.
    CentralDirectoryCrc { expected: u32, actual: u32 },
    /// An entry's headers don't carry the fixed TorrentZip fields, or carry extra fields or a comment.
    EntryFields { index: usize },
    /// An entry sorts before its predecessor.
    Ordering { index: usize },
    /// A directory entry has no entry beneath it.
    SuperfluousDirectory { index: usize },
    /// An entry (or the central directory when `index` equals the entry count) doesn't directly follow its predecessor.
    Layout { index: usize },
}

impl Display for TorrentZipViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Comment => write!(f, "missing or malformed TorrentZip comment"),
            Self::CentralDirectoryCrc { expected, actual } => {
                write!(f, "central directory CRC mismatch (comment: {expected:08X}, actual: {actual:08X})")
            }
            Self::EntryFields { index } => write!(f, "entry {index} has non-canonical header fields"),
            Self::Ordering { index } => write!(f, "entry {index} is out of order"),
            Self::SuperfluousDirectory { index } => write!(f, "directory entry {index} has no children"),
            Self::Layout { index } => write!(f, "entry {index} isn't contiguous with its predecessor"),
        }
    }
}

fn fold(byte: &u8) -> u8 {
    byte.to_ascii_lowercase()
}

/// Compares two names the way TorrentZip orders entries.
///
/// Names are compared byte-wise with `A..=Z` folded to lowercase; a name which is a prefix of another sorts first. No
/// locale or Unicode case mapping is applied.
pub fn compare_names(a: &[u8], b: &[u8]) -> Ordering {
    a.iter().map(fold).cmp(b.iter().map(fold))
}

fn starts_with_folded(name: &[u8], prefix: &[u8]) -> bool {
    name.len() >= prefix.len() && compare_names(&name[..prefix.len()], prefix) == Ordering::Equal
}

/// Builds the 22 byte comment for a central directory with the given CRC32.
pub(crate) fn comment(cd_crc32: u32) -> Vec<u8> {
    let mut comment = Vec::with_capacity(TORRENTZIP_COMMENT_LENGTH);
    comment.extend_from_slice(TORRENTZIP_COMMENT_PREFIX);
    comment.extend_from_slice(format!("{cd_crc32:08X}").as_bytes());
    comment
}

/// Parses the CRC32 out of a TorrentZip comment.
///
/// Only uppercase hex digits are accepted as those are the only ones the comment is ever written with.
pub(crate) fn parse_comment(comment: &[u8]) -> Option<u32> {
    if comment.len() != TORRENTZIP_COMMENT_LENGTH || !comment.starts_with(TORRENTZIP_COMMENT_PREFIX) {
        return None;
    }

    let digits = &comment[TORRENTZIP_COMMENT_PREFIX.len()..];
    if !digits.iter().all(|digit| matches!(digit, b'0'..=b'9' | b'A'..=b'F')) {
        return None;
    }

    let digits = std::str::from_utf8(digits).ok()?;
    u32::from_str_radix(digits, 16).ok()
}

/// Checks the comment of an archive against the CRC32 of its central directory.
pub(crate) fn check_comment(comment: &[u8], cd_crc32: u32) -> Result<(), TorrentZipViolation> {
    match parse_comment(comment) {
        None => Err(TorrentZipViolation::Comment),
        Some(expected) if expected != cd_crc32 => {
            Err(TorrentZipViolation::CentralDirectoryCrc { expected, actual: cd_crc32 })
        }
        Some(_) => Ok(()),
    }
}

/// Checks everything about a sequence of entries that doesn't depend on the comment.
///
/// `cd_offset` is where the central directory starts (or would start, when called before it's written).
pub(crate) fn check_entries(entries: &[ZipEntry], cd_offset: u64) -> Result<(), TorrentZipViolation> {
    if let Some(index) = entries.iter().position(|entry| !entry.torrentzip) {
        return Err(TorrentZipViolation::EntryFields { index });
    }

    for (index, pair) in entries.windows(2).enumerate() {
        if compare_names(pair[0].filename_raw(), pair[1].filename_raw()) == Ordering::Greater {
            return Err(TorrentZipViolation::Ordering { index: index + 1 });
        }
    }

    if let Some(index) = superfluous_directory(entries) {
        return Err(TorrentZipViolation::SuperfluousDirectory { index });
    }

    check_layout(entries, cd_offset)
}

/// Finds the first directory entry which no other entry lives beneath.
///
/// Entries sharing a case-folded prefix form a contiguous run once sorted, so a lower bound search over the sorted
/// names finds a child regardless of where it sits in the archive.
fn superfluous_directory(entries: &[ZipEntry]) -> Option<usize> {
    let mut sorted: Vec<&[u8]> = entries.iter().map(|entry| entry.filename_raw()).collect();
    sorted.sort_by(|a, b| compare_names(a, b));

    entries.iter().position(|entry| {
        if !entry.dir() {
            return false;
        }

        let name = entry.filename_raw();
        let start = sorted.partition_point(|other| compare_names(other, name) == Ordering::Less);
        !sorted[start..]
            .iter()
            .take_while(|other| starts_with_folded(other, name))
            .any(|other| other.len() > name.len())
    })
}

fn check_layout(entries: &[ZipEntry], cd_offset: u64) -> Result<(), TorrentZipViolation> {
    let mut expected = 0;

    for (index, entry) in entries.iter().enumerate() {
        if entry.header_offset_raw() != expected {
            return Err(TorrentZipViolation::Layout { index });
        }
        expected = entry.data_offset() + entry.compressed_size();
    }

    if cd_offset != expected {
        return Err(TorrentZipViolation::Layout { index: entries.len() });
    }

    Ok(())
}
