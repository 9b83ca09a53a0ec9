// Copyright (c) 2022 Harry [Majored] [hello@majored.pw]
// MIT License (https://github.com/Majored/rs-async-zip/blob/main/LICENSE)

pub(crate) mod compression;

use crate::error::{ErrorKind, LocatorError, ZipError};
use crate::read::ZipEntryReader;
use crate::spec::consts::{
    CDH_SIGNATURE, DATA_DESCRIPTOR_SIGNATURE, EMPTY_DEFLATE_STREAM, EOCDR_SIGNATURE, LFH_SIGNATURE,
};
use crate::tests::init_logger;
use crate::torrentzip::TorrentZipViolation;

use std::io::Cursor;

/// An entry to lay out by hand, with its data already in stored form.
pub(crate) struct RawEntry {
    pub name: &'static str,
    pub flags: u16,
    pub method: u16,
    pub crc: u32,
    pub data: Vec<u8>,
    pub uncompressed_size: u32,
    pub descriptor: bool,
}

impl RawEntry {
    pub fn stored(name: &'static str, data: &[u8]) -> Self {
        Self {
            name,
            flags: 0,
            method: 0,
            crc: crc32fast::hash(data),
            data: data.to_vec(),
            uncompressed_size: data.len() as u32,
            descriptor: false,
        }
    }

    /// A zero-length entry carrying every fixed TorrentZip field.
    pub fn canonical_empty(name: &'static str) -> Self {
        Self {
            name,
            flags: 2,
            method: 8,
            crc: 0,
            data: EMPTY_DEFLATE_STREAM.to_vec(),
            uncompressed_size: 0,
            descriptor: false,
        }
    }
}

pub(crate) fn push16(buffer: &mut Vec<u8>, value: u16) {
    buffer.extend_from_slice(&value.to_le_bytes());
}

pub(crate) fn push32(buffer: &mut Vec<u8>, value: u32) {
    buffer.extend_from_slice(&value.to_le_bytes());
}

/// Lays out local headers and data, returning the bytes and each entry's header offset.
pub(crate) fn local_section(entries: &[RawEntry]) -> (Vec<u8>, Vec<u32>) {
    let mut buffer = Vec::new();
    let mut offsets = Vec::new();

    for entry in entries {
        offsets.push(buffer.len() as u32);
        let (crc, compressed, uncompressed) = match entry.descriptor {
            true => (0, 0, 0),
            false => (entry.crc, entry.data.len() as u32, entry.uncompressed_size),
        };

        push32(&mut buffer, LFH_SIGNATURE);
        push16(&mut buffer, 20);
        push16(&mut buffer, entry.flags);
        push16(&mut buffer, entry.method);
        push16(&mut buffer, 0xBC00);
        push16(&mut buffer, 0x2198);
        push32(&mut buffer, crc);
        push32(&mut buffer, compressed);
        push32(&mut buffer, uncompressed);
        push16(&mut buffer, entry.name.len() as u16);
        push16(&mut buffer, 0);
        buffer.extend_from_slice(entry.name.as_bytes());
        buffer.extend_from_slice(&entry.data);

        if entry.descriptor {
            push32(&mut buffer, DATA_DESCRIPTOR_SIGNATURE);
            push32(&mut buffer, entry.crc);
            push32(&mut buffer, entry.data.len() as u32);
            push32(&mut buffer, entry.uncompressed_size);
        }
    }

    (buffer, offsets)
}

pub(crate) fn central_record(buffer: &mut Vec<u8>, entry: &RawEntry, offset: u32, extra: &[u8]) {
    push32(buffer, CDH_SIGNATURE);
    push16(buffer, 0);
    push16(buffer, 20);
    push16(buffer, entry.flags);
    push16(buffer, entry.method);
    push16(buffer, 0xBC00);
    push16(buffer, 0x2198);
    push32(buffer, entry.crc);
    push32(buffer, entry.data.len() as u32);
    push32(buffer, entry.uncompressed_size);
    push16(buffer, entry.name.len() as u16);
    push16(buffer, extra.len() as u16);
    push16(buffer, 0);
    push16(buffer, 0);
    push16(buffer, 0);
    push32(buffer, 0);
    push32(buffer, offset);
    buffer.extend_from_slice(entry.name.as_bytes());
    buffer.extend_from_slice(extra);
}

pub(crate) fn eocdr(buffer: &mut Vec<u8>, entries: u16, cd_size: u32, cd_offset: u32, comment: &[u8]) {
    push32(buffer, EOCDR_SIGNATURE);
    push16(buffer, 0);
    push16(buffer, 0);
    push16(buffer, entries);
    push16(buffer, entries);
    push32(buffer, cd_size);
    push32(buffer, cd_offset);
    push16(buffer, comment.len() as u16);
    buffer.extend_from_slice(comment);
}

/// Builds a complete archive; the comment is derived from the raw central directory bytes.
pub(crate) fn archive_with(entries: &[RawEntry], comment: impl FnOnce(&[u8]) -> Vec<u8>) -> Vec<u8> {
    let (mut buffer, offsets) = local_section(entries);

    let mut cd = Vec::new();
    for (entry, offset) in entries.iter().zip(offsets) {
        central_record(&mut cd, entry, offset, &[]);
    }

    let cd_offset = buffer.len() as u32;
    let comment = comment(&cd);
    buffer.extend_from_slice(&cd);
    eocdr(&mut buffer, entries.len() as u16, cd.len() as u32, cd_offset, &comment);
    buffer
}

pub(crate) fn archive(entries: &[RawEntry]) -> Vec<u8> {
    archive_with(entries, |_| Vec::new())
}

fn read_entry(data: &mut Cursor<Vec<u8>>, index: usize) -> crate::error::Result<Vec<u8>> {
    let file = crate::read::file(data)?;
    let mut reader = ZipEntryReader::new(data, &file.entries()[index], false)?;
    let mut buffer = Vec::new();
    reader.read_to_end_checked(&mut buffer)?;
    Ok(buffer)
}

#[test]
fn reads_stored_entries() {
    init_logger();

    let data = archive(&[RawEntry::stored("foo.txt", b"foo bar"), RawEntry::stored("bar.txt", b"")]);
    let mut cursor = Cursor::new(data);

    let file = crate::read::file(&mut cursor).expect("failed to read archive");
    assert_eq!(file.entries().len(), 2);
    assert!(!file.zip64());
    assert!(file.comment().is_empty());

    let first = &file.entries()[0];
    assert_eq!(first.filename(), "foo.txt");
    assert_eq!(first.header_offset(), Some(0));
    assert_eq!(first.data_offset(), 30 + 7);
    assert_eq!(file.entries()[1].header_offset(), Some(30 + 7 + 7));

    assert_eq!(read_entry(&mut cursor, 0).unwrap(), b"foo bar");
    assert!(read_entry(&mut cursor, 1).unwrap().is_empty());
}

#[test]
fn empty_archive() {
    let mut cursor = Cursor::new(archive(&[]));
    let file = crate::read::file(&mut cursor).expect("failed to read archive");
    assert!(file.entries().is_empty());
    assert_eq!(file.central_directory().offset(), 0);
}

#[test]
fn zero_length_input_is_rejected() {
    let mut cursor = Cursor::new(Vec::new());
    let result = crate::read::file(&mut cursor);
    assert!(matches!(result, Err(ZipError::Locator(LocatorError::TooShort(0)))));
}

#[test]
fn data_descriptor_entries_are_validated() {
    init_logger();

    let mut entry = RawEntry::stored("foo.txt", b"foo bar");
    entry.flags = 0x8;
    entry.descriptor = true;
    let mut cursor = Cursor::new(archive(&[entry]));

    let file = crate::read::file(&mut cursor).expect("failed to read archive");
    assert!(!file.entries()[0].torrentzip());
    assert_eq!(read_entry(&mut cursor, 0).unwrap(), b"foo bar");
}

#[test]
fn data_descriptor_disagreement_fails() {
    let mut entry = RawEntry::stored("foo.txt", b"foo bar");
    entry.flags = 0x8;
    entry.descriptor = true;
    let mut data = archive(&[entry]);

    // The descriptor's CRC sits right after its signature, which follows the data.
    let at = 30 + 7 + 7 + 4;
    data[at] ^= 0xFF;

    let result = crate::read::file(&mut Cursor::new(data));
    assert!(matches!(result, Err(ZipError::LocalHeaderMismatch { index: 0, field: "crc32" })));
}

#[test]
fn local_crc_tamper_is_structural() {
    let mut data = archive(&[RawEntry::stored("foo.txt", b"foo bar")]);
    data[14] ^= 0x01;

    let err = crate::read::file(&mut Cursor::new(data)).unwrap_err();
    assert!(matches!(err, ZipError::LocalHeaderMismatch { index: 0, field: "crc32" }));
    assert_eq!(err.kind(), ErrorKind::Structural);
}

#[test]
fn local_name_tamper_fails() {
    let mut data = archive(&[RawEntry::stored("foo.txt", b"foo bar")]);
    data[30] = b'g';

    let result = crate::read::file(&mut Cursor::new(data));
    assert!(matches!(result, Err(ZipError::LocalHeaderMismatch { index: 0, field: "file name" })));
}

#[test]
fn spanned_archives_are_rejected() {
    let mut data = archive(&[RawEntry::stored("foo.txt", b"foo bar")]);
    let eocdr = data.len() - 22;
    data[eocdr + 4] = 1;

    let result = crate::read::file(&mut Cursor::new(data));
    assert!(matches!(result, Err(ZipError::FeatureNotSupported(_))));
}

#[test]
fn central_directory_beyond_trailer_fails() {
    let mut data = archive(&[RawEntry::stored("foo.txt", b"foo bar")]);
    let eocdr = data.len() - 22;
    data[eocdr + 16..eocdr + 20].copy_from_slice(&1000u32.to_le_bytes());

    let result = crate::read::file(&mut Cursor::new(data));
    assert!(matches!(result, Err(ZipError::CentralDirectoryOutOfBounds)));
}

#[test]
fn trailing_central_directory_bytes_fail() {
    let entry = RawEntry::stored("foo.txt", b"foo bar");
    let (mut data, offsets) = local_section(std::slice::from_ref(&entry));

    let cd_offset = data.len() as u32;
    let mut cd = Vec::new();
    central_record(&mut cd, &entry, offsets[0], &[]);
    cd.extend_from_slice(&[0, 0, 0, 0]);
    data.extend_from_slice(&cd);
    eocdr(&mut data, 1, cd.len() as u32, cd_offset, b"");

    let result = crate::read::file(&mut Cursor::new(data));
    assert!(matches!(result, Err(ZipError::CentralDirectorySizeMismatch { expected: 57, actual: 53 })));
}

#[test]
fn corrupt_data_fails_on_read_only() {
    let mut entry = RawEntry::stored("foo.txt", b"foo bar");
    entry.crc ^= 1;
    let mut cursor = Cursor::new(archive(&[entry]));

    let err = read_entry(&mut cursor, 0).unwrap_err();
    assert!(matches!(err, ZipError::CRC32CheckError { .. }));
    assert_eq!(err.kind(), ErrorKind::Integrity);
}

#[test]
fn raw_reads_skip_checks() {
    let mut entry = RawEntry::stored("foo.txt", b"foo bar");
    entry.crc ^= 1;
    let mut cursor = Cursor::new(archive(&[entry]));

    let file = crate::read::file(&mut cursor).unwrap();
    let mut reader = ZipEntryReader::new(&mut cursor, &file.entries()[0], true).unwrap();
    let mut buffer = Vec::new();
    reader.read_to_end_checked(&mut buffer).expect("raw reads aren't verified");
    assert_eq!(buffer, b"foo bar");
}

#[test]
fn encrypted_entries_fail_at_stream_open() {
    let mut entry = RawEntry::stored("foo.txt", b"foo bar");
    entry.flags = 0x1;
    let mut cursor = Cursor::new(archive(&[entry]));

    let file = crate::read::file(&mut cursor).expect("encrypted entries can still be listed");
    let result = ZipEntryReader::new(&mut cursor, &file.entries()[0], false);
    assert!(matches!(result, Err(ZipError::FeatureNotSupported("encryption"))));
}

#[test]
fn quick_open_reads_local_header() {
    let mut cursor = Cursor::new(archive(&[RawEntry::stored("a", b"1"), RawEntry::stored("b", b"22")]));

    let entry = crate::read::lfh(&mut cursor, 32).expect("failed to read local header");
    assert_eq!(entry.filename(), "b");
    assert_eq!(entry.uncompressed_size(), 2);
    assert_eq!(entry.data_offset(), 32 + 31);

    let mut reader = ZipEntryReader::new(&mut cursor, &entry, false).unwrap();
    let mut buffer = Vec::new();
    reader.read_to_end_checked(&mut buffer).unwrap();
    assert_eq!(buffer, b"22");
}

#[test]
fn quick_open_rejects_deferred_sizes() {
    let mut entry = RawEntry::stored("a", b"1");
    entry.flags = 0x8;
    entry.descriptor = true;
    let mut cursor = Cursor::new(archive(&[entry]));

    assert!(matches!(crate::read::lfh(&mut cursor, 0), Err(ZipError::FeatureNotSupported(_))));
}

#[test]
fn torrentzip_comment_is_verified() {
    init_logger();

    let entries = [RawEntry::canonical_empty("a.bin"), RawEntry::canonical_empty("b.bin")];
    let data = archive_with(&entries, |cd| crate::torrentzip::comment(crc32fast::hash(cd)));
    let file = crate::read::file(&mut Cursor::new(data)).unwrap();
    assert!(file.torrentzip());
    assert!(file.entries().iter().all(|entry| entry.torrentzip()));

    let data = archive_with(&entries, |cd| crate::torrentzip::comment(crc32fast::hash(cd) ^ 1));
    let file = crate::read::file(&mut Cursor::new(data)).unwrap();
    assert!(matches!(file.torrentzip_violation(), Some(TorrentZipViolation::CentralDirectoryCrc { .. })));
}

#[test]
fn torrentzip_ordering_is_verified() {
    let entries = [RawEntry::canonical_empty("b.bin"), RawEntry::canonical_empty("A.bin")];
    let data = archive_with(&entries, |cd| crate::torrentzip::comment(crc32fast::hash(cd)));

    let file = crate::read::file(&mut Cursor::new(data)).expect("reordered archives remain readable");
    assert_eq!(file.torrentzip_violation(), Some(TorrentZipViolation::Ordering { index: 1 }));
}

#[test]
fn childless_directory_breaks_compliance() {
    let entries = [RawEntry::canonical_empty("empty/"), RawEntry::canonical_empty("z.bin")];
    let data = archive_with(&entries, |cd| crate::torrentzip::comment(crc32fast::hash(cd)));

    let file = crate::read::file(&mut Cursor::new(data)).unwrap();
    assert_eq!(file.torrentzip_violation(), Some(TorrentZipViolation::SuperfluousDirectory { index: 0 }));
}

#[test]
fn directory_with_child_is_compliant() {
    let entries = [RawEntry::canonical_empty("dir/"), RawEntry::canonical_empty("dir/a.bin")];
    let data = archive_with(&entries, |cd| crate::torrentzip::comment(crc32fast::hash(cd)));

    let file = crate::read::file(&mut Cursor::new(data)).unwrap();
    assert_eq!(file.torrentzip_violation(), None);
    assert!(file.torrentzip());
}

#[test]
fn central_attributes_break_compliance() {
    let entries = [RawEntry::canonical_empty("a.bin"), RawEntry::canonical_empty("b.bin")];
    let mut data = archive_with(&entries, |_| Vec::new());

    // External attributes of the first central record, then re-stamp the comment over the altered directory.
    let cd_offset = data.len() - 22 - (2 * (46 + 5));
    data[cd_offset + 38] = 0x20;
    let crc = crc32fast::hash(&data[cd_offset..data.len() - 22]);
    let length = data.len();
    data[length - 2..].copy_from_slice(&22u16.to_le_bytes());
    data.extend_from_slice(&crate::torrentzip::comment(crc));

    let file = crate::read::file(&mut Cursor::new(data)).unwrap();
    assert_eq!(file.torrentzip_violation(), Some(TorrentZipViolation::EntryFields { index: 0 }));
}
