// Copyright (c) 2022 Harry [Majored] [hello@majored.pw]
// MIT License (https://github.com/Majored/rs-async-zip/blob/main/LICENSE)

pub(crate) mod offset;
mod zip64;

use crate::entry::ZipEntry;
use crate::error::{ErrorKind, Result, ZipError};
use crate::opts::EntryOptions;
use crate::read::ZipEntryReader;
use crate::spec::consts::EMPTY_DEFLATE_STREAM;
use crate::spec::Compression;
use crate::tests::init_logger;
use crate::write::io::offset::OffsetWriter;
use crate::write::{EntryWriter, WriteSlot};
use crate::ZipDateTime;

use std::io::{Cursor, Write};

/// The state an archive session keeps while writing, over an in-memory buffer.
pub(crate) struct MemoryWriter {
    pub writer: OffsetWriter<Cursor<Vec<u8>>>,
    pub entries: Vec<ZipEntry>,
    pub slot: WriteSlot,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self { writer: OffsetWriter::new(Cursor::new(Vec::new())), entries: Vec::new(), slot: WriteSlot::Idle }
    }

    pub fn entry_writer(
        &mut self,
        name: &str,
        uncompressed_size: u64,
        options: EntryOptions,
    ) -> Result<EntryWriter<'_, Cursor<Vec<u8>>>> {
        EntryWriter::from_raw(&mut self.writer, &mut self.entries, &mut self.slot, name, uncompressed_size, options)
    }

    pub fn write_entry(&mut self, name: &str, data: &[u8], options: EntryOptions) -> Result<()> {
        let mut writer = self.entry_writer(name, data.len() as u64, options)?;
        writer.write_all(data)?;
        writer.close(crc32fast::hash(data))
    }

    pub fn finish(mut self) -> Vec<u8> {
        crate::write::close(&mut self.writer, &self.entries).expect("failed to write central directory");
        self.writer.into_inner().into_inner()
    }
}

fn read_back(data: Vec<u8>) -> (crate::file::ZipFile, Vec<Vec<u8>>) {
    let mut cursor = Cursor::new(data);
    let file = crate::read::file(&mut cursor).expect("failed to read archive");

    let contents = file
        .entries()
        .iter()
        .map(|entry| {
            let mut reader = ZipEntryReader::new(&mut cursor, entry, false).unwrap();
            let mut buffer = Vec::new();
            reader.read_to_end_checked(&mut buffer).expect("failed to read entry");
            buffer
        })
        .collect();

    (file, contents)
}

#[test]
fn canonical_entries_are_stamped() {
    init_logger();

    let mut writer = MemoryWriter::new();
    writer.write_entry("a.bin", &[0x00, 0x01, 0x02], EntryOptions::default()).unwrap();
    writer.write_entry("b.bin", &[], EntryOptions::default()).unwrap();
    let data = writer.finish();

    let comment_start = data.len() - 22;
    assert!(data[comment_start..].starts_with(b"TORRENTZIPPED-"));

    let (file, contents) = read_back(data);
    assert!(file.torrentzip());
    assert_eq!(contents, vec![vec![0x00, 0x01, 0x02], vec![]]);
    assert_eq!(file.entries()[0].crc32(), crc32fast::hash(&[0x00, 0x01, 0x02]));
    assert_eq!(file.entries()[1].crc32(), 0);
}

#[test]
fn empty_deflate_entries_hold_the_empty_stream() {
    let mut writer = MemoryWriter::new();
    writer.write_entry("empty", &[], EntryOptions::default()).unwrap();

    let entry = &writer.entries[0];
    assert_eq!(entry.compressed_size(), 2);
    assert_eq!(entry.compression_method(), 8);

    let data = writer.finish();
    assert_eq!(&data[30 + 5..30 + 5 + 2], &EMPTY_DEFLATE_STREAM);
}

#[test]
fn local_header_is_patched() {
    let data = b"Lorem ipsum dolor sit amet, consectetur adipiscing elit, sed do eiusmod tempor incididunt...";

    let mut writer = MemoryWriter::new();
    writer.write_entry("foo.bar", data, EntryOptions::default()).unwrap();
    let compressed = writer.entries[0].compressed_size() as u32;
    let bytes = writer.finish();

    assert_eq!(&bytes[14..18], &crc32fast::hash(data).to_le_bytes());
    assert_eq!(&bytes[18..22], &compressed.to_le_bytes());
    assert_eq!(&bytes[22..26], &(data.len() as u32).to_le_bytes());
}

#[test]
fn stored_entries_are_not_canonical() {
    let mut writer = MemoryWriter::new();
    let options = EntryOptions::new().compression(Compression::Stored);
    writer.write_entry("foo.bar", b"foo bar", options).unwrap();

    let entry = &writer.entries[0];
    assert_eq!(entry.flags(), 0);
    assert_eq!(entry.compressed_size(), 7);
    assert!(!entry.torrentzip());

    let (file, contents) = read_back(writer.finish());
    assert!(file.comment().is_empty());
    assert!(!file.torrentzip());
    assert_eq!(contents[0], b"foo bar");
}

#[test]
fn custom_dates_are_not_canonical() {
    let mut writer = MemoryWriter::new();
    let options = EntryOptions::new().last_modification_date(ZipDateTime::new(2024, 1, 1, 0, 0, 0));
    writer.write_entry("foo.bar", b"foo bar", options).unwrap();

    let (file, _) = read_back(writer.finish());
    assert_eq!(file.entries()[0].last_modification_date().year(), 2024);
    assert!(!file.torrentzip());
}

#[test]
fn unicode_names_keep_compliance() {
    let mut writer = MemoryWriter::new();
    writer.write_entry("caf\u{e9}.bin", b"coffee", EntryOptions::default()).unwrap();
    assert_eq!(writer.entries[0].flags(), 0x0802);

    let (file, contents) = read_back(writer.finish());
    assert!(file.torrentzip());
    assert_eq!(file.entries()[0].filename(), "caf\u{e9}.bin");
    assert_eq!(contents[0], b"coffee");
}

#[test]
fn short_writes_fail_integrity() {
    let mut writer = MemoryWriter::new();

    let mut entry_writer = writer.entry_writer("foo.bar", 5, EntryOptions::default()).unwrap();
    entry_writer.write_all(b"foo").unwrap();
    let err = entry_writer.close(crc32fast::hash(b"foo")).unwrap_err();

    assert!(matches!(err, ZipError::UncompressedSizeMismatch { expected: 5, actual: 3 }));
    assert_eq!(err.kind(), ErrorKind::Integrity);
    assert!(writer.entries.is_empty());
    assert_eq!(writer.slot, WriteSlot::Writing { header_offset: 0 });
}

#[test]
fn wrong_crc_fails_integrity() {
    let mut writer = MemoryWriter::new();

    let mut entry_writer = writer.entry_writer("foo.bar", 3, EntryOptions::default()).unwrap();
    entry_writer.write_all(b"foo").unwrap();
    let err = entry_writer.close(0xDEAD_BEEF).unwrap_err();

    assert!(matches!(err, ZipError::CRC32CheckError { expected: 0xDEAD_BEEF, .. }));
    assert!(writer.entries.is_empty());
}

#[test]
fn invalid_names_are_rejected_up_front() {
    let mut writer = MemoryWriter::new();

    for name in ["", "/abs", "dir\\file"] {
        let result = writer.entry_writer(name, 0, EntryOptions::default());
        assert!(matches!(result, Err(ZipError::InvalidFileName(_))), "{name:?} was accepted");
    }

    assert_eq!(writer.slot, WriteSlot::Idle);
    assert_eq!(writer.writer.offset(), 0);
}

#[test]
fn raw_copy_reproduces_the_archive() {
    init_logger();

    let data = b"Lorem ipsum dolor sit amet, consectetur adipiscing elit. Lorem ipsum dolor sit amet.";

    let mut source = MemoryWriter::new();
    source.write_entry("lorem.txt", data, EntryOptions::default()).unwrap();
    let source = source.finish();

    let mut cursor = Cursor::new(source.clone());
    let file = crate::read::file(&mut cursor).unwrap();
    let entry = &file.entries()[0];

    let mut compressed = Vec::new();
    let mut reader = ZipEntryReader::new(&mut cursor, entry, true).unwrap();
    reader.read_to_end_checked(&mut compressed).unwrap();
    assert_eq!(compressed.len() as u64, entry.compressed_size());

    let mut copy = MemoryWriter::new();
    let options = EntryOptions::new().raw(true);
    let mut entry_writer = copy.entry_writer("lorem.txt", entry.uncompressed_size(), options).unwrap();
    entry_writer.write_all(&compressed).unwrap();
    entry_writer.close(entry.crc32()).unwrap();

    assert_eq!(copy.finish(), source);
}
