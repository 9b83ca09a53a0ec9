// Copyright Cognite AS, 2023

use crate::opts::EntryOptions;
use crate::read::ZipEntryReader;
use crate::spec::consts::{EMPTY_DEFLATE_STREAM, NON_ZIP64_MAX_SIZE, ZIP64_EOCDL_SIGNATURE, ZIP64_EOCDR_SIGNATURE};
use crate::tests::init_logger;
use crate::tests::write::MemoryWriter;

use std::io::{Cursor, Read, Write};

fn contains_signature(data: &[u8], signature: u32) -> bool {
    data.windows(4).any(|window| window == signature.to_le_bytes())
}

/// Test writing a small file. No zip64 structures should be emitted.
#[test]
fn test_write_small_file_has_no_zip64() {
    init_logger();

    let mut writer = MemoryWriter::new();
    writer.write_entry("file1", &[0, 0, 0, 0], EntryOptions::default()).unwrap();
    writer.write_entry("file2", &[0, 0, 0, 0], EntryOptions::default()).unwrap();
    let data = writer.finish();

    assert!(!contains_signature(&data, ZIP64_EOCDR_SIGNATURE));
    assert!(!contains_signature(&data, ZIP64_EOCDL_SIGNATURE));

    let mut zip = zip::read::ZipArchive::new(Cursor::new(data)).unwrap();
    let mut file1 = zip.by_name("file1").unwrap();
    let mut buffer = Vec::new();
    file1.read_to_end(&mut buffer).unwrap();
    assert_eq!(buffer.as_slice(), &[0, 0, 0, 0]);
}

/// Test writing a zip64 file with u16::MAX entries.
#[test]
fn test_write_zip64_file_many_entries() {
    init_logger();

    let mut writer = MemoryWriter::new();
    for i in 0..u16::MAX as u32 {
        writer.write_entry(&format!("{i:05}"), &[], EntryOptions::default()).unwrap();
    }
    let data = writer.finish();

    // The classic record can't hold the count, so it's saturated and the real one lives in the Zip64 record.
    let eocdr = data.len() - 22 - 22;
    assert_eq!(&data[eocdr + 10..eocdr + 12], &[0xFF, 0xFF]);
    assert!(contains_signature(&data[eocdr - 20..eocdr], ZIP64_EOCDL_SIGNATURE));

    let mut cursor = Cursor::new(data);
    let file = crate::read::file(&mut cursor).expect("failed to read zip64 archive");
    assert!(file.zip64());
    assert!(file.torrentzip());
    assert_eq!(file.entries().len(), u16::MAX as usize);
    assert_eq!(file.entries()[1234].filename(), "01234");

    let zip = zip::read::ZipArchive::new(cursor).unwrap();
    assert_eq!(zip.len(), u16::MAX as usize);
}

/// A raw entry declaring an uncompressed size over 4 GiB gets a Zip64 extended information field without writing
/// that much data.
#[test]
fn test_write_declared_large_entry() {
    init_logger();

    let declared = NON_ZIP64_MAX_SIZE as u64 + 1;

    let mut writer = MemoryWriter::new();
    let options = EntryOptions::new().raw(true);
    let mut entry_writer = writer.entry_writer("large.bin", declared, options).unwrap();
    entry_writer.write_all(&EMPTY_DEFLATE_STREAM).unwrap();
    entry_writer.close(0x1234_5678).unwrap();

    let entry = &writer.entries[0];
    assert!(entry.zip64());
    assert_eq!(entry.uncompressed_size(), declared);
    assert_eq!(entry.compressed_size(), 2);

    let data = writer.finish();

    // Version 45, then sentinels in both size slots with the real values in the extra field.
    assert_eq!(&data[4..6], &45u16.to_le_bytes());
    assert_eq!(&data[18..26], &[0xFF; 8]);
    let extra = 30 + "large.bin".len();
    assert_eq!(&data[extra..extra + 4], &[0x01, 0x00, 0x10, 0x00]);
    assert_eq!(&data[extra + 4..extra + 12], &declared.to_le_bytes());
    assert_eq!(&data[extra + 12..extra + 20], &2u64.to_le_bytes());

    let mut cursor = Cursor::new(data);
    let file = crate::read::file(&mut cursor).expect("failed to read archive");
    let entry = &file.entries()[0];
    assert_eq!(entry.uncompressed_size(), declared);
    assert_eq!(entry.compressed_size(), 2);
    assert_eq!(entry.crc32(), 0x1234_5678);
    assert!(file.torrentzip());

    let mut raw = Vec::new();
    ZipEntryReader::new(&mut cursor, entry, true).unwrap().read_to_end(&mut raw).unwrap();
    assert_eq!(raw, EMPTY_DEFLATE_STREAM);
}
