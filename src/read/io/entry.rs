// Copyright (c) 2022 Harry [Majored] [hello@majored.pw]
// MIT License (https://github.com/Majored/rs-async-zip/blob/main/LICENSE)

use crate::entry::ZipEntry;
use crate::error::{Result, ZipError};
use crate::read::io::{compressed::CompressedReader, hashed::HashedReader};
use crate::spec::Compression;

use std::io::{BufReader, Read, Seek, SeekFrom, Take};

/// A ZIP entry reader which may implement decompression.
///
/// When opened raw, the entry's compressed bytes are returned exactly as stored and no integrity checks apply.
pub struct ZipEntryReader<'a, R> {
    reader: HashedReader<CompressedReader<BufReader<Take<&'a mut R>>>>,
    entry: ZipEntry,
    raw: bool,
}

impl<'a, R> ZipEntryReader<'a, R>
where
    R: Read + Seek,
{
    /// Constructs a new entry reader positioned at the start of the entry's data.
    pub(crate) fn new(reader: &'a mut R, entry: &ZipEntry, raw: bool) -> Result<Self> {
        if entry.flags.encrypted() {
            return Err(ZipError::FeatureNotSupported("encryption"));
        }

        let compression = if raw { Compression::Stored } else { entry.compression()? };

        reader.seek(SeekFrom::Start(entry.data_offset()))?;
        let reader = HashedReader::new(CompressedReader::new(
            BufReader::new(reader.take(entry.compressed_size())),
            compression,
        ));

        Ok(Self { reader, entry: entry.clone(), raw })
    }

    /// Returns the entry this reader is streaming.
    pub fn entry(&self) -> &ZipEntry {
        &self.entry
    }

    /// Returns whether this reader returns the entry's bytes exactly as stored.
    pub fn raw(&self) -> bool {
        self.raw
    }

    /// Returns the CRC32 of the bytes read so far.
    ///
    /// This only matches the entry's CRC32 once EOF has been reached.
    pub fn compute_hash(&self) -> u32 {
        self.reader.crc32()
    }

    /// Reads all bytes until EOF has been reached, appending them to buf, and verifies the size and CRC32 values.
    ///
    /// This is a helper function synonymous to [`Read::read_to_end()`]. Raw readers skip verification.
    pub fn read_to_end_checked(&mut self, buf: &mut Vec<u8>) -> Result<usize> {
        let read = self.read_to_end(buf)?;

        if self.raw {
            return Ok(read);
        }

        self.verify()?;
        Ok(read)
    }

    /// Checks everything read so far against the entry's uncompressed size and CRC32.
    pub(crate) fn verify(&self) -> Result<()> {
        let read = self.reader.read_count();
        if read != self.entry.uncompressed_size() {
            return Err(ZipError::UncompressedSizeMismatch { expected: self.entry.uncompressed_size(), actual: read });
        }

        let actual = self.compute_hash();
        if actual != self.entry.crc32() {
            return Err(ZipError::CRC32CheckError { expected: self.entry.crc32(), actual });
        }

        Ok(())
    }
}

impl<'a, R> Read for ZipEntryReader<'a, R>
where
    R: Read + Seek,
{
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.reader.read(buf)
    }
}
