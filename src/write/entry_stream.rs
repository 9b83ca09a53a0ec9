// Copyright (c) 2021 Harry [Majored] [hello@majored.pw]
// MIT License (https://github.com/Majored/rs-async-zip/blob/main/LICENSE)

use crate::entry::{filename_bytes, filename_from_bytes, ZipEntry};
use crate::error::{Result, Zip64ErrorCase, ZipError};
use crate::opts::EntryOptions;
use crate::spec::consts::{
    EMPTY_DEFLATE_STREAM, LFH_LENGTH, LFH_SIGNATURE, NON_ZIP64_MAX_SIZE, SIGNATURE_LENGTH, TORRENTZIP_VERSION_NEEDED,
    TORRENTZIP_VERSION_NEEDED_ZIP64,
};
use crate::spec::extra_field::zip64_extra_field_bytes;
use crate::spec::header::{GeneralPurposeFlag, LocalFileHeader};
use crate::spec::{Compression, ZipField};
use crate::write::compressed_writer::CompressedWriter;
use crate::write::io::offset::OffsetWriter;
use crate::write::WriteSlot;

use std::io::{Seek, Write};

use crc32fast::Hasher;

/// Offset of the CRC32 field from the start of a local file header, signature included.
const LFH_CRC_OFFSET: u64 = 14;

/// An entry writer which streams one entry's data into the archive.
///
/// # Note
/// - This writer cannot be manually constructed; instead, use [`Archive::open_write_stream()`].
/// - [`EntryWriter::close()`] must be called to commit the entry. An entry whose writer was dropped, or whose close
///   failed, stays pending until it's rolled back.
///
/// [`Archive::open_write_stream()`]: crate::Archive::open_write_stream
pub struct EntryWriter<'b, W: Write + Seek> {
    writer: CompressedWriter<'b, W>,
    entries: &'b mut Vec<ZipEntry>,
    slot: &'b mut WriteSlot,
    entry: ZipEntry,
    hasher: Hasher,
    written: u64,
    raw: bool,
    empty_deflate: bool,
    /// Absolute position of the compressed size within the local header's Zip64 extra field, if it has one.
    zip64_compressed_offset: Option<u64>,
}

impl<'b, W: Write + Seek> EntryWriter<'b, W> {
    #[tracing::instrument(skip(writer, entries, slot))]
    pub(crate) fn from_raw(
        writer: &'b mut OffsetWriter<W>,
        entries: &'b mut Vec<ZipEntry>,
        slot: &'b mut WriteSlot,
        filename: &str,
        uncompressed_size: u64,
        options: EntryOptions,
    ) -> Result<EntryWriter<'b, W>> {
        let filename_raw = filename_bytes(filename)?;
        let header_offset = ZipField::new(writer.offset());
        let uncompressed = ZipField::new(uncompressed_size);
        let zip64 = uncompressed.is_wide() || header_offset.is_wide();

        let mut flags = match options.compression {
            Compression::Deflate => options.deflate_option.flag_bits(),
            Compression::Stored => 0,
        };
        if !filename.is_ascii() {
            flags |= GeneralPurposeFlag::FILENAME_UNICODE;
        }

        // Sizes over the narrow limit go in the Zip64 extra field, and the local header's copy of that field always
        // holds both sizes.
        let extra_field = match uncompressed {
            ZipField::Wide(_) => zip64_extra_field_bytes(&[uncompressed, ZipField::Wide(0)]),
            ZipField::Narrow(_) => Vec::new(),
        };
        let lfh_compressed = if extra_field.is_empty() { 0 } else { NON_ZIP64_MAX_SIZE };

        let lfh = LocalFileHeader {
            version: if zip64 { TORRENTZIP_VERSION_NEEDED_ZIP64 } else { TORRENTZIP_VERSION_NEEDED },
            flags: GeneralPurposeFlag(flags),
            compression: options.compression.into(),
            mod_time: options.last_modification_date.time(),
            mod_date: options.last_modification_date.date(),
            crc: 0,
            compressed_size: lfh_compressed,
            uncompressed_size: uncompressed.header_value(),
            file_name_length: filename_raw.len().try_into().map_err(|_| ZipError::FileNameTooLarge)?,
            extra_field_length: extra_field.len() as u16,
        };

        // Marked before anything is written so a failure part way through the header can still be rolled back.
        *slot = WriteSlot::Writing { header_offset: header_offset.get() };

        writer.write_all(&LFH_SIGNATURE.to_le_bytes())?;
        writer.write_all(&lfh.as_slice())?;
        writer.write_all(&filename_raw)?;
        writer.write_all(&extra_field)?;

        let data_offset = writer.offset();
        let zip64_compressed_offset = (!extra_field.is_empty()).then(|| {
            header_offset.get() + (SIGNATURE_LENGTH + LFH_LENGTH) as u64 + filename_raw.len() as u64 + 4 + 8
        });

        let empty_deflate = !options.raw && options.compression == Compression::Deflate && uncompressed_size == 0;
        let stream_compression = if options.raw || empty_deflate { Compression::Stored } else { options.compression };

        let entry = ZipEntry {
            filename: filename_from_bytes(&filename_raw),
            filename_raw,
            compression: lfh.compression,
            flags: lfh.flags,
            version_needed: lfh.version,
            crc32: 0,
            uncompressed_size: uncompressed,
            compressed_size: ZipField::Narrow(0),
            last_modification_date: options.last_modification_date,
            header_offset,
            data_offset,
            zip64,
            torrentzip: false,
            md5: None,
            sha1: None,
        };

        Ok(EntryWriter {
            writer: CompressedWriter::from_raw(writer, stream_compression, options.deflate_option),
            entries,
            slot,
            entry,
            hasher: Hasher::new(),
            written: 0,
            raw: options.raw,
            empty_deflate,
            zip64_compressed_offset,
        })
    }

    /// Returns the number of bytes accepted by this writer so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Consumes this entry writer and commits the entry.
    ///
    /// This includes:
    /// - Finishing the compressed stream.
    /// - Checking the data written against the declared uncompressed size and the supplied CRC32.
    /// - Patching the local file header with the final CRC32 and sizes.
    /// - Appending the entry to the archive's catalog.
    ///
    /// For raw entries the supplied CRC32 and the declared size are trusted as-is.
    pub fn close(self, crc32: u32) -> Result<()> {
        let EntryWriter {
            writer, entries, slot, mut entry, hasher, written, raw, empty_deflate, zip64_compressed_offset
        } = self;
        let writer = writer.into_inner()?;

        let crc = if raw {
            crc32
        } else {
            if written != entry.uncompressed_size() {
                return Err(ZipError::UncompressedSizeMismatch { expected: entry.uncompressed_size(), actual: written });
            }

            let actual = hasher.finalize();
            if actual != crc32 {
                return Err(ZipError::CRC32CheckError { expected: crc32, actual });
            }
            actual
        };

        if empty_deflate {
            writer.write_all(&EMPTY_DEFLATE_STREAM)?;
        }

        let compressed_size = writer.offset() - entry.data_offset;
        let (compressed, lfh_compressed) = match zip64_compressed_offset {
            Some(_) => (ZipField::new(compressed_size), NON_ZIP64_MAX_SIZE),
            None => match u32::try_from(compressed_size) {
                Ok(narrow) if narrow != NON_ZIP64_MAX_SIZE => (ZipField::Narrow(narrow), narrow),
                _ => return Err(ZipError::Zip64Needed(Zip64ErrorCase::LargeFile)),
            },
        };

        let mut patch = Vec::with_capacity(12);
        patch.extend_from_slice(&crc.to_le_bytes());
        patch.extend_from_slice(&lfh_compressed.to_le_bytes());
        patch.extend_from_slice(&entry.uncompressed_size.header_value().to_le_bytes());
        writer.patch(entry.header_offset.get() + LFH_CRC_OFFSET, &patch)?;

        if let Some(offset) = zip64_compressed_offset {
            writer.patch(offset, &compressed_size.to_le_bytes())?;
        }

        entry.crc32 = crc;
        entry.compressed_size = compressed;
        entry.torrentzip = entry.has_torrentzip_fields();

        tracing::debug!(
            filename = entry.filename(),
            crc = %format!("{crc:08X}"),
            compressed_size,
            uncompressed_size = entry.uncompressed_size(),
            "committed entry"
        );

        entries.push(entry);
        *slot = WriteSlot::Idle;
        Ok(())
    }
}

impl<'b, W: Write + Seek> Write for EntryWriter<'b, W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let written = self.writer.write(buf)?;
        self.hasher.update(&buf[..written]);
        self.written += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}
