// Copyright (c) 2021-2022 Harry [Majored] [hello@majored.pw]
// MIT License (https://github.com/Majored/rs-async-zip/blob/main/LICENSE)

//! A module which supports writing ZIP files.
//!
//! Entries are streamed one at a time through an [`EntryWriter`]; the central directory and end records are emitted
//! when the owning [`Archive`] is closed.
//!
//! [`Archive`]: crate::Archive

pub(crate) mod compressed_writer;
pub(crate) mod entry_stream;
pub(crate) mod io;

pub use entry_stream::EntryWriter;

use crate::entry::ZipEntry;
use crate::error::Result;
use crate::file::CentralDirectorySummary;
use crate::spec::consts::{
    CDH_SIGNATURE, EOCDR_SIGNATURE, NON_ZIP64_MAX_NUM_FILES, TORRENTZIP_VERSION_MADE_BY,
    TORRENTZIP_VERSION_NEEDED_ZIP64, ZIP64_CD_OFFSET_THRESHOLD, ZIP64_EOCDL_SIGNATURE, ZIP64_EOCDR_RECORD_SIZE,
    ZIP64_EOCDR_SIGNATURE,
};
use crate::spec::extra_field::zip64_extra_field_bytes;
use crate::spec::header::{
    CentralDirectoryRecord, EndOfCentralDirectoryHeader, Zip64EndOfCentralDirectoryLocator,
    Zip64EndOfCentralDirectoryRecord,
};
use crate::spec::ZipField;
use crate::torrentzip;
use io::offset::OffsetWriter;

use std::io::{Seek, Write};

/// Whether a write session has an entry in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum WriteSlot {
    #[default]
    Idle,
    /// A local header was started at this offset but the entry was never committed.
    Writing { header_offset: u64 },
}

/// Serialise the central directory for the given entries.
pub(crate) fn central_directory(entries: &[ZipEntry]) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();

    for entry in entries {
        let extra_field =
            zip64_extra_field_bytes(&[entry.uncompressed_size, entry.compressed_size, entry.header_offset]);

        let header = CentralDirectoryRecord {
            v_made_by: TORRENTZIP_VERSION_MADE_BY,
            v_needed: entry.version_needed,
            flags: entry.flags,
            compression: entry.compression,
            mod_time: entry.last_modification_date.time(),
            mod_date: entry.last_modification_date.date(),
            crc: entry.crc32,
            compressed_size: entry.compressed_size.header_value(),
            uncompressed_size: entry.uncompressed_size.header_value(),
            file_name_length: entry.filename_raw.len() as u16,
            extra_field_length: extra_field.len() as u16,
            file_comment_length: 0,
            disk_start: 0,
            inter_attr: 0,
            exter_attr: 0,
            lh_offset: entry.header_offset.header_value(),
        };

        buffer.write_all(&CDH_SIGNATURE.to_le_bytes())?;
        buffer.write_all(&header.as_slice())?;
        buffer.write_all(&entry.filename_raw)?;
        buffer.write_all(&extra_field)?;
    }

    Ok(buffer)
}

/// Writes the central directory and end records for the given entries.
///
/// The TorrentZip comment is stamped when the entries pass every TorrentZip check; otherwise the comment is empty.
/// On failure the writer is moved back to where the central directory started.
#[tracing::instrument(skip(writer, entries), fields(entries = entries.len()))]
pub(crate) fn close<W: Write + Seek>(
    writer: &mut OffsetWriter<W>,
    entries: &[ZipEntry],
) -> Result<CentralDirectorySummary> {
    let cd_offset = writer.offset();
    match write_trailer(writer, entries, cd_offset) {
        Ok(directory) => Ok(directory),
        Err(err) => {
            discard_trailer(writer, cd_offset);
            Err(err)
        }
    }
}

/// Moves the writer back over a partially written trailer so closing can be retried.
pub(crate) fn discard_trailer<W: Write + Seek>(writer: &mut OffsetWriter<W>, cd_offset: u64) {
    if let Err(err) = writer.rewind(cd_offset) {
        tracing::warn!(%err, cd_offset, "unable to rewind over a partial central directory");
    }
}

fn write_trailer<W: Write + Seek>(
    writer: &mut OffsetWriter<W>,
    entries: &[ZipEntry],
    cd_offset: u64,
) -> Result<CentralDirectorySummary> {
    let cd = central_directory(entries)?;
    let crc32 = crc32fast::hash(&cd);

    let comment = match torrentzip::check_entries(entries, cd_offset) {
        Ok(()) => torrentzip::comment(crc32),
        Err(violation) => {
            tracing::debug!(%violation, "not stamping TorrentZip comment");
            Vec::new()
        }
    };

    writer.write_all(&cd)?;
    let zip64_eocdr_offset =
        end_of_central_directory(writer, cd_offset, cd.len() as u64, entries.len() as u64, &comment)?;

    tracing::debug!(cd_offset, cd_size = cd.len(), zip64 = zip64_eocdr_offset.is_some(), "wrote central directory");

    Ok(CentralDirectorySummary {
        entries: entries.len() as u64,
        size: cd.len() as u64,
        offset: cd_offset,
        zip64_eocdr_offset,
        crc32,
    })
}

/// Write the end of central directory record, preceded by the Zip64 record and locator when any value overflows.
///
/// A central directory starting at [`ZIP64_CD_OFFSET_THRESHOLD`] or beyond is always located through the Zip64 record.
///
/// Returns the offset of the Zip64 record if one was written.
pub(crate) fn end_of_central_directory<W: Write + Seek>(
    writer: &mut OffsetWriter<W>,
    cd_offset: u64,
    cd_size: u64,
    num_entries: u64,
    comment: &[u8],
) -> Result<Option<u64>> {
    let offset = if cd_offset >= ZIP64_CD_OFFSET_THRESHOLD {
        ZipField::Wide(cd_offset)
    } else {
        ZipField::new(cd_offset)
    };
    let size = ZipField::new(cd_size);
    let zip64 = offset.is_wide() || size.is_wide() || num_entries >= NON_ZIP64_MAX_NUM_FILES as u64;

    let zip64_eocdr_offset = if zip64 {
        let eocdr_offset = writer.offset();

        let eocdr = Zip64EndOfCentralDirectoryRecord {
            size_of_zip64_end_of_cd_record: ZIP64_EOCDR_RECORD_SIZE,
            version_made_by: TORRENTZIP_VERSION_NEEDED_ZIP64,
            version_needed_to_extract: TORRENTZIP_VERSION_NEEDED_ZIP64,
            disk_number: 0,
            disk_number_start_of_cd: 0,
            num_entries_in_directory_on_disk: num_entries,
            num_entries_in_directory: num_entries,
            directory_size: cd_size,
            offset_of_start_of_directory: cd_offset,
        };
        writer.write_all(&ZIP64_EOCDR_SIGNATURE.to_le_bytes())?;
        writer.write_all(&eocdr.as_bytes())?;

        let eocdl = Zip64EndOfCentralDirectoryLocator {
            number_of_disk_with_start_of_zip64_end_of_central_directory: 0,
            relative_offset: eocdr_offset,
            total_number_of_disks: 1,
        };
        writer.write_all(&ZIP64_EOCDL_SIGNATURE.to_le_bytes())?;
        writer.write_all(&eocdl.as_bytes())?;

        Some(eocdr_offset)
    } else {
        None
    };

    let num_entries = num_entries.min(NON_ZIP64_MAX_NUM_FILES as u64) as u16;
    let header = EndOfCentralDirectoryHeader {
        disk_num: 0,
        start_cent_dir_disk: 0,
        num_of_entries_disk: num_entries,
        num_of_entries: num_entries,
        size_cent_dir: size.header_value(),
        cent_dir_offset: offset.header_value(),
        file_comm_length: comment.len() as u16,
    };

    writer.write_all(&EOCDR_SIGNATURE.to_le_bytes())?;
    writer.write_all(&header.as_slice())?;
    writer.write_all(comment)?;

    Ok(zip64_eocdr_offset)
}
