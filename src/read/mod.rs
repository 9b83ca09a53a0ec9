// Copyright (c) 2022-2023 Harry [Majored] [hello@majored.pw]
// MIT License (https://github.com/Majored/rs-async-zip/blob/main/LICENSE)

//! A module which supports reading ZIP files.
//!
//! Opening an archive locates the end of central directory record (and, when its values are saturated, the Zip64
//! chain), parses every central directory record, then revisits each entry's local header to check that it agrees
//! with the central copy. Any disagreement fails the whole open.

pub(crate) mod io;

pub use crate::read::io::entry::ZipEntryReader;

use crate::date::ZipDateTime;
use crate::entry::{filename_from_bytes, ZipEntry};
use crate::error::{Result, ZipError};
use crate::file::{CentralDirectorySummary, ZipFile};
use crate::spec::consts::{
    CDH_SIGNATURE, DATA_DESCRIPTOR_SIGNATURE, LFH_LENGTH, LFH_SIGNATURE, NON_ZIP64_MAX_NUM_FILES, NON_ZIP64_MAX_SIZE,
    SIGNATURE_LENGTH, TORRENTZIP_VERSION_MADE_BY, ZIP64_EOCDL_LENGTH, ZIP64_EOCDL_SIGNATURE, ZIP64_EOCDR_RECORD_SIZE,
    ZIP64_EOCDR_SIGNATURE,
};
use crate::spec::extra_field::{parse_extra_fields, resolve_zip64_fields};
use crate::spec::header::{
    CentralDirectoryRecord, EndOfCentralDirectoryHeader, HeaderId, LocalFileHeader,
    Zip64EndOfCentralDirectoryLocator, Zip64EndOfCentralDirectoryRecord,
};
use crate::spec::ZipField;
use crate::torrentzip;
use crate::utils::{assert_signature, read_bytes, read_bytes_at, read_u32, read_u64};

use std::io::{Cursor, Read, Seek, SeekFrom};

/// The trailing records, resolved down to the values the central directory is found with.
#[derive(Debug)]
struct Trailer {
    summary: CentralDirectorySummary,
    comment: Vec<u8>,
    /// Where the central directory must end: the Zip64 record if there is one, else the EOCDR.
    limit: u64,
}

/// Reads and validates the catalog of an archive.
#[tracing::instrument(skip(reader))]
pub(crate) fn file<R>(reader: &mut R) -> Result<ZipFile>
where
    R: Read + Seek,
{
    let trailer = trailer(reader)?;
    let directory = trailer.summary;

    if directory.offset.checked_add(directory.size).map_or(true, |end| end > trailer.limit) {
        return Err(ZipError::CentralDirectoryOutOfBounds);
    }

    let size = usize::try_from(directory.size).map_err(|_| ZipError::CentralDirectoryOutOfBounds)?;
    let raw = read_bytes_at(reader, directory.offset, size)?;
    let directory = CentralDirectorySummary { crc32: crc32fast::hash(&raw), ..directory };

    let zip64 = directory.zip64_eocdr_offset.is_some();
    let mut entries = cd(&raw, directory.entries, zip64)?;

    for (index, entry) in entries.iter_mut().enumerate() {
        validate_local_header(reader, index, entry)?;
    }

    tracing::debug!(entries = entries.len(), zip64, "parsed central directory");

    let torrentzip = torrentzip::check_comment(&trailer.comment, directory.crc32)
        .and_then(|_| torrentzip::check_entries(&entries, directory.offset))
        .err();

    match torrentzip {
        None => tracing::debug!("archive is TorrentZip compliant"),
        Some(violation) if torrentzip::parse_comment(&trailer.comment).is_some() => {
            tracing::warn!(%violation, "archive claims TorrentZip compliance but fails its checks");
        }
        Some(violation) => tracing::debug!(%violation, "archive isn't TorrentZip compliant"),
    }

    Ok(ZipFile { entries, zip64, comment: trailer.comment, directory, torrentzip })
}

/// Locates and parses the end of central directory record and, when needed, the Zip64 chain behind it.
fn trailer<R>(reader: &mut R) -> Result<Trailer>
where
    R: Read + Seek,
{
    let eocdr_offset = crate::read::io::locator::eocdr(reader)?;

    reader.seek(SeekFrom::Start(eocdr_offset + SIGNATURE_LENGTH as u64))?;
    let eocdr = EndOfCentralDirectoryHeader::from_reader(reader)?;
    let comment = read_bytes(&mut *reader, eocdr.file_comm_length.into())?;
    tracing::debug!(?eocdr, "end of central directory record");

    // Outdated feature so unlikely to ever make it into this crate.
    if eocdr.disk_num != 0 || eocdr.start_cent_dir_disk != 0 || eocdr.num_of_entries_disk != eocdr.num_of_entries {
        return Err(ZipError::FeatureNotSupported("Spanned/split files"));
    }

    let saturated = eocdr.num_of_entries == NON_ZIP64_MAX_NUM_FILES
        || eocdr.size_cent_dir == NON_ZIP64_MAX_SIZE
        || eocdr.cent_dir_offset == NON_ZIP64_MAX_SIZE;

    if !saturated {
        let summary = CentralDirectorySummary {
            entries: eocdr.num_of_entries.into(),
            size: eocdr.size_cent_dir.into(),
            offset: eocdr.cent_dir_offset.into(),
            zip64_eocdr_offset: None,
            crc32: 0,
        };
        return Ok(Trailer { summary, comment, limit: eocdr_offset });
    }

    // The locator sits directly before the EOCDR.
    let locator_offset = eocdr_offset
        .checked_sub(ZIP64_EOCDL_LENGTH + SIGNATURE_LENGTH as u64)
        .ok_or(ZipError::Zip64LocatorInvalid)?;
    reader.seek(SeekFrom::Start(locator_offset))?;
    assert_signature(&mut *reader, ZIP64_EOCDL_SIGNATURE)?;

    let locator = Zip64EndOfCentralDirectoryLocator::from_reader(reader)?;
    if locator.number_of_disk_with_start_of_zip64_end_of_central_directory != 0 || locator.total_number_of_disks != 1
    {
        return Err(ZipError::Zip64LocatorInvalid);
    }
    if locator.relative_offset >= locator_offset {
        return Err(ZipError::Zip64LocatorInvalid);
    }

    reader.seek(SeekFrom::Start(locator.relative_offset))?;
    assert_signature(&mut *reader, ZIP64_EOCDR_SIGNATURE)?;
    let record = Zip64EndOfCentralDirectoryRecord::from_reader(reader)?;
    tracing::debug!(?locator, ?record, "zip64 end of central directory");

    if record.size_of_zip64_end_of_cd_record != ZIP64_EOCDR_RECORD_SIZE {
        return Err(ZipError::Zip64RecordSizeInvalid(record.size_of_zip64_end_of_cd_record));
    }
    if record.disk_number != 0
        || record.disk_number_start_of_cd != 0
        || record.num_entries_in_directory != record.num_entries_in_directory_on_disk
    {
        return Err(ZipError::FeatureNotSupported("Spanned/split files"));
    }

    let summary = CentralDirectorySummary {
        entries: record.num_entries_in_directory,
        size: record.directory_size,
        offset: record.offset_of_start_of_directory,
        zip64_eocdr_offset: Some(locator.relative_offset),
        crc32: 0,
    };
    Ok(Trailer { summary, comment, limit: locator.relative_offset })
}

/// Parses every central directory record from the raw central directory bytes.
pub(crate) fn cd(raw: &[u8], num_of_entries: u64, zip64: bool) -> Result<Vec<ZipEntry>> {
    let num_of_entries: usize = num_of_entries.try_into().map_err(|_| ZipError::CentralDirectoryOutOfBounds)?;
    // Every record is at least 46 bytes, so a bogus count can't force a huge allocation.
    let mut entries = Vec::with_capacity(num_of_entries.min(raw.len() / 46));
    let mut cursor = Cursor::new(raw);

    for _ in 0..num_of_entries {
        entries.push(cd_record(&mut cursor, zip64)?);
    }

    if cursor.position() != raw.len() as u64 {
        return Err(ZipError::CentralDirectorySizeMismatch { expected: raw.len() as u64, actual: cursor.position() });
    }

    Ok(entries)
}

pub(crate) fn cd_record<R>(mut reader: R, zip64: bool) -> Result<ZipEntry>
where
    R: Read,
{
    assert_signature(&mut reader, CDH_SIGNATURE)?;

    let header = CentralDirectoryRecord::from_reader(&mut reader)?;
    let filename_raw = read_bytes(&mut reader, header.file_name_length.into())?;
    let extra_field = read_bytes(&mut reader, header.extra_field_length.into())?;
    let comment = read_bytes(&mut reader, header.file_comment_length.into())?;

    let extra_fields = parse_extra_fields(&extra_field)?;
    let resolved =
        resolve_zip64_fields(&extra_fields, header.uncompressed_size, header.compressed_size, Some(header.lh_offset))?;
    let header_offset = resolved.header_offset.unwrap_or(ZipField::Narrow(header.lh_offset));

    let own_zip64 =
        resolved.uncompressed_size.is_wide() || resolved.compressed_size.is_wide() || header_offset.is_wide();
    let foreign_extras =
        extra_fields.iter().any(|field| field.header_id != HeaderId::ZIP64_EXTENDED_INFORMATION_EXTRA_FIELD);

    let mut entry = ZipEntry {
        filename: filename_from_bytes(&filename_raw),
        filename_raw,
        compression: header.compression,
        flags: header.flags,
        version_needed: header.v_needed,
        crc32: header.crc,
        uncompressed_size: resolved.uncompressed_size,
        compressed_size: resolved.compressed_size,
        last_modification_date: ZipDateTime::from_raw(header.mod_date, header.mod_time),
        header_offset,
        data_offset: 0,
        zip64: own_zip64 || zip64,
        torrentzip: false,
        md5: None,
        sha1: None,
    };

    let fixed_record =
        header.v_made_by == TORRENTZIP_VERSION_MADE_BY && header.inter_attr == 0 && header.exter_attr == 0;
    entry.torrentzip = entry.has_torrentzip_fields() && fixed_record && !foreign_extras && comment.is_empty();

    Ok(entry)
}

/// Checks an entry's local header against its central directory copy, and records where its data starts.
#[tracing::instrument(skip(reader, entry))]
pub(crate) fn validate_local_header<R>(reader: &mut R, index: usize, entry: &mut ZipEntry) -> Result<()>
where
    R: Read + Seek,
{
    let mismatch = |field| ZipError::LocalHeaderMismatch { index, field };

    reader.seek(SeekFrom::Start(entry.header_offset_raw()))?;
    assert_signature(&mut *reader, LFH_SIGNATURE)?;

    let header = LocalFileHeader::from_reader(reader)?;
    let filename_raw = read_bytes(&mut *reader, header.file_name_length.into())?;
    let extra_field = read_bytes(&mut *reader, header.extra_field_length.into())?;

    if header.compression != entry.compression {
        return Err(mismatch("compression method"));
    }
    let flags_mask = !crate::spec::header::GeneralPurposeFlag::DATA_DESCRIPTOR;
    if header.flags.0 & flags_mask != entry.flags.0 & flags_mask {
        return Err(mismatch("general purpose flags"));
    }
    if filename_raw != entry.filename_raw {
        return Err(mismatch("file name"));
    }

    entry.data_offset = entry.header_offset_raw()
        + (SIGNATURE_LENGTH + LFH_LENGTH) as u64
        + u64::from(header.file_name_length)
        + u64::from(header.extra_field_length);

    let extra_fields = parse_extra_fields(&extra_field)?;
    let deferred = header.flags.data_descriptor()
        && header.crc == 0
        && header.compressed_size == 0
        && header.uncompressed_size == 0;

    let (crc, compressed_size, uncompressed_size) = if deferred {
        data_descriptor(reader, entry)?
    } else {
        let resolved = resolve_zip64_fields(&extra_fields, header.uncompressed_size, header.compressed_size, None)?;
        (header.crc, resolved.compressed_size.get(), resolved.uncompressed_size.get())
    };

    if crc != entry.crc32 {
        return Err(mismatch("crc32"));
    }
    if compressed_size != entry.compressed_size() {
        return Err(mismatch("compressed size"));
    }
    if uncompressed_size != entry.uncompressed_size() {
        return Err(mismatch("uncompressed size"));
    }

    // Fields which may differ from the central copy without making the archive corrupt, but which the fixed
    // TorrentZip header doesn't allow.
    let foreign_extras =
        extra_fields.iter().any(|field| field.header_id != HeaderId::ZIP64_EXTENDED_INFORMATION_EXTRA_FIELD);
    if header.flags.data_descriptor()
        || header.version != entry.version_needed
        || ZipDateTime::from_raw(header.mod_date, header.mod_time) != entry.last_modification_date
        || foreign_extras
    {
        entry.torrentzip = false;
    }

    Ok(())
}

/// Reads the data descriptor following an entry's data.
///
/// The signature is optional, and the sizes are eight bytes wide only for entries which needed Zip64.
fn data_descriptor<R>(reader: &mut R, entry: &ZipEntry) -> Result<(u32, u64, u64)>
where
    R: Read + Seek,
{
    reader.seek(SeekFrom::Start(entry.data_offset + entry.compressed_size()))?;

    let crc = match read_u32(&mut *reader)? {
        DATA_DESCRIPTOR_SIGNATURE => read_u32(&mut *reader)?,
        crc => crc,
    };

    let wide = entry.uncompressed_size.is_wide() || entry.compressed_size.is_wide();
    let (compressed_size, uncompressed_size) = if wide {
        (read_u64(&mut *reader)?, read_u64(&mut *reader)?)
    } else {
        (u64::from(read_u32(&mut *reader)?), u64::from(read_u32(&mut *reader)?))
    };

    Ok((crc, compressed_size, uncompressed_size))
}

/// Parses a local file header at a known offset without any central directory to check it against.
#[tracing::instrument(skip(reader))]
pub(crate) fn lfh<R>(reader: &mut R, offset: u64) -> Result<ZipEntry>
where
    R: Read + Seek,
{
    reader.seek(SeekFrom::Start(offset))?;
    assert_signature(&mut *reader, LFH_SIGNATURE)?;

    let header = LocalFileHeader::from_reader(reader)?;
    let filename_raw = read_bytes(&mut *reader, header.file_name_length.into())?;
    let extra_field = read_bytes(&mut *reader, header.extra_field_length.into())?;

    if header.flags.data_descriptor() && header.compressed_size == 0 {
        return Err(ZipError::FeatureNotSupported("stream reading entries with data descriptors"));
    }

    let extra_fields = parse_extra_fields(&extra_field)?;
    let resolved = resolve_zip64_fields(&extra_fields, header.uncompressed_size, header.compressed_size, None)?;
    let header_offset = ZipField::new(offset);

    let mut entry = ZipEntry {
        filename: filename_from_bytes(&filename_raw),
        filename_raw,
        compression: header.compression,
        flags: header.flags,
        version_needed: header.version,
        crc32: header.crc,
        uncompressed_size: resolved.uncompressed_size,
        compressed_size: resolved.compressed_size,
        last_modification_date: ZipDateTime::from_raw(header.mod_date, header.mod_time),
        header_offset,
        data_offset: offset
            + (SIGNATURE_LENGTH + LFH_LENGTH) as u64
            + u64::from(header.file_name_length)
            + u64::from(header.extra_field_length),
        zip64: resolved.uncompressed_size.is_wide() || resolved.compressed_size.is_wide() || header_offset.is_wide(),
        torrentzip: false,
        md5: None,
        sha1: None,
    };
    entry.torrentzip = entry.has_torrentzip_fields();

    Ok(entry)
}
