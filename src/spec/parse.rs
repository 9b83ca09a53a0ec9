// Copyright (c) 2021 Harry [Majored] [hello@majored.pw]
// MIT License (https://github.com/Majored/rs-async-zip/blob/main/LICENSE)

use crate::error::Result;
use crate::spec::consts::{CDH_LENGTH, EOCDR_LENGTH, LFH_LENGTH, ZIP64_EOCDL_LENGTH, ZIP64_EOCDR_LENGTH};
use crate::spec::header::{
    CentralDirectoryRecord, EndOfCentralDirectoryHeader, GeneralPurposeFlag, LocalFileHeader,
    Zip64EndOfCentralDirectoryLocator, Zip64EndOfCentralDirectoryRecord,
};

use std::io::Read;

/// Replace elements of an array at a given cursor index for use with a zero-initialised array.
macro_rules! array_push {
    ($arr:ident, $cursor:ident, $value:expr) => {{
        for entry in $value {
            $arr[$cursor] = entry;
            $cursor += 1;
        }
    }};
}

impl LocalFileHeader {
    pub fn as_slice(&self) -> [u8; LFH_LENGTH] {
        let mut array = [0; LFH_LENGTH];
        let mut cursor = 0;

        array_push!(array, cursor, self.version.to_le_bytes());
        array_push!(array, cursor, self.flags.as_slice());
        array_push!(array, cursor, self.compression.to_le_bytes());
        array_push!(array, cursor, self.mod_time.to_le_bytes());
        array_push!(array, cursor, self.mod_date.to_le_bytes());
        array_push!(array, cursor, self.crc.to_le_bytes());
        array_push!(array, cursor, self.compressed_size.to_le_bytes());
        array_push!(array, cursor, self.uncompressed_size.to_le_bytes());
        array_push!(array, cursor, self.file_name_length.to_le_bytes());
        array_push!(array, cursor, self.extra_field_length.to_le_bytes());

        array
    }
}

impl GeneralPurposeFlag {
    pub fn as_slice(&self) -> [u8; 2] {
        self.0.to_le_bytes()
    }
}

impl CentralDirectoryRecord {
    pub fn as_slice(&self) -> [u8; CDH_LENGTH] {
        let mut array = [0; CDH_LENGTH];
        let mut cursor = 0;

        array_push!(array, cursor, self.v_made_by.to_le_bytes());
        array_push!(array, cursor, self.v_needed.to_le_bytes());
        array_push!(array, cursor, self.flags.as_slice());
        array_push!(array, cursor, self.compression.to_le_bytes());
        array_push!(array, cursor, self.mod_time.to_le_bytes());
        array_push!(array, cursor, self.mod_date.to_le_bytes());
        array_push!(array, cursor, self.crc.to_le_bytes());
        array_push!(array, cursor, self.compressed_size.to_le_bytes());
        array_push!(array, cursor, self.uncompressed_size.to_le_bytes());
        array_push!(array, cursor, self.file_name_length.to_le_bytes());
        array_push!(array, cursor, self.extra_field_length.to_le_bytes());
        array_push!(array, cursor, self.file_comment_length.to_le_bytes());
        array_push!(array, cursor, self.disk_start.to_le_bytes());
        array_push!(array, cursor, self.inter_attr.to_le_bytes());
        array_push!(array, cursor, self.exter_attr.to_le_bytes());
        array_push!(array, cursor, self.lh_offset.to_le_bytes());

        array
    }
}

impl EndOfCentralDirectoryHeader {
    pub fn as_slice(&self) -> [u8; EOCDR_LENGTH] {
        let mut array = [0; EOCDR_LENGTH];
        let mut cursor = 0;

        array_push!(array, cursor, self.disk_num.to_le_bytes());
        array_push!(array, cursor, self.start_cent_dir_disk.to_le_bytes());
        array_push!(array, cursor, self.num_of_entries_disk.to_le_bytes());
        array_push!(array, cursor, self.num_of_entries.to_le_bytes());
        array_push!(array, cursor, self.size_cent_dir.to_le_bytes());
        array_push!(array, cursor, self.cent_dir_offset.to_le_bytes());
        array_push!(array, cursor, self.file_comm_length.to_le_bytes());

        array
    }
}

impl Zip64EndOfCentralDirectoryRecord {
    pub fn as_bytes(&self) -> [u8; ZIP64_EOCDR_LENGTH] {
        let mut array = [0; ZIP64_EOCDR_LENGTH];
        let mut cursor = 0;

        array_push!(array, cursor, self.size_of_zip64_end_of_cd_record.to_le_bytes());
        array_push!(array, cursor, self.version_made_by.to_le_bytes());
        array_push!(array, cursor, self.version_needed_to_extract.to_le_bytes());
        array_push!(array, cursor, self.disk_number.to_le_bytes());
        array_push!(array, cursor, self.disk_number_start_of_cd.to_le_bytes());
        array_push!(array, cursor, self.num_entries_in_directory_on_disk.to_le_bytes());
        array_push!(array, cursor, self.num_entries_in_directory.to_le_bytes());
        array_push!(array, cursor, self.directory_size.to_le_bytes());
        array_push!(array, cursor, self.offset_of_start_of_directory.to_le_bytes());

        array
    }
}

impl Zip64EndOfCentralDirectoryLocator {
    pub fn as_bytes(&self) -> [u8; ZIP64_EOCDL_LENGTH as usize] {
        let mut array = [0; ZIP64_EOCDL_LENGTH as usize];
        let mut cursor = 0;

        array_push!(array, cursor, self.number_of_disk_with_start_of_zip64_end_of_central_directory.to_le_bytes());
        array_push!(array, cursor, self.relative_offset.to_le_bytes());
        array_push!(array, cursor, self.total_number_of_disks.to_le_bytes());

        array
    }
}

impl From<[u8; LFH_LENGTH]> for LocalFileHeader {
    fn from(value: [u8; LFH_LENGTH]) -> LocalFileHeader {
        LocalFileHeader {
            version: le_u16(&value, 0),
            flags: GeneralPurposeFlag(le_u16(&value, 2)),
            compression: le_u16(&value, 4),
            mod_time: le_u16(&value, 6),
            mod_date: le_u16(&value, 8),
            crc: le_u32(&value, 10),
            compressed_size: le_u32(&value, 14),
            uncompressed_size: le_u32(&value, 18),
            file_name_length: le_u16(&value, 22),
            extra_field_length: le_u16(&value, 24),
        }
    }
}

impl From<[u8; CDH_LENGTH]> for CentralDirectoryRecord {
    fn from(value: [u8; CDH_LENGTH]) -> CentralDirectoryRecord {
        CentralDirectoryRecord {
            v_made_by: le_u16(&value, 0),
            v_needed: le_u16(&value, 2),
            flags: GeneralPurposeFlag(le_u16(&value, 4)),
            compression: le_u16(&value, 6),
            mod_time: le_u16(&value, 8),
            mod_date: le_u16(&value, 10),
            crc: le_u32(&value, 12),
            compressed_size: le_u32(&value, 16),
            uncompressed_size: le_u32(&value, 20),
            file_name_length: le_u16(&value, 24),
            extra_field_length: le_u16(&value, 26),
            file_comment_length: le_u16(&value, 28),
            disk_start: le_u16(&value, 30),
            inter_attr: le_u16(&value, 32),
            exter_attr: le_u32(&value, 34),
            lh_offset: le_u32(&value, 38),
        }
    }
}

impl From<[u8; EOCDR_LENGTH]> for EndOfCentralDirectoryHeader {
    fn from(value: [u8; EOCDR_LENGTH]) -> EndOfCentralDirectoryHeader {
        EndOfCentralDirectoryHeader {
            disk_num: le_u16(&value, 0),
            start_cent_dir_disk: le_u16(&value, 2),
            num_of_entries_disk: le_u16(&value, 4),
            num_of_entries: le_u16(&value, 6),
            size_cent_dir: le_u32(&value, 8),
            cent_dir_offset: le_u32(&value, 12),
            file_comm_length: le_u16(&value, 16),
        }
    }
}

impl From<[u8; ZIP64_EOCDR_LENGTH]> for Zip64EndOfCentralDirectoryRecord {
    fn from(value: [u8; ZIP64_EOCDR_LENGTH]) -> Zip64EndOfCentralDirectoryRecord {
        Zip64EndOfCentralDirectoryRecord {
            size_of_zip64_end_of_cd_record: le_u64(&value, 0),
            version_made_by: le_u16(&value, 8),
            version_needed_to_extract: le_u16(&value, 10),
            disk_number: le_u32(&value, 12),
            disk_number_start_of_cd: le_u32(&value, 16),
            num_entries_in_directory_on_disk: le_u64(&value, 20),
            num_entries_in_directory: le_u64(&value, 28),
            directory_size: le_u64(&value, 36),
            offset_of_start_of_directory: le_u64(&value, 44),
        }
    }
}

impl From<[u8; ZIP64_EOCDL_LENGTH as usize]> for Zip64EndOfCentralDirectoryLocator {
    fn from(value: [u8; ZIP64_EOCDL_LENGTH as usize]) -> Zip64EndOfCentralDirectoryLocator {
        Zip64EndOfCentralDirectoryLocator {
            number_of_disk_with_start_of_zip64_end_of_central_directory: le_u32(&value, 0),
            relative_offset: le_u64(&value, 4),
            total_number_of_disks: le_u32(&value, 12),
        }
    }
}

impl LocalFileHeader {
    #[tracing::instrument(skip(reader))]
    pub fn from_reader<R: Read>(reader: &mut R) -> Result<LocalFileHeader> {
        let mut buffer: [u8; LFH_LENGTH] = [0; LFH_LENGTH];
        reader.read_exact(&mut buffer)?;
        Ok(LocalFileHeader::from(buffer))
    }
}

impl EndOfCentralDirectoryHeader {
    #[tracing::instrument(skip(reader))]
    pub fn from_reader<R: Read>(reader: &mut R) -> Result<EndOfCentralDirectoryHeader> {
        let mut buffer: [u8; EOCDR_LENGTH] = [0; EOCDR_LENGTH];
        reader.read_exact(&mut buffer)?;
        Ok(EndOfCentralDirectoryHeader::from(buffer))
    }
}

impl CentralDirectoryRecord {
    #[tracing::instrument(skip(reader))]
    pub fn from_reader<R: Read>(reader: &mut R) -> Result<CentralDirectoryRecord> {
        let mut buffer: [u8; CDH_LENGTH] = [0; CDH_LENGTH];
        reader.read_exact(&mut buffer)?;
        Ok(CentralDirectoryRecord::from(buffer))
    }
}

impl Zip64EndOfCentralDirectoryRecord {
    #[tracing::instrument(skip(reader))]
    pub fn from_reader<R: Read>(reader: &mut R) -> Result<Zip64EndOfCentralDirectoryRecord> {
        let mut buffer: [u8; ZIP64_EOCDR_LENGTH] = [0; ZIP64_EOCDR_LENGTH];
        reader.read_exact(&mut buffer)?;
        Ok(Zip64EndOfCentralDirectoryRecord::from(buffer))
    }
}

impl Zip64EndOfCentralDirectoryLocator {
    #[tracing::instrument(skip(reader))]
    pub fn from_reader<R: Read>(reader: &mut R) -> Result<Zip64EndOfCentralDirectoryLocator> {
        let mut buffer = [0; ZIP64_EOCDL_LENGTH as usize];
        reader.read_exact(&mut buffer)?;
        Ok(Zip64EndOfCentralDirectoryLocator::from(buffer))
    }
}

fn le_u16(buffer: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([buffer[at], buffer[at + 1]])
}

fn le_u32(buffer: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buffer[at], buffer[at + 1], buffer[at + 2], buffer[at + 3]])
}

fn le_u64(buffer: &[u8], at: usize) -> u64 {
    let mut bytes = [0; 8];
    bytes.copy_from_slice(&buffer[at..at + 8]);
    u64::from_le_bytes(bytes)
}
