// Copyright (c) 2022 Harry [Majored] [hello@majored.pw]
// MIT License (https://github.com/Majored/rs-async-zip/blob/main/LICENSE)

pub const SIGNATURE_LENGTH: usize = 4;

// Local file header constants
//
// https://github.com/Majored/rs-async-zip/blob/main/SPECIFICATION.md#437
pub const LFH_SIGNATURE: u32 = 0x4034b50;
pub const LFH_LENGTH: usize = 26;

// Central directory header constants
//
// https://github.com/Majored/rs-async-zip/blob/main/SPECIFICATION.md#4312
pub const CDH_SIGNATURE: u32 = 0x2014b50;
pub const CDH_LENGTH: usize = 42;

// End of central directory record constants
//
// https://github.com/Majored/rs-async-zip/blob/main/SPECIFICATION.md#4316
pub const EOCDR_SIGNATURE: u32 = 0x6054b50;
pub const EOCDR_LENGTH: usize = 18;
/// The comment length field is a u16, so the comment can't exceed this.
pub const EOCDR_MAX_COMMENT_LENGTH: usize = u16::MAX as usize;

// Zip64 end of central directory record & locator constants
//
// https://github.com/Majored/rs-async-zip/blob/main/SPECIFICATION.md#4314
pub const ZIP64_EOCDR_SIGNATURE: u32 = 0x06064b50;
/// The value of the "size of zip64 end of central directory record" field: the record minus its leading 12 bytes.
pub const ZIP64_EOCDR_RECORD_SIZE: u64 = 44;
pub const ZIP64_EOCDR_LENGTH: usize = 52;
// https://github.com/Majored/rs-async-zip/blob/main/SPECIFICATION.md#4315
pub const ZIP64_EOCDL_SIGNATURE: u32 = 0x07064b50;
pub const ZIP64_EOCDL_LENGTH: u64 = 16;

// https://github.com/Majored/rs-async-zip/blob/main/SPECIFICATION.md#439
pub const DATA_DESCRIPTOR_SIGNATURE: u32 = 0x8074b50;

/// The sentinel stored in a 32-bit size/offset field whose real value lives in a Zip64 structure.
pub const NON_ZIP64_MAX_SIZE: u32 = 0xFFFFFFFF;
/// A central directory starting at or beyond this offset is located through the Zip64 record.
pub const ZIP64_CD_OFFSET_THRESHOLD: u64 = 0xFFFFFFFE;
/// The sentinel stored in a 16-bit entry count whose real value lives in the Zip64 record.
pub const NON_ZIP64_MAX_NUM_FILES: u16 = 0xFFFF;

// TorrentZip fixed fields.
pub const TORRENTZIP_VERSION_NEEDED: u16 = 20;
pub const TORRENTZIP_VERSION_NEEDED_ZIP64: u16 = 45;
pub const TORRENTZIP_VERSION_MADE_BY: u16 = 0;
/// Bit 1: deflate with maximum compression.
pub const TORRENTZIP_FLAGS: u16 = 0x0002;
pub const TORRENTZIP_COMPRESSION: u16 = 8;
pub const TORRENTZIP_COMMENT_PREFIX: &[u8; 14] = b"TORRENTZIPPED-";
pub const TORRENTZIP_COMMENT_LENGTH: usize = 22;

/// The deflate encoding of an empty input: one final fixed-Huffman block holding only end-of-block.
pub const EMPTY_DEFLATE_STREAM: [u8; 2] = [0x03, 0x00];
